//! Presentation collaborator

use serde::{Deserialize, Serialize};

/// How a printed line should be styled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStyle {
    /// Ordinary command output
    Normal,
    /// Stage stderr and error reports
    Error,
    /// Shell notifications (job started, suspended, ...)
    Info,
}

/// How the terminal should treat typed input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMode {
    /// Line editing with echo
    Line,
    /// Line editing without echo
    Password,
    /// Keys delivered one by one
    Raw,
}

/// The terminal surface the shell prints to
///
/// The shell never writes to host stdout directly; everything user-visible
/// passes through this trait.
pub trait Terminal {
    /// Prints a block of text (may contain newlines)
    fn print(&mut self, text: &str, style: OutputStyle);

    /// Replaces the current (last) line, for progress output
    fn update_line(&mut self, text: &str);

    /// Switches the input mode
    fn set_input_mode(&mut self, mode: InputMode);

    /// Clears the screen
    fn clear(&mut self);
}
