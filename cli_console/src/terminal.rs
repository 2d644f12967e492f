//! Terminal implementations for the shell engine

use kernel_api::{InputMode, OutputStyle, Terminal};
use std::io::{self, Write};

/// Captures everything printed, for tests and scripted runs
#[derive(Debug, Default, Clone)]
pub struct BufferTerminal {
    lines: Vec<(OutputStyle, String)>,
    status_line: Option<String>,
    input_mode: Option<InputMode>,
    clears: usize,
}

impl BufferTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every printed line with its style
    pub fn lines(&self) -> &[(OutputStyle, String)] {
        &self.lines
    }

    /// Printed lines of one style
    pub fn output(&self, style: OutputStyle) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(s, _)| *s == style)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    /// Everything printed, one entry per line
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Drains the captured lines
    pub fn take(&mut self) -> Vec<(OutputStyle, String)> {
        std::mem::take(&mut self.lines)
    }

    /// Latest `update_line` text
    pub fn status_line(&self) -> Option<&str> {
        self.status_line.as_deref()
    }

    pub fn input_mode(&self) -> Option<InputMode> {
        self.input_mode
    }

    pub fn clears(&self) -> usize {
        self.clears
    }
}

impl Terminal for BufferTerminal {
    fn print(&mut self, text: &str, style: OutputStyle) {
        self.lines.push((style, text.to_string()));
    }

    fn update_line(&mut self, text: &str) {
        self.status_line = Some(text.to_string());
    }

    fn set_input_mode(&mut self, mode: InputMode) {
        self.input_mode = Some(mode);
    }

    fn clear(&mut self) {
        self.lines.clear();
        self.status_line = None;
        self.clears += 1;
    }
}

/// Writes to the host's stdout; errors go to stderr
#[derive(Debug, Default)]
pub struct StdoutTerminal {
    mode: Option<InputMode>,
}

impl StdoutTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_mode(&self) -> Option<InputMode> {
        self.mode
    }
}

impl Terminal for StdoutTerminal {
    fn print(&mut self, text: &str, style: OutputStyle) {
        match style {
            OutputStyle::Error => eprintln!("{}", text),
            OutputStyle::Normal | OutputStyle::Info => println!("{}", text),
        }
    }

    fn update_line(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        // A closed stdout leaves nothing to update.
        let _ = write!(out, "\r\x1b[2K{}", text);
        let _ = out.flush();
    }

    fn set_input_mode(&mut self, mode: InputMode) {
        log::debug!("terminal input mode {:?}", mode);
        self.mode = Some(mode);
    }

    fn clear(&mut self) {
        let mut out = io::stdout().lock();
        let _ = write!(out, "\x1b[2J\x1b[H");
        let _ = out.flush();
    }
}
