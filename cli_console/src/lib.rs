//! # CLI Console
//!
//! The terminal side of the shell: line editing, history browsing, and the
//! [`Terminal`](kernel_api::Terminal) implementations hosts print through.
//!
//! ## Design
//!
//! The console never runs commands itself. It turns key events into
//! [`ConsoleAction`]s; the host decides what a submitted line or the suspend
//! gesture means for the shell engine.

pub mod interactive;
pub mod terminal;

pub use interactive::{ConsoleAction, InteractiveConsole};
pub use terminal::{BufferTerminal, StdoutTerminal};
