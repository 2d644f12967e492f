//! # Kernel API
//!
//! This crate defines the interface between the shell engine and the
//! collaborators it does not own.
//!
//! ## Philosophy
//!
//! The engine depends on **contracts**, not implementations:
//! - Presentation goes through [`Terminal`] (no direct stdout)
//! - Files go through [`Storage`] (no host filesystem)
//! - The network goes through [`Network`] (no sockets)
//!
//! Every contract can be replaced by an in-memory implementation, which is
//! how the whole system runs under `cargo test`.
//!
//! ## Error Taxonomy
//!
//! [`ShellError`] is the user-visible error model shared by built-ins and
//! command modules. Every stage failure is rendered from one of its variants.

pub mod error;
pub mod network;
pub mod path;
pub mod storage;
pub mod terminal;

pub use error::ShellError;
pub use network::{Network, NetworkError};
pub use path::{file_name, normalize_path, parent_path};
pub use storage::{Node, Storage, StorageError};
pub use terminal::{InputMode, OutputStyle, Terminal};
