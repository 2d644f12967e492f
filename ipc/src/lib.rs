//! # Inter-Process Communication (IPC)
//!
//! This crate defines SimOS's message-passing primitives.
//!
//! ## Philosophy
//!
//! - **Messages, not shared memory**: processes and their worker threads only
//!   ever exchange owned message values
//! - **Ordered**: mailboxes deliver in arrival order, exactly once
//! - **Self-describing**: payloads are JSON values, so any serializable type
//!   can cross a process boundary
//!
//! ## Architecture
//!
//! A [`MessageEnvelope`] carries routing information (sender, recipient) and
//! a [`MessagePayload`]. Envelopes addressed to a process that has no
//! listener yet wait in that process's [`Mailbox`].

pub mod mailbox;
pub mod message;

pub use mailbox::Mailbox;
pub use message::{MessageEnvelope, MessagePayload};
