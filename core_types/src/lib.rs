//! # Core Types
//!
//! This crate defines the fundamental identifiers used throughout SimOS.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: a process id cannot be confused with a thread id.
//! - **Session-scoped**: identifiers are allocated by the owning table, never globally.
//! - **Never reused**: counters only move forward within a session.
//!
//! ## Key Types
//!
//! - [`Pid`]: Process identifier, monotonically increasing per session
//! - [`ThreadId`]: Identifier of a worker thread owned by a process
//! - [`SessionId`]: Identity of one boot of the kernel
//! - [`MessageId`]: Sequence number of an IPC envelope

pub mod ids;

pub use ids::{MessageId, Pid, SessionId, ThreadId};
