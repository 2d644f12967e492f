//! # Storage Service
//!
//! This crate provides the in-memory virtual filesystem behind the
//! [`kernel_api::Storage`] contract.
//!
//! ## Philosophy
//!
//! - The tree is plain data: directories map names to nodes, files are strings
//! - Nothing touches the host filesystem
//! - A whole tree can be snapshotted to JSON and restored
//!
//! ## Non-Goals
//!
//! - Permissions: the shell decides which paths are protected
//! - Metadata (timestamps, owners, sizes)

pub mod memory_fs;
pub mod snapshot;

pub use memory_fs::MemoryStorage;
pub use snapshot::SnapshotError;
