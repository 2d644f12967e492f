//! # SimOS Host Runtime
//!
//! This crate provides the host runtime for the simulated OS.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: the shell engine prints through a terminal, never to
//!   stdout directly
//! - **Input is explicit events**: key scripts and stdin lines both become
//!   console actions
//! - **Deterministic mode is first-class**: scripted runs advance the clock
//!   only through `wait` steps
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Resolves settings and boots the kernel
//! - Installs the default command packages
//! - Runs the scripted or the interactive event loop
//! - Keeps the scheduler ticking while the shell waits for input

pub mod input_script;
pub mod runtime;

pub use input_script::{InputScript, InputScriptError, ScriptedInput};
pub use runtime::{HostRuntime, HostRuntimeConfig, HostRuntimeError, HostShell};
