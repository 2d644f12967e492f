//! # Process Manager Service
//!
//! This crate owns the simulated process table.
//!
//! ## Philosophy
//!
//! Processes are managed explicitly with clear lifecycle states:
//! - Explicit lifecycle (`running ⇄ sleeping → terminated`), no fork/exec
//! - Memory is reserved from a bounded pool at creation and returned on kill
//! - The table is the single writer of every process record
//!
//! ## Scheduling
//!
//! The scheduler tick is telemetry, not timesharing. It rotates a priority
//! ordered run queue and updates the simulated `cpu` and `cpu_time` of the
//! process it picks. It never pauses or reorders real work.
//!
//! ## Concurrency
//!
//! Worker threads are real host threads owned by exactly one process. They
//! share nothing with their owner and talk to it only through messages;
//! replies are dispatched back on the owner's thread by
//! [`ProcessTable::pump_thread_events`].

pub mod manager;
pub mod process;
pub mod process_info;
pub mod scheduler;
pub mod threads;

pub use manager::{MessageListener, ProcessError, ProcessTable};
pub use process::{Priority, Process, ProcessSpec, ProcessStatus, ProcessType};
pub use process_info::{format_table, KillResult};
pub use scheduler::{RunQueue, Telemetry};
pub use threads::{
    panic_message, thread_body, ThreadBody, ThreadCommand, ThreadErrorHandler, ThreadEvent,
    ThreadInput, ThreadMessageHandler,
};
