//! # Command Module Loader
//!
//! Resolves command names to compiled command modules and runs them
//! against a capability-scoped [`CommandContext`].
//!
//! ## Philosophy
//!
//! - **No code is evaluated at runtime**: `/bin/<name>` holds a small JSON
//!   manifest naming an implementation that is compiled into the binary
//! - **Installing is writing a manifest**, removing is deleting it
//! - **Modules see only the context**: presentation, storage, network and
//!   process-table accessors, scoped to the invoking process
//! - **Faults stay in the stage**: errors and panics become [`ShellError`]s
//!
//! ## Resolution
//!
//! | `/bin/<name>`                                  | Result            |
//! |------------------------------------------------|-------------------|
//! | absent                                         | `NotFound`        |
//! | directory, bad JSON, unknown implementation    | `InvalidModule`   |
//! | valid manifest                                 | module is invoked |
//!
//! [`ShellError`]: kernel_api::ShellError

pub mod context;
pub mod loader;
pub mod packages;

pub use context::CommandContext;
pub use loader::{
    install_defaults, module_path, CommandModule, ModuleLoader, ModuleManifest, BIN_DIR,
    MANIFEST_VERSION,
};
