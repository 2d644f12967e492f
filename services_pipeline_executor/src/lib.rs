//! # Pipeline Executor Service
//!
//! The shell engine: runs parsed command lines against the process table.
//!
//! ## Philosophy
//!
//! - **One process per stage**: every stage is a transient process in the
//!   table, created before it runs and killed after it settles
//! - **Faults stay in the stage**: a failing stage writes to its own stderr
//!   and the next stage still runs with whatever stdout it produced
//! - **The table is the authority**: the engine never edits process records,
//!   it asks [`ProcessTable`](services_process_manager::ProcessTable) to
//! - **Deterministic execution**: time only moves through the kernel clock
//!
//! ## Stage flow
//!
//! 1. Create the stage process (fixed `shell.stage_memory_mb` cost)
//! 2. Run `sudo` (no-op), a built-in, or a module resolved from `/bin`
//! 3. Bind the stage's streams onto its process record
//! 4. Kill the process, unless it is the last stage of a background line
//! 5. Flush the stage's stderr; its stdout becomes the next stage's stdin
//!
//! After the last stage the joined stdout is printed once, or written to the
//! redirect target instead.

mod builtins;
mod jobs;

pub use builtins::{is_builtin, BUILTINS, MAX_SLEEP};

use core_types::Pid;
use kernel_api::{normalize_path, Network, OutputStyle, ShellError, Storage, Terminal};
use pipeline::PipelineStage;
use resources::MemoryUnits;
use serde::{Deserialize, Serialize};
use services_command_loader::{install_defaults, CommandContext, ModuleLoader};
use services_process_manager::{panic_message, ProcessSpec};
use services_settings::{SettingsRegistry, ShellConfig, PROFILE};
use sim_kernel::Kernel;
use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};

/// Nesting limit for `run` scripts calling `run`
const MAX_SCRIPT_DEPTH: usize = 8;

/// What one command line produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    /// Joined stdout of the last stage
    pub stdout: String,
    /// Every stage's stderr, in order
    pub stderr_lines: Vec<String>,
    /// Redirect target the stdout was written to
    pub redirected: Option<String>,
    /// Process left running by a background line
    pub job: Option<Pid>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.stderr_lines.is_empty()
    }
}

/// Per-stage arguments handed to a built-in
pub(crate) struct Invocation<'a> {
    pub args: &'a [String],
    pub stdin: &'a [String],
    pub is_sudo: bool,
    pub background: bool,
    pub pid: Pid,
}

/// The shell engine
pub struct Shell<S: Storage, T: Terminal, N: Network> {
    kernel: Kernel,
    storage: S,
    terminal: T,
    network: N,
    settings: SettingsRegistry,
    config: ShellConfig,
    loader: ModuleLoader,
    cwd: String,
    history: VecDeque<String>,
    /// Background sleepers: pid to simulated deadline
    timers: BTreeMap<Pid, u64>,
    realtime: bool,
    depth: usize,
}

impl<S: Storage, T: Terminal, N: Network> Shell<S, T, N> {
    /// Creates a shell over a booted kernel
    pub fn new(kernel: Kernel, storage: S, terminal: T, network: N, settings: SettingsRegistry) -> Self {
        let config = ShellConfig::from_registry(&settings, PROFILE);
        let home = format!("/home/{}", config.user);
        let cwd = if storage.exists(&home) {
            home
        } else {
            "/".to_string()
        };

        Self {
            kernel,
            storage,
            terminal,
            network,
            settings,
            config,
            loader: ModuleLoader::new(),
            cwd,
            history: VecDeque::new(),
            timers: BTreeMap::new(),
            realtime: false,
            depth: 0,
        }
    }

    /// Writes manifests for every compiled package into `/bin`
    pub fn with_default_packages(mut self) -> Self {
        let installed = install_defaults(&self.loader, &mut self.storage);
        log::info!("installed {} default packages", installed);
        self
    }

    /// Makes `sleep` and `spin` also block the host thread
    pub fn set_realtime(&mut self, realtime: bool) {
        self.realtime = realtime;
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.terminal
    }

    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn settings(&self) -> &SettingsRegistry {
        &self.settings
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// `user@host:dir$ `, with the home directory shown as `~`
    pub fn prompt(&self) -> String {
        let home = format!("/home/{}", self.config.user);
        let dir = match self.cwd.strip_prefix(&home) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{}", rest),
            _ => self.cwd.clone(),
        };
        format!("{}@{}:{}$ ", self.config.user, self.config.hostname, dir)
    }

    /// Entry point for an interactive line: history, `&`, then execute
    pub fn submit(&mut self, line: &str) -> Option<PipelineOutcome> {
        self.reap_jobs();
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        self.record_history(line);

        let (command, background) = pipeline::split_background(line);
        if command.is_empty() {
            return None;
        }
        Some(self.execute(&command, background))
    }

    fn record_history(&mut self, line: &str) {
        if self.config.history_limit == 0 {
            return;
        }
        if self.history.back().map(String::as_str) != Some(line) {
            self.history.push_back(line.to_string());
        }
        while self.history.len() > self.config.history_limit {
            self.history.pop_front();
        }
    }

    /// Runs every stage of `line` in order
    pub fn execute(&mut self, line: &str, background: bool) -> PipelineOutcome {
        let stages = pipeline::parse(line);
        let mut outcome = PipelineOutcome::default();
        let mut carried: Vec<String> = Vec::new();
        let mut redirect = None;

        let last = stages.len().saturating_sub(1);
        for (index, stage) in stages.iter().enumerate() {
            let keep_alive = background && index == last;
            let (stdout, stderr, job) = self.run_stage(stage, line, &carried, keep_alive);

            for message in &stderr {
                self.terminal.print(message, OutputStyle::Error);
            }
            outcome.stderr_lines.extend(stderr);
            if let Some(target) = &stage.redirect {
                redirect = Some(target.target_path.clone());
            }
            outcome.job = outcome.job.or(job);
            carried = stdout;
        }

        outcome.stdout = carried.join("\n");
        match redirect {
            Some(target) => {
                let path = normalize_path(&self.cwd, &target);
                match self.storage.write(&path, &outcome.stdout) {
                    Ok(()) => outcome.redirected = Some(path),
                    Err(err) => {
                        let message = format!("cannot write {}: {}", path, err);
                        self.terminal.print(&message, OutputStyle::Error);
                        outcome.stderr_lines.push(message);
                    }
                }
            }
            None if !carried.is_empty() => {
                self.terminal.print(&outcome.stdout, OutputStyle::Normal);
            }
            None => {}
        }
        outcome
    }

    /// Runs one stage in its own process; returns `(stdout, stderr, job)`
    fn run_stage(
        &mut self,
        stage: &PipelineStage,
        line: &str,
        stdin: &[String],
        keep_alive: bool,
    ) -> (Vec<String>, Vec<String>, Option<Pid>) {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let memory = MemoryUnits::new(self.config.stage_memory_mb);
        let shell_pid = self.kernel.shell_pid();
        let name = if stage.command.is_empty() {
            "sh"
        } else {
            stage.command.as_str()
        };
        let spec = ProcessSpec::user(name, memory)
            .with_parent(shell_pid)
            .with_command(line);
        let Some(pid) = self.kernel.table_mut().create(spec) else {
            let err = ShellError::ResourceExhaustion(format!(
                "cannot allocate {} for '{}'",
                memory, name
            ));
            return (stdout, vec![err.to_string()], None);
        };
        let session = self.kernel.session_id();

        if stage.malformed_redirect {
            let err = ShellError::InvalidInput("missing redirect target after '>'".to_string());
            stderr.push(err.to_string());
        }

        let result = if stage.command == "sudo" || stage.command.is_empty() {
            Ok(None)
        } else {
            self.dispatch(stage, stdin, pid, keep_alive)
        };
        let failed = result.is_err();
        match result {
            Ok(Some(text)) => stdout.push(text),
            Ok(None) => {}
            Err(err) => {
                log::debug!("stage '{}' failed: {}", stage.command, err);
                stderr.push(err.to_string());
            }
        }

        // A reboot inside the stage discards the table the process lived in.
        if self.kernel.session_id() != session {
            return (stdout, stderr, None);
        }

        let table = self.kernel.table_mut();
        table.record_streams(pid, stdin, &stdout, &stderr);
        // A failed stage is never kept as a job.
        if keep_alive && !failed && table.get(pid).is_some() {
            let index = table.jobs().iter().position(|p| p.pid == pid).map_or(0, |i| i + 1);
            self.terminal
                .print(&format!("[{}] {}", index, pid), OutputStyle::Info);
            return (stdout, stderr, Some(pid));
        }
        table.kill(pid);
        self.timers.remove(&pid);
        (stdout, stderr, None)
    }

    /// Built-in first, then a module from `/bin`; panics become errors
    fn dispatch(
        &mut self,
        stage: &PipelineStage,
        stdin: &[String],
        pid: Pid,
        background: bool,
    ) -> Result<Option<String>, ShellError> {
        if is_builtin(&stage.command) {
            let invocation = Invocation {
                args: &stage.args,
                stdin,
                is_sudo: stage.is_sudo,
                background,
                pid,
            };
            return panic::catch_unwind(AssertUnwindSafe(|| {
                self.run_builtin(&stage.command, &invocation)
            }))
            .unwrap_or_else(|payload| {
                Err(ShellError::ExecutionError(format!(
                    "{}: {}",
                    stage.command,
                    panic_message(payload.as_ref())
                )))
            });
        }

        let mut ctx = CommandContext::new(
            &mut self.kernel,
            &mut self.storage,
            &mut self.terminal,
            &mut self.network,
            pid,
            &self.cwd,
            stdin,
            stage.is_sudo,
        )
        .with_background(background);
        self.loader.invoke(&stage.command, &stage.args, &mut ctx)
    }

    /// Advances simulated time, blocking the host too in real-time mode
    pub(crate) fn pause(&mut self, ms: u64) {
        self.kernel.sleep(ms);
        if self.realtime {
            std::thread::sleep(std::time::Duration::from_millis(ms));
        }
    }
}
