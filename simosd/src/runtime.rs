//! # Host Runtime
//!
//! The main event loop that ties everything together.

use crate::input_script::{InputScript, ScriptedInput};
use cli_console::{ConsoleAction, InteractiveConsole};
use input_types::KeyEvent;
use kernel_api::{OutputStyle, Storage, Terminal};
use services_network::SimulatedNetwork;
use services_pipeline_executor::Shell;
use services_settings::{create_default_registry, KernelConfig, SettingsRegistry, ShellConfig, PROFILE};
use services_storage::MemoryStorage;
use sim_kernel::{Kernel, KernelError};
use std::io::{self, BufRead};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Line that stands for the suspend gesture in interactive mode
pub const SUSPEND_LINE: &str = "^Z";

/// The shell as the host wires it
pub type HostShell<T> = Shell<MemoryStorage, T, SimulatedNetwork>;

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Boot error: {0}")]
    Boot(#[from] KernelError),

    #[error("Script error: {0}")]
    ScriptError(String),
}

/// Host runtime configuration
#[derive(Debug, Clone)]
pub struct HostRuntimeConfig {
    /// Optional key script; without one the host reads stdin lines
    pub script: Option<String>,
    /// Maximum steps to run (0 = unlimited)
    pub max_steps: usize,
    /// Defaults plus any overrides loaded from `--config`
    pub settings: SettingsRegistry,
}

impl Default for HostRuntimeConfig {
    fn default() -> Self {
        Self {
            script: None,
            max_steps: 0,
            settings: create_default_registry(),
        }
    }
}

/// Host runtime state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostState {
    Running,
    Shutdown,
}

/// Host runtime
pub struct HostRuntime<T: Terminal> {
    shell: HostShell<T>,
    console: InteractiveConsole,
    script: Option<InputScript>,
    state: HostState,
    max_steps: usize,
    steps: usize,
}

impl<T: Terminal> HostRuntime<T> {
    /// Boots the kernel and builds the shell over `terminal`
    pub fn new(config: HostRuntimeConfig, terminal: T) -> Result<Self, HostRuntimeError> {
        let script = match &config.script {
            Some(text) => Some(
                InputScript::from_text(text)
                    .map_err(|e| HostRuntimeError::ScriptError(e.to_string()))?,
            ),
            None => None,
        };

        let kernel = Kernel::boot(KernelConfig::from_registry(&config.settings, PROFILE))?;
        let shell_config = ShellConfig::from_registry(&config.settings, PROFILE);
        let storage = MemoryStorage::with_default_layout(&shell_config.user);
        let shell = Shell::new(
            kernel,
            storage,
            terminal,
            SimulatedNetwork::new(),
            config.settings,
        )
        .with_default_packages();

        Ok(Self {
            console: InteractiveConsole::new(shell_config.history_limit),
            shell,
            script,
            state: HostState::Running,
            max_steps: config.max_steps,
            steps: 0,
        })
    }

    /// Runs the scripted loop if a script was given, otherwise the
    /// interactive one
    pub fn run(&mut self) -> Result<(), HostRuntimeError> {
        self.greet();
        if self.script.is_some() {
            self.run_script();
        } else {
            self.run_interactive();
        }
        Ok(())
    }

    /// Runs the key script to completion
    ///
    /// Returns when:
    /// - `exit` or `quit` is submitted
    /// - Max steps reached (if configured)
    /// - Script exhausted
    pub fn run_script(&mut self) {
        while !self.should_stop() {
            if !self.script.as_ref().is_some_and(InputScript::has_more) {
                break;
            }
            self.step();
        }
    }

    /// Executes one scripted input
    pub fn step(&mut self) {
        let Some(input) = self.script.as_mut().and_then(InputScript::next_input) else {
            return;
        };
        match input {
            ScriptedInput::Key(event) => self.handle_key(event),
            ScriptedInput::Wait(millis) => self.advance(millis),
        }
        self.steps += 1;
    }

    /// Reads lines from stdin while the scheduler keeps ticking
    ///
    /// A reader thread forwards lines over a channel; the loop waits at most
    /// one tick interval for each, and advances the clock by the real time
    /// that passed meanwhile.
    pub fn run_interactive(&mut self) {
        self.shell.set_realtime(true);
        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        let tick = Duration::from_millis(self.shell.kernel().config().tick_interval_ms.max(1));
        let mut reference = Instant::now();
        self.show_prompt();

        while !self.should_stop() {
            match rx.recv_timeout(tick) {
                Ok(line) => {
                    self.advance_real(&mut reference);
                    self.handle_line(&line);
                    // Time spent inside the command was already simulated.
                    reference = Instant::now();
                    if self.state == HostState::Running {
                        self.show_prompt();
                    }
                }
                Err(RecvTimeoutError::Timeout) => self.advance_real(&mut reference),
                Err(RecvTimeoutError::Disconnected) => {
                    log::info!("stdin closed");
                    break;
                }
            }
            self.steps += 1;
        }
    }

    /// Handles one interactive line
    pub fn handle_line(&mut self, line: &str) {
        if line.trim() == SUSPEND_LINE {
            self.suspend();
        } else {
            self.submit(line);
        }
    }

    /// Feeds one key to the console and acts on the result
    pub fn handle_key(&mut self, event: KeyEvent) {
        match self.console.handle_key(event) {
            ConsoleAction::Submit(line) => {
                let echo = format!("{}{}", self.shell.prompt(), line);
                self.shell.terminal_mut().print(&echo, OutputStyle::Normal);
                self.submit(&line);
            }
            ConsoleAction::Suspend => self.suspend(),
            ConsoleAction::Cancel => self.shell.terminal_mut().print("^C", OutputStyle::Info),
            ConsoleAction::Edited | ConsoleAction::None => {}
        }
    }

    /// Runs a line through the shell, or stops the host on `exit`/`quit`
    pub fn submit(&mut self, line: &str) {
        match line.trim() {
            "exit" | "quit" => {
                log::info!("host shutdown requested");
                self.state = HostState::Shutdown;
            }
            _ => {
                self.shell.submit(line);
            }
        }
    }

    /// Advances the simulated clock and finishes due background jobs
    pub fn advance(&mut self, millis: u64) {
        self.shell.kernel_mut().advance(millis);
        self.shell.reap_jobs();
    }

    fn advance_real(&mut self, reference: &mut Instant) {
        let elapsed = reference.elapsed();
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            return;
        }
        // Keep the sub-millisecond remainder for the next round.
        *reference += Duration::from_millis(millis);
        self.advance(millis);
    }

    fn suspend(&mut self) {
        if self.shell.suspend_foreground().is_none() {
            self.shell
                .terminal_mut()
                .print("no running job to suspend", OutputStyle::Info);
        }
    }

    fn greet(&mut self) {
        let motd = self
            .shell
            .storage()
            .read("/etc/motd")
            .ok()
            .and_then(|node| node.as_file().map(String::from));
        if let Some(motd) = motd {
            self.shell.terminal_mut().print(&motd, OutputStyle::Info);
        }
    }

    fn show_prompt(&mut self) {
        let prompt = self.shell.prompt();
        self.shell.terminal_mut().update_line(&prompt);
    }

    fn should_stop(&self) -> bool {
        self.state == HostState::Shutdown || (self.max_steps > 0 && self.steps >= self.max_steps)
    }

    /// Whether `exit`/`quit` was submitted
    pub fn is_shutdown(&self) -> bool {
        self.state == HostState::Shutdown
    }

    /// Returns the number of steps executed
    pub fn step_count(&self) -> usize {
        self.steps
    }

    pub fn shell(&self) -> &HostShell<T> {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut HostShell<T> {
        &mut self.shell
    }

    pub fn console(&self) -> &InteractiveConsole {
        &self.console
    }
}
