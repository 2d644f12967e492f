//! Fixture for running a module against an in-memory system

use crate::{CommandContext, CommandModule};
use kernel_api::{InputMode, OutputStyle, ShellError, Terminal};
use services_network::SimulatedNetwork;
use services_settings::KernelConfig;
use services_storage::MemoryStorage;
use sim_kernel::Kernel;

#[derive(Default)]
pub(crate) struct CapturingTerminal {
    pub printed: Vec<String>,
}

impl Terminal for CapturingTerminal {
    fn print(&mut self, text: &str, _style: OutputStyle) {
        self.printed.push(text.to_string());
    }
    fn update_line(&mut self, text: &str) {
        self.printed.push(text.to_string());
    }
    fn set_input_mode(&mut self, _mode: InputMode) {}
    fn clear(&mut self) {
        self.printed.clear();
    }
}

pub(crate) struct Harness {
    pub kernel: Kernel,
    pub storage: MemoryStorage,
    pub terminal: CapturingTerminal,
    pub network: SimulatedNetwork,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            kernel: Kernel::boot(KernelConfig::default().with_seed(5)).unwrap(),
            storage: MemoryStorage::with_default_layout("user"),
            terminal: CapturingTerminal::default(),
            network: SimulatedNetwork::new(),
        }
    }

    pub fn run(
        &mut self,
        module: &dyn CommandModule,
        args: &[&str],
        stdin: &[&str],
    ) -> Result<Option<String>, ShellError> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let stdin: Vec<String> = stdin.iter().map(|s| s.to_string()).collect();
        let pid = self.kernel.shell_pid();
        let mut ctx = CommandContext::new(
            &mut self.kernel,
            &mut self.storage,
            &mut self.terminal,
            &mut self.network,
            pid,
            "/home/user",
            &stdin,
            false,
        );
        module.execute(&args, &mut ctx)
    }
}
