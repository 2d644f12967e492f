//! Capability-scoped API handed to command modules

use core_types::{MessageId, Pid, ThreadId};
use ipc::{Mailbox, MessageEnvelope, MessagePayload};
use kernel_api::{
    normalize_path, InputMode, Network, Node, OutputStyle, ShellError, Storage, StorageError,
    Terminal,
};
use services_process_manager::{
    MessageListener, Process, ThreadBody, ThreadErrorHandler, ThreadMessageHandler,
};
use sim_kernel::Kernel;
use std::time::Duration;

/// Everything a command may touch while it runs.
///
/// The context is bound to one stage: its process, its stdin, its privilege.
/// Process-table access goes through the kernel's table methods only.
pub struct CommandContext<'a> {
    kernel: &'a mut Kernel,
    storage: &'a mut dyn Storage,
    terminal: &'a mut dyn Terminal,
    network: &'a mut dyn Network,
    pid: Pid,
    cwd: &'a str,
    stdin: &'a [String],
    is_sudo: bool,
    background: bool,
}

impl<'a> CommandContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kernel: &'a mut Kernel,
        storage: &'a mut dyn Storage,
        terminal: &'a mut dyn Terminal,
        network: &'a mut dyn Network,
        pid: Pid,
        cwd: &'a str,
        stdin: &'a [String],
        is_sudo: bool,
    ) -> Self {
        Self {
            kernel,
            storage,
            terminal,
            network,
            pid,
            cwd,
            stdin,
            is_sudo,
            background: false,
        }
    }

    /// Marks the invocation as the final stage of a backgrounded line
    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    // Presentation

    /// Prints directly to the terminal, bypassing the stage's stdout
    pub fn print(&mut self, text: &str) {
        self.terminal.print(text, OutputStyle::Normal);
    }

    pub fn update_line(&mut self, text: &str) {
        self.terminal.update_line(text);
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        self.terminal.set_input_mode(mode);
    }

    /// Resolves a path against the shell's working directory
    pub fn resolve_path(&self, path: &str) -> String {
        normalize_path(self.cwd, path)
    }

    // Storage

    pub(crate) fn storage(&self) -> &dyn Storage {
        &*self.storage
    }

    pub fn read(&self, path: &str) -> Result<Node, ShellError> {
        Ok(self.storage.read(&self.resolve_path(path))?)
    }

    /// Reads a file; directories are an error
    pub fn read_file(&self, path: &str) -> Result<String, ShellError> {
        let resolved = self.resolve_path(path);
        match self.storage.read(&resolved)? {
            Node::File(content) => Ok(content),
            Node::Directory(_) => Err(StorageError::IsDirectory(resolved).into()),
        }
    }

    pub fn write(&mut self, path: &str, content: &str) -> Result<(), ShellError> {
        let resolved = self.resolve_path(path);
        Ok(self.storage.write(&resolved, content)?)
    }

    pub fn remove(&mut self, path: &str) -> Result<(), ShellError> {
        let resolved = self.resolve_path(path);
        Ok(self.storage.remove(&resolved)?)
    }

    // Network

    pub fn fetch(&mut self, url: &str) -> Result<String, ShellError> {
        Ok(self.network.fetch(url)?)
    }

    pub fn ping(&mut self, host: &str) -> Result<u64, ShellError> {
        Ok(self.network.ping(host)?)
    }

    // Process table

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.kernel.table().get(pid)
    }

    pub fn processes(&self) -> &[Process] {
        self.kernel.table().list()
    }

    /// Posts a message from the invoking process
    pub fn post_message(&mut self, to: Pid, payload: MessagePayload) -> Result<MessageId, ShellError> {
        let from = self.pid;
        self.kernel
            .table_mut()
            .post_message(from, to, payload)
            .map_err(|_| ShellError::NotFound(format!("process {}", to)))
    }

    /// Registers a listener for `pid`, flushing its queued messages into it
    pub fn on_message(&mut self, pid: Pid, listener: MessageListener) -> Result<usize, ShellError> {
        self.kernel
            .table_mut()
            .on_message(pid, listener)
            .map_err(|_| ShellError::NotFound(format!("process {}", pid)))
    }

    pub fn remove_listener(&mut self, pid: Pid) -> bool {
        self.kernel.table_mut().remove_listener(pid)
    }

    pub fn mailbox(&self, pid: Pid) -> Option<&Mailbox> {
        self.kernel.table().mailbox(pid)
    }

    /// Removes and returns the queued messages of `pid`
    pub fn take_mailbox(&mut self, pid: Pid) -> Result<Vec<MessageEnvelope>, ShellError> {
        self.kernel
            .table_mut()
            .take_mailbox(pid)
            .map_err(|_| ShellError::NotFound(format!("process {}", pid)))
    }

    /// Spawns a worker owned by the invoking process
    pub fn spawn_thread(
        &mut self,
        body: ThreadBody,
        on_message: ThreadMessageHandler,
        on_error: ThreadErrorHandler,
    ) -> Option<ThreadId> {
        let pid = self.pid;
        self.kernel
            .table_mut()
            .spawn_thread(pid, body, on_message, on_error)
    }

    pub fn post_message_to_thread(&mut self, thread: ThreadId, payload: MessagePayload) -> bool {
        let pid = self.pid;
        self.kernel
            .table_mut()
            .post_message_to_thread(pid, thread, payload)
    }

    pub fn terminate_thread(&mut self, thread: ThreadId) -> bool {
        let pid = self.pid;
        self.kernel.table_mut().terminate_thread(pid, thread)
    }

    /// Waits for worker replies and dispatches them to their callbacks
    pub fn wait_thread_events(&mut self, timeout: Duration) -> usize {
        self.kernel.table_mut().wait_thread_events(timeout)
    }

    /// Sleeps in simulated time
    pub fn sleep(&mut self, ms: u64) {
        self.kernel.sleep(ms);
    }

    // Invocation

    pub fn stdin(&self) -> &[String] {
        self.stdin
    }

    pub fn is_sudo(&self) -> bool {
        self.is_sudo
    }

    pub fn is_background(&self) -> bool {
        self.background
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn shell_pid(&self) -> Pid {
        self.kernel.shell_pid()
    }

    pub fn cwd(&self) -> &str {
        self.cwd
    }

    /// Lines of stdin, with multi-line chunks split
    pub fn stdin_lines(&self) -> Vec<String> {
        self.stdin
            .iter()
            .flat_map(|chunk| chunk.lines())
            .map(String::from)
            .collect()
    }
}
