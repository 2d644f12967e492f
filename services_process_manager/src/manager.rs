//! Process table: lifecycle, scheduling tick, IPC and worker threads.

use crate::process::{Priority, Process, ProcessSpec, ProcessStatus};
use crate::process_info::KillResult;
use crate::scheduler::{RunQueue, Telemetry};
use crate::threads::{ThreadBody, ThreadErrorHandler, ThreadMessageHandler, WorkerPool};
use core_types::{MessageId, Pid, ThreadId};
use ipc::{Mailbox, MessageEnvelope, MessagePayload};
use resources::{MemoryPool, MemoryUnits};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("No such process: {0}")]
    NotFound(Pid),
}

/// Callback receiving messages posted to a process
pub type MessageListener = Box<dyn FnMut(&MessageEnvelope)>;

/// The process table of one kernel session.
///
/// Every mutation of a process record goes through a method of this type.
pub struct ProcessTable {
    processes: Vec<Process>,
    run_queue: RunQueue,
    memory: MemoryPool,
    telemetry: Telemetry,
    next_pid: Pid,
    next_message_id: u64,
    listeners: HashMap<Pid, MessageListener>,
    workers: WorkerPool,
    now_ms: u64,
}

impl ProcessTable {
    /// Creates an empty table over a pool of `memory_total`
    pub fn new(memory_total: MemoryUnits, seed: Option<u64>) -> Self {
        Self {
            processes: Vec::new(),
            run_queue: RunQueue::new(),
            memory: MemoryPool::new(memory_total),
            telemetry: Telemetry::new(seed),
            next_pid: Pid::FIRST,
            next_message_id: 1,
            listeners: HashMap::new(),
            workers: WorkerPool::new(),
            now_ms: 0,
        }
    }

    /// Updates the simulated clock used to stamp new processes
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    /// Creates a process and schedules it.
    ///
    /// Returns `None` when the memory pool cannot hold the reservation; the
    /// caller reports resource exhaustion.
    pub fn create(&mut self, spec: ProcessSpec) -> Option<Pid> {
        if let Err(err) = self.memory.allocate(spec.memory) {
            log::warn!("cannot create process '{}': {}", spec.name, err);
            return None;
        }

        let pid = self.next_pid;
        self.next_pid = pid.next();

        let cpu = self.telemetry.initial_spike();
        log::debug!(
            "created pid {} '{}' ({}, {}, {})",
            pid,
            spec.name,
            spec.kind,
            spec.priority,
            spec.memory
        );
        self.processes
            .push(Process::new(pid, spec, self.now_ms, cpu));
        self.run_queue.push_back(pid);
        Some(pid)
    }

    /// One scheduler tick.
    ///
    /// Sorts the run queue by priority and pops the front. A running process
    /// gets a new cpu reading, accrues `cpu% / 100 × tick_seconds` of cpu
    /// time and goes to the back of the queue. A popped process that is not
    /// running leaves the queue until resumed. Every process that is not
    /// running reads 0% afterwards.
    pub fn tick(&mut self, tick_seconds: f64) -> Option<Pid> {
        let processes = &self.processes;
        self.run_queue.sort_by_priority(|pid| {
            processes
                .iter()
                .find(|p| p.pid == pid)
                .map(|p| p.priority)
                .unwrap_or(Priority::Low)
        });

        let popped = self.run_queue.pop_front();
        if let Some(pid) = popped {
            match self.processes.iter_mut().find(|p| p.pid == pid) {
                Some(process) if process.is_running() => {
                    process.cpu = self.telemetry.walk(process.cpu, process.kind);
                    process.cpu_time += process.cpu / 100.0 * tick_seconds;
                    self.run_queue.push_back(pid);
                }
                Some(_) => {}
                None => log::debug!("scheduler dropped stale pid {}", pid),
            }
        }

        for process in self.processes.iter_mut().filter(|p| !p.is_running()) {
            process.cpu = 0.0;
        }
        popped
    }

    /// Terminates a process.
    ///
    /// System processes are never killable. On success the owned threads are
    /// stopped, the memory is returned and terminated entries are purged.
    pub fn kill(&mut self, pid: Pid) -> KillResult {
        let Some(process) = self.processes.iter_mut().find(|p| p.pid == pid) else {
            return KillResult::NotFound { pid };
        };
        if process.is_system() {
            log::warn!("refusing to kill system process {} '{}'", pid, process.name);
            return KillResult::Protected {
                pid,
                name: process.name.clone(),
            };
        }

        process.status = ProcessStatus::Terminated;
        process.cpu = 0.0;
        let threads = std::mem::take(&mut process.threads);
        let memory = process.memory;

        for thread in threads {
            self.workers.terminate(thread);
        }
        self.memory.free(memory);
        self.listeners.remove(&pid);
        self.cleanup();

        log::debug!("killed pid {} (freed {})", pid, memory);
        KillResult::Killed { pid }
    }

    /// Purges terminated entries from the list and the run queue
    pub fn cleanup(&mut self) -> usize {
        let before = self.processes.len();
        self.processes.retain(|p| p.status != ProcessStatus::Terminated);

        let processes = &self.processes;
        self.run_queue
            .retain(|pid| processes.iter().any(|p| p.pid == *pid));
        before - self.processes.len()
    }

    /// running -> sleeping; false on any other state
    pub fn suspend(&mut self, pid: Pid) -> bool {
        match self.get_mut(pid) {
            Some(process) if process.status == ProcessStatus::Running => {
                process.status = ProcessStatus::Sleeping;
                log::debug!("suspended pid {}", pid);
                true
            }
            _ => false,
        }
    }

    /// sleeping -> running; re-enqueues the process if needed
    pub fn resume(&mut self, pid: Pid) -> bool {
        match self.get_mut(pid) {
            Some(process) if process.status == ProcessStatus::Sleeping => {
                process.status = ProcessStatus::Running;
            }
            _ => return false,
        }
        if !self.run_queue.contains(pid) {
            self.run_queue.push_back(pid);
        }
        log::debug!("resumed pid {}", pid);
        true
    }

    /// Changes the scheduling priority of a live process
    pub fn set_priority(&mut self, pid: Pid, priority: Priority) -> bool {
        match self.get_mut(pid) {
            Some(process) => {
                process.priority = priority;
                true
            }
            None => false,
        }
    }

    /// All live processes in pid order
    pub fn list(&self) -> &[Process] {
        &self.processes
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.iter().find(|p| p.pid == pid)
    }

    pub(crate) fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.pid == pid)
    }

    /// Binds a stage's streams onto its process record
    pub fn record_streams(
        &mut self,
        pid: Pid,
        stdin: &[String],
        stdout: &[String],
        stderr: &[String],
    ) -> bool {
        match self.get_mut(pid) {
            Some(process) => {
                process.stdin = stdin.to_vec();
                process.stdout = stdout.to_vec();
                process.stderr = stderr.to_vec();
                true
            }
            None => false,
        }
    }

    /// Processes that carry a command string, in pid order
    pub fn jobs(&self) -> Vec<&Process> {
        self.processes.iter().filter(|p| p.is_job()).collect()
    }

    pub fn memory(&self) -> &MemoryPool {
        &self.memory
    }

    pub fn run_queue(&self) -> &RunQueue {
        &self.run_queue
    }

    /// Delivers a message to `to`.
    ///
    /// With a registered listener the message is handed over synchronously;
    /// otherwise it waits in the recipient's mailbox.
    pub fn post_message(
        &mut self,
        from: Pid,
        to: Pid,
        payload: MessagePayload,
    ) -> Result<MessageId, ProcessError> {
        let id = MessageId::from_raw(self.next_message_id);
        let envelope = MessageEnvelope::new(id, from, to, payload);

        if let Some(listener) = self.listeners.get_mut(&to) {
            self.next_message_id += 1;
            listener(&envelope);
            return Ok(id);
        }

        let process = self
            .processes
            .iter_mut()
            .find(|p| p.pid == to)
            .ok_or(ProcessError::NotFound(to))?;
        self.next_message_id += 1;
        process.mailbox.push(envelope);
        Ok(id)
    }

    /// Registers a listener and flushes the mailbox into it.
    ///
    /// Queued messages are delivered once, oldest first; returns how many.
    pub fn on_message(
        &mut self,
        pid: Pid,
        mut listener: MessageListener,
    ) -> Result<usize, ProcessError> {
        let process = self.get_mut(pid).ok_or(ProcessError::NotFound(pid))?;
        let queued = process.mailbox.drain();
        let flushed = queued.len();
        for envelope in &queued {
            listener(envelope);
        }
        self.listeners.insert(pid, listener);
        Ok(flushed)
    }

    pub fn remove_listener(&mut self, pid: Pid) -> bool {
        self.listeners.remove(&pid).is_some()
    }

    pub fn mailbox(&self, pid: Pid) -> Option<&Mailbox> {
        self.get(pid).map(|p| &p.mailbox)
    }

    /// Empties a mailbox without touching the process's listener
    pub fn take_mailbox(&mut self, pid: Pid) -> Result<Vec<MessageEnvelope>, ProcessError> {
        let process = self.get_mut(pid).ok_or(ProcessError::NotFound(pid))?;
        Ok(process.mailbox.drain())
    }

    /// Starts a worker thread owned by `pid`; `None` if the pid is unknown
    pub fn spawn_thread(
        &mut self,
        pid: Pid,
        body: ThreadBody,
        on_message: ThreadMessageHandler,
        on_error: ThreadErrorHandler,
    ) -> Option<ThreadId> {
        if self.get(pid).is_none() {
            return None;
        }
        let thread = match self.workers.spawn(pid, body, on_message, on_error) {
            Ok(thread) => thread,
            Err(err) => {
                log::warn!("cannot spawn thread for pid {}: {}", pid, err);
                return None;
            }
        };
        if let Some(process) = self.get_mut(pid) {
            process.threads.push(thread);
        }
        log::debug!("pid {} spawned {}", pid, thread);
        Some(thread)
    }

    pub fn post_message_to_thread(
        &mut self,
        pid: Pid,
        thread: ThreadId,
        payload: MessagePayload,
    ) -> bool {
        self.owns_thread(pid, thread) && self.workers.post(thread, payload)
    }

    /// Stops a worker and detaches it from its owner
    pub fn terminate_thread(&mut self, pid: Pid, thread: ThreadId) -> bool {
        let Some(process) = self.get_mut(pid) else {
            return false;
        };
        let Some(index) = process.threads.iter().position(|t| *t == thread) else {
            return false;
        };
        process.threads.remove(index);
        self.workers.terminate(thread);
        log::debug!("pid {} terminated {}", pid, thread);
        true
    }

    fn owns_thread(&self, pid: Pid, thread: ThreadId) -> bool {
        self.workers.owner(thread) == Some(pid)
            && self
                .get(pid)
                .map(|p| p.threads.contains(&thread))
                .unwrap_or(false)
    }

    /// Dispatches pending worker replies to their owners' callbacks
    pub fn pump_thread_events(&mut self) -> usize {
        self.workers.pump()
    }

    /// Waits up to `timeout` for worker replies, then dispatches them
    pub fn wait_thread_events(&mut self, timeout: Duration) -> usize {
        self.workers.wait(timeout)
    }

    /// Stops every worker of every process
    pub fn terminate_all_threads(&mut self) {
        self.workers.terminate_all();
        for process in &mut self.processes {
            process.threads.clear();
        }
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }
}
