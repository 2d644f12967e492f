//! Process records

use core_types::{Pid, ThreadId};
use ipc::Mailbox;
use resources::MemoryUnits;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process lifecycle state
///
/// State transitions:
/// - Running -> Sleeping (suspend)
/// - Sleeping -> Running (resume)
/// - Running | Sleeping -> Terminated (kill, final)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStatus {
    Running,
    Sleeping,
    Terminated,
}

impl ProcessStatus {
    /// Returns the status as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Running => "running",
            ProcessStatus::Sleeping => "sleeping",
            ProcessStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a process belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessType {
    User,
    /// Kernel-owned; never killable
    System,
}

impl ProcessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessType::User => "user",
            ProcessType::System => "system",
        }
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduling priority; the run queue is sorted ascending, so `High` goes first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for [`crate::ProcessTable::create`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub name: String,
    pub memory: MemoryUnits,
    pub kind: ProcessType,
    pub ppid: Option<Pid>,
    pub command: Option<String>,
    pub priority: Priority,
}

impl ProcessSpec {
    /// A user process with normal priority and no parent
    pub fn user(name: impl Into<String>, memory: MemoryUnits) -> Self {
        Self {
            name: name.into(),
            memory,
            kind: ProcessType::User,
            ppid: None,
            command: None,
            priority: Priority::Normal,
        }
    }

    /// A system process with normal priority and no parent
    pub fn system(name: impl Into<String>, memory: MemoryUnits) -> Self {
        Self {
            kind: ProcessType::System,
            ..Self::user(name, memory)
        }
    }

    pub fn with_parent(mut self, ppid: Pid) -> Self {
        self.ppid = Some(ppid);
        self
    }

    /// Marks the process as a job started from this command line
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// A process record
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub ppid: Option<Pid>,
    pub name: String,
    pub status: ProcessStatus,
    /// Simulated session time at creation
    pub start_time_ms: u64,
    /// Accumulated CPU-seconds
    pub cpu_time: f64,
    /// Reserved memory
    pub memory: MemoryUnits,
    /// Instantaneous simulated CPU percentage
    pub cpu: f64,
    pub kind: ProcessType,
    pub priority: Priority,
    /// Originating command line; present for jobs only
    pub command: Option<String>,
    pub stdin: Vec<String>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// Messages waiting for a listener
    pub mailbox: Mailbox,
    /// Owned worker threads
    pub threads: Vec<ThreadId>,
}

impl Process {
    pub(crate) fn new(pid: Pid, spec: ProcessSpec, start_time_ms: u64, cpu: f64) -> Self {
        Self {
            pid,
            ppid: spec.ppid,
            name: spec.name,
            status: ProcessStatus::Running,
            start_time_ms,
            cpu_time: 0.0,
            memory: spec.memory,
            cpu,
            kind: spec.kind,
            priority: spec.priority,
            command: spec.command,
            stdin: Vec::new(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            mailbox: Mailbox::new(),
            threads: Vec::new(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ProcessStatus::Running
    }

    pub fn is_system(&self) -> bool {
        self.kind == ProcessType::System
    }

    /// Whether this process is tracked by job control
    pub fn is_job(&self) -> bool {
        self.command.is_some()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}
