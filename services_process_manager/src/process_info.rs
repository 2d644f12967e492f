//! # Process Information and Control
//!
//! This module provides user-facing rendering for process management (ps, kill).

use crate::Process;
use core_types::Pid;
use std::fmt;

/// Formats processes as the `ps` table
pub fn format_table<'a>(processes: impl IntoIterator<Item = &'a Process>) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:>5} {:>5} {:<12} {:<10} {:>6} {:>9} {:>7} {:>3} {:<6} {:<6} {}\n",
        "PID", "PPID", "NAME", "STATUS", "CPU%", "CPU-TIME", "MEM", "THR", "TYPE", "PRI", "COMMAND"
    ));

    for process in processes {
        let ppid = process
            .ppid
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!(
            "{:>5} {:>5} {:<12} {:<10} {:>6.1} {:>8.2}s {:>4} MB {:>3} {:<6} {:<6} {}\n",
            process.pid,
            ppid,
            process.name,
            process.status.as_str(),
            process.cpu,
            process.cpu_time,
            process.memory.as_mb(),
            process.thread_count(),
            process.kind.as_str(),
            process.priority.as_str(),
            process.command.as_deref().unwrap_or("")
        ));
    }

    output.truncate(output.trim_end().len());
    output
}

/// Result of a kill operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillResult {
    /// Process was terminated and purged
    Killed { pid: Pid },
    /// No live process has this pid
    NotFound { pid: Pid },
    /// System processes are never killable
    Protected { pid: Pid, name: String },
}

impl KillResult {
    pub fn is_success(&self) -> bool {
        matches!(self, KillResult::Killed { .. })
    }
}

impl fmt::Display for KillResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KillResult::Killed { pid } => write!(f, "Killed process {}", pid),
            KillResult::NotFound { pid } => write!(f, "No such process: {}", pid),
            KillResult::Protected { pid, name } => {
                write!(f, "Cannot kill system process {} ({})", pid, name)
            }
        }
    }
}
