//! Job control: `jobs`, `bg`, `fg`, the suspend gesture and background timers
//!
//! A job is any process bearing a command string. Job numbers are 1-based
//! positions in pid order, so they shift as earlier jobs finish.

use crate::Shell;
use core_types::Pid;
use kernel_api::{Network, OutputStyle, ShellError, Storage, Terminal};
use services_process_manager::{Process, ProcessStatus, ProcessType};

fn describe(index: usize, process: &Process) -> String {
    format!(
        "[{}] {:<8} {}",
        index,
        process.status.as_str(),
        process.command.as_deref().unwrap_or(&process.name)
    )
}

impl<S: Storage, T: Terminal, N: Network> Shell<S, T, N> {
    /// Job list, excluding the process asking for it
    fn job_list(&self, caller: Pid) -> Vec<&Process> {
        self.kernel
            .table()
            .jobs()
            .into_iter()
            .filter(|p| p.pid != caller)
            .collect()
    }

    /// Resolves `N` or `%N` to a job's pid
    pub(crate) fn job_at(&self, caller: Pid, reference: &str) -> Result<(usize, Pid), ShellError> {
        let raw = reference.strip_prefix('%').unwrap_or(reference);
        let index: usize = raw
            .parse()
            .map_err(|_| ShellError::InvalidInput(format!("bad job reference '{}'", reference)))?;
        let jobs = self.job_list(caller);
        index
            .checked_sub(1)
            .and_then(|i| jobs.get(i))
            .map(|p| (index, p.pid))
            .ok_or_else(|| ShellError::NotFound(format!("job {}", index)))
    }

    pub(crate) fn builtin_jobs(&self, caller: Pid) -> Option<String> {
        let lines: Vec<String> = self
            .job_list(caller)
            .iter()
            .enumerate()
            .map(|(i, p)| describe(i + 1, p))
            .collect();
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    pub(crate) fn builtin_bg(&mut self, caller: Pid, args: &[String]) -> Result<Option<String>, ShellError> {
        let reference = args
            .first()
            .ok_or_else(|| ShellError::InvalidInput("usage: bg <job>".to_string()))?;
        let (index, pid) = self.job_at(caller, reference)?;
        let table = self.kernel.table_mut();
        if !table.resume(pid) {
            return Ok(Some(format!("[{}] already running", index)));
        }
        let command = table
            .get(pid)
            .and_then(|p| p.command.clone())
            .unwrap_or_default();
        Ok(Some(format!("[{}] {} &", index, command)))
    }

    /// Resumes a job and echoes its command; input is not blocked
    pub(crate) fn builtin_fg(&mut self, caller: Pid, args: &[String]) -> Result<Option<String>, ShellError> {
        let reference = args
            .first()
            .ok_or_else(|| ShellError::InvalidInput("usage: fg <job>".to_string()))?;
        let (_, pid) = self.job_at(caller, reference)?;
        let table = self.kernel.table_mut();
        table.resume(pid);
        Ok(table.get(pid).and_then(|p| p.command.clone()))
    }

    /// The suspend gesture.
    ///
    /// Stops the most recently started running user process, skipping
    /// `sudo`. Returns the pid that was stopped.
    pub fn suspend_foreground(&mut self) -> Option<Pid> {
        let target = self
            .kernel
            .table()
            .list()
            .iter()
            .filter(|p| p.kind == ProcessType::User && p.is_running() && p.name != "sudo")
            .max_by_key(|p| (p.start_time_ms, p.pid))
            .map(|p| p.pid)?;

        self.kernel.table_mut().suspend(target);
        let shell = self.kernel.shell_pid();
        let notice = match self
            .job_list(shell)
            .iter()
            .enumerate()
            .find(|(_, p)| p.pid == target)
        {
            Some((i, p)) => describe(i + 1, p),
            None => format!("stopped {}", target),
        };
        self.terminal.print(&notice, OutputStyle::Info);
        log::info!("suspended pid {}", target);
        Some(target)
    }

    /// Registers a background sleeper that finishes at `deadline_ms`
    pub(crate) fn start_timer(&mut self, pid: Pid, deadline_ms: u64) {
        self.timers.insert(pid, deadline_ms);
    }

    /// Finishes background sleepers whose deadline has passed.
    ///
    /// A stopped sleeper is left alone until it is resumed. Returns the pids
    /// that finished.
    pub fn reap_jobs(&mut self) -> Vec<Pid> {
        let now = self.kernel.now_ms();
        let table = self.kernel.table();
        let shell = self.kernel.shell_pid();

        let mut due = Vec::new();
        let mut stale = Vec::new();
        for (&pid, &deadline) in &self.timers {
            match table.get(pid) {
                None => stale.push(pid),
                Some(p) if p.status == ProcessStatus::Running && deadline <= now => due.push(pid),
                Some(_) => {}
            }
        }

        let mut notices = Vec::new();
        for &pid in &due {
            let jobs = self.job_list(shell);
            if let Some((i, p)) = jobs.iter().enumerate().find(|(_, p)| p.pid == pid) {
                notices.push(format!(
                    "[{}] done     {}",
                    i + 1,
                    p.command.as_deref().unwrap_or(&p.name)
                ));
            }
            self.kernel.table_mut().kill(pid);
        }
        for pid in stale.iter().chain(due.iter()) {
            self.timers.remove(pid);
        }
        for notice in notices {
            self.terminal.print(&notice, OutputStyle::Info);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::shell;
    use kernel_api::OutputStyle;
    use services_process_manager::ProcessStatus;

    #[test]
    fn test_jobs_lists_background_work() {
        let mut shell = shell();
        shell.submit("sleep 30 &");
        shell.submit("spin 10 &");
        let outcome = shell.execute("jobs", false);
        let lines: Vec<&str> = outcome.stdout.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[1] running"));
        assert!(lines[0].ends_with("sleep 30"));
        assert!(lines[1].ends_with("spin 10"));
    }

    #[test]
    fn test_suspend_then_bg_and_fg() {
        let mut shell = shell();
        let job = shell.submit("sleep 30 &").unwrap().job.unwrap();

        assert_eq!(shell.suspend_foreground(), Some(job));
        assert_eq!(
            shell.kernel().table().get(job).unwrap().status,
            ProcessStatus::Sleeping
        );
        shell.kernel_mut().advance(1000);
        assert_eq!(shell.kernel().table().get(job).unwrap().cpu, 0.0);

        let outcome = shell.execute("bg 1", false);
        assert_eq!(outcome.stdout, "[1] sleep 30 &");
        assert!(shell.kernel().table().get(job).unwrap().is_running());

        let outcome = shell.execute("bg %1", false);
        assert_eq!(outcome.stdout, "[1] already running");

        shell.suspend_foreground();
        let outcome = shell.execute("fg 1", false);
        assert_eq!(outcome.stdout, "sleep 30");
        assert!(shell.kernel().table().get(job).unwrap().is_running());
    }

    #[test]
    fn test_suspend_with_nothing_running() {
        let mut shell = shell();
        assert_eq!(shell.suspend_foreground(), None);
    }

    #[test]
    fn test_bad_job_references() {
        let mut shell = shell();
        let outcome = shell.execute("fg 3", false);
        assert_eq!(outcome.stderr_lines, vec!["job 3: not found"]);
        let outcome = shell.execute("bg x", false);
        assert!(outcome.stderr_lines[0].starts_with("Invalid input"));
        let outcome = shell.execute("bg", false);
        assert!(outcome.stderr_lines[0].contains("usage"));
    }

    #[test]
    fn test_failed_background_stage_is_not_a_job() {
        let mut shell = shell();
        shell.execute("sleep 1", false);
        let baseline = shell.kernel().table().list().len();

        for line in ["sleep 1e300", "sleep nope", "spin -3"] {
            let outcome = shell.execute(line, true);
            assert!(outcome.job.is_none());
            assert!(outcome.stderr_lines[0].starts_with("Invalid input"));
        }
        assert_eq!(shell.kernel().table().list().len(), baseline);
        assert!(shell.execute("jobs", false).stdout.is_empty());
    }

    #[test]
    fn test_background_sleep_finishes_on_time() {
        let mut shell = shell();
        let job = shell.submit("sleep 2 &").unwrap().job.unwrap();

        shell.kernel_mut().advance(1000);
        assert!(shell.reap_jobs().is_empty());

        shell.kernel_mut().advance(1000);
        assert_eq!(shell.reap_jobs(), vec![job]);
        assert!(shell.kernel().table().get(job).is_none());
        assert!(shell
            .terminal()
            .printed(OutputStyle::Info)
            .iter()
            .any(|line| line.starts_with("[1] done") && line.ends_with("sleep 2")));
    }

    #[test]
    fn test_stopped_sleeper_is_not_reaped() {
        let mut shell = shell();
        let job = shell.submit("sleep 1 &").unwrap().job.unwrap();
        shell.suspend_foreground();
        shell.kernel_mut().advance(5000);
        assert!(shell.reap_jobs().is_empty());

        shell.execute("bg 1", false);
        assert_eq!(shell.reap_jobs(), vec![job]);
    }
}
