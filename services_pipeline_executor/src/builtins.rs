//! Commands implemented inside the shell engine

use crate::{Invocation, Shell, MAX_SCRIPT_DEPTH};
use core_types::Pid;
use kernel_api::{file_name, normalize_path, Network, Node, ShellError, Storage, Terminal};
use services_process_manager::{format_table, KillResult, Priority};
use services_settings::persistence::{serialize_overrides, SettingsOverridesData};
use services_settings::{KernelConfig, SettingKey, SettingsError, ShellConfig, PROFILE};
use std::time::Duration;

/// Built-in names with their `help` line
pub const BUILTINS: &[(&str, &str)] = &[
    ("help", "list commands"),
    ("echo", "print arguments"),
    ("memstat", "show memory usage"),
    ("whoami", "print the current user"),
    ("reboot", "restart the kernel session"),
    ("clear", "clear the terminal"),
    ("ls", "list a directory"),
    ("cat", "print files, or stdin"),
    ("touch", "create an empty file"),
    ("rm", "remove a file or directory"),
    ("mkdir", "create a directory"),
    ("run", "execute a script file"),
    ("ps", "list processes"),
    ("kill", "terminate a process or job"),
    ("jobs", "list jobs"),
    ("bg", "resume a job in the background"),
    ("fg", "resume a job"),
    ("cd", "change directory"),
    ("pwd", "print working directory"),
    ("sleep", "wait for some seconds"),
    ("spin", "busy-wait for some seconds"),
    ("sudo", "run the next command privileged"),
    ("pkg", "list, install or remove packages"),
    ("settings", "inspect or change settings"),
    ("history", "show command history"),
    ("uptime", "show session uptime"),
    ("dmesg", "show recent kernel log"),
];

/// Paths `rm` refuses without sudo
const PROTECTED_PATHS: &[&str] = &["/", "/bin", "/etc"];

const DEFAULT_DMESG_LINES: usize = 20;

/// Longest accepted `sleep`/`spin` duration: one simulated day
pub const MAX_SLEEP: Duration = Duration::from_secs(86_400);

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.iter().any(|(builtin, _)| *builtin == name)
}

fn usage(text: &str) -> ShellError {
    ShellError::InvalidInput(format!("usage: {}", text))
}

/// Parses a duration in seconds (fractions allowed) into milliseconds,
/// rounded to the nearest millisecond and at most [`MAX_SLEEP`]
fn parse_seconds(raw: &str) -> Result<u64, ShellError> {
    let invalid = || ShellError::InvalidInput(format!("invalid duration '{}'", raw));
    let secs = raw.parse::<f64>().map_err(|_| invalid())?;
    if secs > MAX_SLEEP.as_secs_f64() {
        return Err(ShellError::InvalidInput(format!(
            "duration '{}' exceeds {} seconds",
            raw,
            MAX_SLEEP.as_secs()
        )));
    }
    let duration = Duration::try_from_secs_f64(secs).map_err(|_| invalid())?;
    u64::try_from((duration.as_nanos() + 500_000) / 1_000_000).map_err(|_| invalid())
}

fn settings_error(err: SettingsError) -> ShellError {
    match err {
        SettingsError::UnknownKey(key) => ShellError::NotFound(format!("setting {}", key)),
        other => ShellError::InvalidInput(other.to_string()),
    }
}

impl<S: Storage, T: Terminal, N: Network> Shell<S, T, N> {
    pub(crate) fn run_builtin(
        &mut self,
        name: &str,
        inv: &Invocation<'_>,
    ) -> Result<Option<String>, ShellError> {
        let args = inv.args;
        match name {
            "help" => Ok(Some(self.builtin_help())),
            "echo" => Ok(Some(args.join(" "))),
            "memstat" => Ok(Some(self.builtin_memstat())),
            "whoami" => Ok(Some(self.config.user.clone())),
            "reboot" => self.builtin_reboot(),
            "clear" => {
                self.terminal.clear();
                Ok(None)
            }
            "ls" => self.builtin_ls(args),
            "cat" => self.builtin_cat(args, inv.stdin),
            "touch" => self.builtin_touch(args),
            "rm" => self.builtin_rm(args, inv.is_sudo),
            "mkdir" => self.builtin_mkdir(args),
            "run" => self.builtin_run(args),
            "ps" => Ok(Some(format_table(self.kernel.table().list()))),
            "kill" => self.builtin_kill(inv),
            "jobs" => Ok(self.builtin_jobs(inv.pid)),
            "bg" => self.builtin_bg(inv.pid, args),
            "fg" => self.builtin_fg(inv.pid, args),
            "cd" => self.builtin_cd(args),
            "pwd" => Ok(Some(self.cwd.clone())),
            "sleep" => self.builtin_sleep(inv, false),
            "spin" => self.builtin_sleep(inv, true),
            "sudo" => Ok(None),
            "pkg" => self.builtin_pkg(args),
            "settings" => self.builtin_settings(args),
            "history" => Ok(self.builtin_history()),
            "uptime" => Ok(Some(self.builtin_uptime())),
            "dmesg" => self.builtin_dmesg(args),
            other => Err(ShellError::NotFound(other.to_string())),
        }
    }

    fn builtin_help(&self) -> String {
        let mut lines = vec!["Built-in commands:".to_string()];
        lines.extend(
            BUILTINS
                .iter()
                .map(|(name, about)| format!("  {:<10} {}", name, about)),
        );

        let installed = self.loader.installed(&self.storage);
        if !installed.is_empty() {
            lines.push("Installed packages:".to_string());
            let available = self.loader.available();
            for name in installed {
                let about = available
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map_or("", |(_, about)| *about);
                lines.push(format!("  {:<10} {}", name, about));
            }
        }
        lines.join("\n")
    }

    fn builtin_memstat(&self) -> String {
        let memory = self.kernel.table().memory();
        format!(
            "Memory: {} / {} used ({:.1}%), {} free",
            memory.used(),
            memory.total(),
            memory.usage_percent(),
            memory.available()
        )
    }

    fn builtin_reboot(&mut self) -> Result<Option<String>, ShellError> {
        let session = self
            .kernel
            .reboot()
            .map_err(|err| ShellError::ExecutionError(err.to_string()))?;
        self.timers.clear();
        Ok(Some(format!("Rebooted into {}", session)))
    }

    fn builtin_ls(&self, args: &[String]) -> Result<Option<String>, ShellError> {
        let path = normalize_path(&self.cwd, args.first().map_or(".", String::as_str));
        match self.storage.read(&path)? {
            Node::File(_) => Ok(Some(file_name(&path).to_string())),
            Node::Directory(entries) if entries.is_empty() => Ok(None),
            Node::Directory(entries) => {
                let names: Vec<String> = entries
                    .iter()
                    .map(|(name, node)| {
                        if node.is_dir() {
                            format!("{}/", name)
                        } else {
                            name.clone()
                        }
                    })
                    .collect();
                Ok(Some(names.join("\n")))
            }
        }
    }

    fn builtin_cat(&self, args: &[String], stdin: &[String]) -> Result<Option<String>, ShellError> {
        if args.is_empty() {
            return Ok((!stdin.is_empty()).then(|| stdin.join("\n")));
        }
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let path = normalize_path(&self.cwd, arg);
            match self.storage.read(&path)? {
                Node::File(content) => parts.push(content),
                Node::Directory(_) => {
                    return Err(ShellError::ExecutionError(format!("{}: is a directory", path)))
                }
            }
        }
        Ok(Some(parts.join("\n")))
    }

    fn builtin_touch(&mut self, args: &[String]) -> Result<Option<String>, ShellError> {
        if args.is_empty() {
            return Err(usage("touch <file>..."));
        }
        for arg in args {
            let path = normalize_path(&self.cwd, arg);
            if !self.storage.exists(&path) {
                self.storage.write(&path, "")?;
            }
        }
        Ok(None)
    }

    fn builtin_rm(&mut self, args: &[String], is_sudo: bool) -> Result<Option<String>, ShellError> {
        if args.is_empty() {
            return Err(usage("rm <path>..."));
        }
        for arg in args {
            let path = normalize_path(&self.cwd, arg);
            if !is_sudo && PROTECTED_PATHS.contains(&path.as_str()) {
                return Err(ShellError::PermissionDenied(format!(
                    "{} is protected (try sudo)",
                    path
                )));
            }
            self.storage.remove(&path)?;
            log::info!("removed {}{}", path, if is_sudo { " (sudo)" } else { "" });
        }
        Ok(None)
    }

    fn builtin_mkdir(&mut self, args: &[String]) -> Result<Option<String>, ShellError> {
        if args.is_empty() {
            return Err(usage("mkdir <dir>..."));
        }
        for arg in args {
            self.storage.mkdir(&normalize_path(&self.cwd, arg))?;
        }
        Ok(None)
    }

    /// Executes each non-empty, non-comment line of a script
    fn builtin_run(&mut self, args: &[String]) -> Result<Option<String>, ShellError> {
        let path = normalize_path(
            &self.cwd,
            args.first().ok_or_else(|| usage("run <script>"))?,
        );
        let script = match self.storage.read(&path)? {
            Node::File(content) => content,
            Node::Directory(_) => {
                return Err(ShellError::ExecutionError(format!("{}: is a directory", path)))
            }
        };
        if self.depth >= MAX_SCRIPT_DEPTH {
            return Err(ShellError::ExecutionError(format!(
                "{}: scripts nested deeper than {}",
                path, MAX_SCRIPT_DEPTH
            )));
        }

        self.depth += 1;
        for line in script.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (command, background) = pipeline::split_background(line);
            self.execute(&command, background);
        }
        self.depth -= 1;
        Ok(None)
    }

    fn builtin_kill(&mut self, inv: &Invocation<'_>) -> Result<Option<String>, ShellError> {
        let target = inv.args.first().ok_or_else(|| usage("kill <pid|%job>"))?;
        let pid = if target.starts_with('%') {
            self.job_at(inv.pid, target)?.1
        } else {
            target
                .parse::<Pid>()
                .map_err(|_| ShellError::InvalidInput(format!("invalid pid '{}'", target)))?
        };

        let result = self.kernel.table_mut().kill(pid);
        self.timers.remove(&pid);
        match result {
            KillResult::Killed { .. } => Ok(Some(result.to_string())),
            KillResult::NotFound { pid } => Err(ShellError::NotFound(format!("process {}", pid))),
            KillResult::Protected { .. } => Err(ShellError::PermissionDenied(result.to_string())),
        }
    }

    fn builtin_cd(&mut self, args: &[String]) -> Result<Option<String>, ShellError> {
        let target = match args.first() {
            Some(path) => normalize_path(&self.cwd, path),
            None => format!("/home/{}", self.config.user),
        };
        match self.storage.read(&target)? {
            Node::Directory(_) => {
                self.cwd = target;
                Ok(None)
            }
            Node::File(_) => Err(ShellError::ExecutionError(format!(
                "{}: not a directory",
                target
            ))),
        }
    }

    /// `sleep` and `spin`.
    ///
    /// In the foreground the kernel clock advances, so the scheduler keeps
    /// ticking. In the background the stage process stays behind as a job
    /// that finishes when its deadline passes. `spin` raises its process to
    /// high priority so it shows up in the telemetry.
    fn builtin_sleep(&mut self, inv: &Invocation<'_>, spin: bool) -> Result<Option<String>, ShellError> {
        let ms = match inv.args.first() {
            Some(raw) => parse_seconds(raw)?,
            None if spin => 1000,
            None => return Err(usage("sleep <seconds>")),
        };
        if spin {
            self.kernel.table_mut().set_priority(inv.pid, Priority::High);
        }

        if inv.background {
            let deadline = self.kernel.now_ms().saturating_add(ms);
            self.start_timer(inv.pid, deadline);
            return Ok(None);
        }

        self.pause(ms);
        if !spin {
            return Ok(None);
        }
        let cpu_time = self
            .kernel
            .table()
            .get(inv.pid)
            .map_or(0.0, |p| p.cpu_time);
        Ok(Some(format!(
            "spun for {:.1}s ({:.2}s of cpu)",
            ms as f64 / 1000.0,
            cpu_time
        )))
    }

    fn builtin_pkg(&mut self, args: &[String]) -> Result<Option<String>, ShellError> {
        let (sub, names) = args
            .split_first()
            .ok_or_else(|| usage("pkg list | pkg install <name>... | pkg remove <name>..."))?;
        match sub.as_str() {
            "list" => {
                let installed = self.loader.installed(&self.storage);
                let lines: Vec<String> = self
                    .loader
                    .available()
                    .into_iter()
                    .map(|(name, about)| {
                        let mark = if installed.iter().any(|i| i == name) {
                            "installed"
                        } else {
                            ""
                        };
                        format!("{:<10} {:<9} {}", name, mark, about)
                    })
                    .collect();
                Ok(Some(lines.join("\n")))
            }
            "install" | "remove" if names.is_empty() => Err(usage(&format!("pkg {} <name>...", sub))),
            "install" => {
                for name in names {
                    self.loader.install(&mut self.storage, name)?;
                }
                Ok(Some(format!("installed {}", names.join(", "))))
            }
            "remove" => {
                for name in names {
                    self.loader.uninstall(&mut self.storage, name)?;
                }
                Ok(Some(format!("removed {}", names.join(", "))))
            }
            other => Err(ShellError::InvalidInput(format!("pkg: unknown subcommand '{}'", other))),
        }
    }

    fn builtin_settings(&mut self, args: &[String]) -> Result<Option<String>, ShellError> {
        let (sub, rest) = args
            .split_first()
            .ok_or_else(|| usage("settings list [prefix] | get <key> | set <key> <value> | reset <key> | export"))?;
        match (sub.as_str(), rest) {
            ("list", _) => {
                let prefix = rest.first().map_or("", String::as_str);
                let lines: Vec<String> = self
                    .settings
                    .list_with_prefix(PROFILE, prefix)
                    .into_iter()
                    .map(|(key, value)| format!("{} = {}", key, value))
                    .collect();
                Ok((!lines.is_empty()).then(|| lines.join("\n")))
            }
            ("get", [key]) => self
                .settings
                .get(PROFILE, &SettingKey::new(key.as_str()))
                .map(|value| Some(value.to_string()))
                .ok_or_else(|| ShellError::NotFound(format!("setting {}", key))),
            ("set", [key, value @ ..]) if !value.is_empty() => {
                let stored = self
                    .settings
                    .set_from_str(PROFILE, key, &value.join(" "))
                    .map_err(settings_error)?;
                self.reload_settings(key);
                Ok(Some(format!("{} = {}", key, stored)))
            }
            ("reset", [key]) => {
                let key = SettingKey::new(key.as_str());
                if self.settings.get_default(&key).is_none() {
                    return Err(ShellError::NotFound(format!("setting {}", key)));
                }
                self.settings.reset_to_default(PROFILE, &key);
                self.reload_settings(key.as_str());
                Ok(None)
            }
            ("export", []) => {
                let data = SettingsOverridesData::from_registry(&self.settings);
                let bytes = serialize_overrides(&data)
                    .map_err(|err| ShellError::ExecutionError(err.to_string()))?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            _ => Err(usage("settings list [prefix] | get <key> | set <key> <value> | reset <key> | export")),
        }
    }

    /// Shell settings apply now; kernel settings at the next reboot
    fn reload_settings(&mut self, key: &str) {
        if key.starts_with("kernel.") {
            self.kernel
                .set_config(KernelConfig::from_registry(&self.settings, PROFILE));
        } else {
            self.config = ShellConfig::from_registry(&self.settings, PROFILE);
        }
    }

    fn builtin_history(&self) -> Option<String> {
        let lines: Vec<String> = self
            .history
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{:>4}  {}", i + 1, line))
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    fn builtin_uptime(&self) -> String {
        let table = self.kernel.table();
        format!(
            "up {:.1}s, boot #{}, {} processes, {} jobs",
            self.kernel.uptime_ms() as f64 / 1000.0,
            self.kernel.boot_count(),
            table.list().len(),
            table.jobs().len()
        )
    }

    fn builtin_dmesg(&self, args: &[String]) -> Result<Option<String>, ShellError> {
        let count = match args.first() {
            Some(raw) => raw
                .parse()
                .map_err(|_| ShellError::InvalidInput(format!("invalid count '{}'", raw)))?,
            None => DEFAULT_DMESG_LINES,
        };
        let lines: Vec<String> = services_logger::recent(count)
            .iter()
            .map(ToString::to_string)
            .collect();
        Ok((!lines.is_empty()).then(|| lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{shell, shell_with};
    use kernel_api::{Node, OutputStyle, Storage};
    use services_process_manager::Priority;
    use services_settings::KernelConfig;

    #[test]
    fn test_echo_and_whoami() {
        let mut shell = shell();
        assert_eq!(shell.execute("echo  'a  b' c", false).stdout, "a  b c");
        assert_eq!(shell.execute("whoami", false).stdout, "user");
        assert_eq!(shell.execute("pwd", false).stdout, "/home/user");
    }

    #[test]
    fn test_rm_root_requires_sudo() {
        let mut shell = shell();
        let outcome = shell.execute("rm /", false);
        assert_eq!(outcome.stderr_lines.len(), 1);
        assert!(outcome.stderr_lines[0].starts_with("Permission denied"));
        assert!(shell.storage().exists("/etc/motd"));

        let outcome = shell.execute("sudo rm /", false);
        assert!(outcome.is_success());
        assert!(!shell.storage().exists("/etc"));
    }

    #[test]
    fn test_rm_protects_bin_and_etc() {
        let mut shell = shell();
        assert!(!shell.execute("rm /bin", false).is_success());
        assert!(!shell.execute("rm ../../etc", false).is_success());
        assert!(shell.storage().exists("/bin"));
        assert!(shell.execute("rm /etc/motd", false).is_success());
    }

    #[test]
    fn test_file_builtins() {
        let mut shell = shell();
        shell.execute("mkdir docs", false);
        shell.execute("touch docs/a docs/b", false);
        shell.execute("echo note > docs/c", false);

        assert_eq!(shell.execute("ls docs", false).stdout, "a\nb\nc");
        assert_eq!(shell.execute("cat docs/c", false).stdout, "note");
        assert_eq!(shell.execute("ls", false).stdout, "docs/");

        shell.execute("cd docs", false);
        assert_eq!(shell.cwd(), "/home/user/docs");
        shell.execute("cd", false);
        assert_eq!(shell.cwd(), "/home/user");

        let outcome = shell.execute("cat nope", false);
        assert_eq!(outcome.stderr_lines, vec!["/home/user/nope: not found"]);
        assert!(!shell.execute("cd docs/a", false).is_success());
    }

    #[test]
    fn test_touch_keeps_existing_content() {
        let mut shell = shell();
        shell.execute("echo keep > f", false);
        shell.execute("touch f", false);
        assert_eq!(
            shell.storage().read("/home/user/f").unwrap(),
            Node::File("keep".to_string())
        );
    }

    #[test]
    fn test_kill_system_process_is_denied_even_with_sudo() {
        let mut shell = shell();
        let kernel_pid = shell.kernel().kernel_pid();
        let outcome = shell.execute(&format!("sudo kill {}", kernel_pid), false);
        assert!(outcome.stderr_lines[0].starts_with("Permission denied"));
        assert!(shell.kernel().table().get(kernel_pid).is_some());
    }

    #[test]
    fn test_kill_job() {
        let mut shell = shell();
        let job = shell.submit("sleep 100 &").unwrap().job.unwrap();
        let outcome = shell.execute("kill %1", false);
        assert_eq!(outcome.stdout, format!("Killed process {}", job));
        assert!(shell.kernel().table().get(job).is_none());

        let outcome = shell.execute("kill 999", false);
        assert_eq!(outcome.stderr_lines, vec!["process 999: not found"]);
    }

    #[test]
    fn test_sleep_advances_the_clock() {
        let mut shell = shell();
        shell.execute("sleep 2.5", false);
        assert_eq!(shell.kernel().now_ms(), 2500);
        assert_eq!(shell.kernel().timer().ticks_fired(), 2);
        assert!(!shell.execute("sleep -1", false).is_success());
        assert!(!shell.execute("sleep", false).is_success());
    }

    #[test]
    fn test_oversized_sleep_is_rejected() {
        let mut shell = shell();
        for line in ["sleep 1e300", "sleep 100000000", "spin 86400.5"] {
            let outcome = shell.execute(line, false);
            assert_eq!(outcome.stderr_lines.len(), 1);
            assert!(outcome.stderr_lines[0].starts_with("Invalid input: duration"));
        }
        assert_eq!(shell.kernel().now_ms(), 0);

        assert!(shell.execute("sleep inf", false).stderr_lines[0].contains("exceeds 86400"));
        assert!(shell.execute("sleep NaN", false).stderr_lines[0].contains("invalid duration"));
    }

    #[test]
    fn test_sleep_rounds_to_milliseconds() {
        assert_eq!(super::parse_seconds("0.3"), Ok(300));
        assert_eq!(super::parse_seconds("0.0004"), Ok(0));
        assert_eq!(super::parse_seconds("86400"), Ok(86_400_000));
    }

    #[test]
    fn test_spin_reports_cpu_time() {
        let mut shell = shell();
        let outcome = shell.execute("spin 3", false);
        assert!(outcome.stdout.starts_with("spun for 3.0s"));

        let job = shell.submit("spin 5 &").unwrap().job.unwrap();
        assert_eq!(
            shell.kernel().table().get(job).unwrap().priority,
            Priority::High
        );
    }

    #[test]
    fn test_run_script() {
        let mut shell = shell();
        shell
            .storage_mut()
            .write("/home/user/setup.sh", "# setup\nmkdir out\n\necho done > out/log\n")
            .unwrap();
        assert!(shell.execute("run setup.sh", false).is_success());
        assert_eq!(
            shell.storage().read("/home/user/out/log").unwrap(),
            Node::File("done".to_string())
        );
    }

    #[test]
    fn test_recursive_script_is_bounded() {
        let mut shell = shell();
        shell
            .storage_mut()
            .write("/home/user/loop.sh", "run loop.sh")
            .unwrap();
        shell.execute("run loop.sh", false);
        assert!(shell
            .terminal()
            .printed(OutputStyle::Error)
            .iter()
            .any(|line| line.contains("nested deeper")));
        assert_eq!(shell.kernel().table().list().len(), 2);
    }

    #[test]
    fn test_pkg_commands() {
        let mut shell = shell();
        let listing = shell.execute("pkg list", false).stdout;
        assert!(listing.lines().any(|l| l.starts_with("sha256sum") && l.contains("installed")));

        assert!(shell.execute("pkg remove wc", false).is_success());
        assert!(!shell.storage().exists("/bin/wc"));
        assert!(shell.execute("pkg install wc", false).is_success());
        assert!(shell.storage().exists("/bin/wc"));
        assert!(!shell.execute("pkg install nonsense", false).is_success());
    }

    #[test]
    fn test_settings_commands() {
        let mut shell = shell();
        assert_eq!(shell.execute("settings get shell.user", false).stdout, "user");

        let outcome = shell.execute("settings set shell.user ada", false);
        assert_eq!(outcome.stdout, "shell.user = ada");
        assert_eq!(shell.execute("whoami", false).stdout, "ada");

        let outcome = shell.execute("settings set shell.history_limit lots", false);
        assert!(outcome.stderr_lines[0].starts_with("Invalid input"));
        let outcome = shell.execute("settings get no.such", false);
        assert_eq!(outcome.stderr_lines, vec!["setting no.such: not found"]);

        let export = shell.execute("settings export", false).stdout;
        assert!(export.contains("\"ada\""));

        shell.execute("settings reset shell.user", false);
        assert_eq!(shell.execute("whoami", false).stdout, "user");
    }

    #[test]
    fn test_stage_memory_setting_applies_immediately() {
        let mut shell = shell_with(KernelConfig::default().with_seed(2).with_memory_total(200));
        shell.execute("settings set shell.stage_memory_mb 64", false);
        let outcome = shell.execute("echo hi", false);
        assert!(outcome.stderr_lines[0].starts_with("Resource exhausted"));
    }

    #[test]
    fn test_reboot_builtin() {
        let mut shell = shell();
        shell.submit("sleep 100 &");
        let outcome = shell.execute("reboot", false);
        assert!(outcome.stdout.starts_with("Rebooted into session:"));
        assert_eq!(shell.kernel().boot_count(), 2);
        assert_eq!(shell.kernel().table().list().len(), 2);
        assert!(shell.execute("jobs", false).stdout.is_empty());
    }

    #[test]
    fn test_history_and_memstat() {
        let mut shell = shell();
        shell.submit("echo one");
        shell.submit("history");
        let outcome = shell.execute("history", false);
        assert_eq!(outcome.stdout, "   1  echo one\n   2  history");

        let outcome = shell.execute("memstat", false);
        assert!(outcome.stdout.starts_with("Memory: 168 MB / 1024 MB used"));
    }

    #[test]
    fn test_ps_lists_stage_process() {
        let mut shell = shell();
        let outcome = shell.execute("ps", false);
        let lines: Vec<&str> = outcome.stdout.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[3].contains("ps"));
    }

    #[test]
    fn test_help_lists_builtins_and_packages() {
        let mut shell = shell();
        let help = shell.execute("help", false).stdout;
        assert!(help.contains("memstat"));
        assert!(help.contains("Installed packages:"));
        assert!(help.contains("fib"));
    }

    #[test]
    fn test_clear_reaches_terminal() {
        let mut shell = shell();
        shell.execute("clear", false);
        assert_eq!(shell.terminal().clears, 1);
    }
}
