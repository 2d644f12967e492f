//! # Simulated Kernel
//!
//! This crate provides the session object that owns a process table.
//!
//! ## Purpose
//!
//! A [`Kernel`] is constructed at boot and torn down at reboot. It owns:
//! - The [`ProcessTable`] (no global process state anywhere)
//! - The simulated clock and the scheduler [`TickTimer`]
//! - The bootstrap `kernel` and `shell` system processes
//!
//! ## Philosophy
//!
//! **Testability is a first-class design constraint.**
//!
//! Time only moves when [`Kernel::advance`] is called. The interactive host
//! feeds it real elapsed time; tests feed it whatever they need, so every
//! scheduler tick is reproducible under `cargo test`.

pub mod timer;

use core_types::{Pid, SessionId};
use resources::MemoryUnits;
use services_process_manager::{Priority, ProcessSpec, ProcessTable};
use services_settings::KernelConfig;
use thiserror::Error;
use timer::TickTimer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("Boot failed: cannot reserve {requested} for '{process}' in a {total} pool")]
    BootFailed {
        process: &'static str,
        requested: MemoryUnits,
        total: MemoryUnits,
    },
}

/// Upper bound on scheduler ticks run by one [`Kernel::advance`]
pub const MAX_TICKS_PER_ADVANCE: u64 = 10_000;

/// One booted session
pub struct Kernel {
    config: KernelConfig,
    session: SessionId,
    table: ProcessTable,
    timer: TickTimer,
    kernel_pid: Pid,
    shell_pid: Pid,
    boots: u32,
}

impl Kernel {
    /// Boots a fresh session
    pub fn boot(config: KernelConfig) -> Result<Self, KernelError> {
        let (table, kernel_pid, shell_pid) = Self::bootstrap(&config)?;
        let session = SessionId::new();
        log::info!(
            "booted session {} ({} MB, tick {} ms)",
            session,
            config.memory_total_mb,
            config.tick_interval_ms
        );

        Ok(Self {
            timer: TickTimer::new(config.tick_interval_ms),
            config,
            session,
            table,
            kernel_pid,
            shell_pid,
            boots: 1,
        })
    }

    fn bootstrap(config: &KernelConfig) -> Result<(ProcessTable, Pid, Pid), KernelError> {
        let total = MemoryUnits::new(config.memory_total_mb);
        let mut table = ProcessTable::new(total, config.scheduler_seed);

        let kernel_memory = MemoryUnits::new(config.memory_kernel_mb);
        let kernel_pid = table
            .create(ProcessSpec::system("kernel", kernel_memory).with_priority(Priority::High))
            .ok_or(KernelError::BootFailed {
                process: "kernel",
                requested: kernel_memory,
                total,
            })?;

        let shell_memory = MemoryUnits::new(config.memory_shell_mb);
        let shell_pid = table
            .create(ProcessSpec::system("shell", shell_memory).with_parent(kernel_pid))
            .ok_or(KernelError::BootFailed {
                process: "shell",
                requested: shell_memory,
                total,
            })?;

        Ok((table, kernel_pid, shell_pid))
    }

    /// Tears the session down and boots a new one with the same config
    ///
    /// All worker threads are stopped and the process table is discarded.
    /// On failure the current session is left untouched.
    pub fn reboot(&mut self) -> Result<SessionId, KernelError> {
        let (table, kernel_pid, shell_pid) = Self::bootstrap(&self.config)?;
        self.table.terminate_all_threads();

        self.table = table;
        self.kernel_pid = kernel_pid;
        self.shell_pid = shell_pid;
        self.timer = TickTimer::new(self.config.tick_interval_ms);
        self.session = SessionId::new();
        self.boots += 1;

        log::info!("rebooted into session {}", self.session);
        Ok(self.session)
    }

    /// Advances simulated time, running one scheduler tick per elapsed interval
    ///
    /// At most [`MAX_TICKS_PER_ADVANCE`] ticks run. Beyond that the due
    /// intervals are folded into longer ticks, so accumulated `cpu_time`
    /// still covers the whole span. Returns the number of intervals that
    /// elapsed.
    pub fn advance(&mut self, delta_ms: u64) -> u64 {
        let due = self.timer.advance(delta_ms);
        let mut tick_secs = self.timer.interval_secs();
        let runs = due.min(MAX_TICKS_PER_ADVANCE);
        if runs < due {
            log::debug!("folding {} due ticks into {}", due, runs);
            tick_secs *= due as f64 / runs as f64;
        }
        for _ in 0..runs {
            self.table.tick(tick_secs);
        }
        self.table.set_now(self.timer.now_ms());
        due
    }

    /// Sleeps in simulated time; the scheduler keeps ticking meanwhile
    pub fn sleep(&mut self, ms: u64) -> u64 {
        self.advance(ms)
    }

    /// Simulated time since boot
    pub fn now_ms(&self) -> u64 {
        self.timer.now_ms()
    }

    pub fn uptime_ms(&self) -> u64 {
        self.now_ms()
    }

    pub fn session_id(&self) -> SessionId {
        self.session
    }

    pub fn kernel_pid(&self) -> Pid {
        self.kernel_pid
    }

    pub fn shell_pid(&self) -> Pid {
        self.shell_pid
    }

    /// Number of boots, including the first
    pub fn boot_count(&self) -> u32 {
        self.boots
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut ProcessTable {
        &mut self.table
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Replaces the boot parameters; they take effect at the next reboot
    pub fn set_config(&mut self, config: KernelConfig) {
        self.config = config;
    }

    pub fn timer(&self) -> &TickTimer {
        &self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use services_process_manager::{ProcessType, ProcessStatus};

    fn config() -> KernelConfig {
        KernelConfig::default().with_seed(7)
    }

    #[test]
    fn test_boot_creates_system_processes() {
        let kernel = Kernel::boot(config()).unwrap();
        let table = kernel.table();
        assert_eq!(table.list().len(), 2);

        let init = table.get(kernel.kernel_pid()).unwrap();
        assert_eq!(init.name, "kernel");
        assert_eq!(init.kind, ProcessType::System);
        assert_eq!(init.priority, Priority::High);

        let shell = table.get(kernel.shell_pid()).unwrap();
        assert_eq!(shell.ppid, Some(kernel.kernel_pid()));
        assert_eq!(table.memory().used(), MemoryUnits::new(160));
    }

    #[test]
    fn test_boot_fails_when_pool_too_small() {
        let result = Kernel::boot(config().with_memory_total(64));
        assert!(matches!(
            result,
            Err(KernelError::BootFailed { process: "kernel", .. })
        ));
    }

    #[test]
    fn test_system_processes_survive_kill() {
        let mut kernel = Kernel::boot(config()).unwrap();
        let pid = kernel.kernel_pid();
        assert!(!kernel.table_mut().kill(pid).is_success());
        assert_eq!(
            kernel.table().get(pid).unwrap().status,
            ProcessStatus::Running
        );
    }

    #[test]
    fn test_advance_runs_ticks() {
        let mut kernel = Kernel::boot(config()).unwrap();
        assert_eq!(kernel.advance(2500), 2);
        assert_eq!(kernel.now_ms(), 2500);
        assert_eq!(kernel.timer().ticks_fired(), 2);

        let total_cpu_time: f64 = kernel.table().list().iter().map(|p| p.cpu_time).sum();
        assert!(total_cpu_time > 0.0);
    }

    #[test]
    fn test_long_advance_folds_ticks() {
        let mut kernel = Kernel::boot(config().with_tick_interval(1)).unwrap();
        let kernel_pid = kernel.kernel_pid();

        let due = kernel.advance(u64::MAX / 2);
        assert_eq!(due, u64::MAX / 2);
        assert_eq!(kernel.timer().ticks_fired(), u64::MAX / 2);
        assert!(kernel.table().get(kernel_pid).unwrap().cpu_time > 0.0);

        kernel.advance(u64::MAX);
        assert_eq!(kernel.now_ms(), u64::MAX);
    }

    #[test]
    fn test_sleep_keeps_scheduler_ticking() {
        let mut kernel = Kernel::boot(config()).unwrap();
        assert_eq!(kernel.sleep(3000), 3);
    }

    #[test]
    fn test_reboot_starts_new_session() {
        let mut kernel = Kernel::boot(config()).unwrap();
        let first = kernel.session_id();
        let job = kernel
            .table_mut()
            .create(ProcessSpec::user("job", MemoryUnits::new(8)))
            .unwrap();
        kernel.advance(1500);

        let second = kernel.reboot().unwrap();
        assert_ne!(first, second);
        assert_eq!(kernel.boot_count(), 2);
        assert_eq!(kernel.now_ms(), 0);
        assert!(kernel.table().get(job).is_none());
        assert_eq!(kernel.table().list().len(), 2);
        assert_eq!(kernel.kernel_pid(), Pid::FIRST);
    }

    #[test]
    fn test_config_change_applies_at_reboot() {
        let mut kernel = Kernel::boot(config()).unwrap();
        kernel.set_config(config().with_memory_total(512));
        assert_eq!(kernel.table().memory().total(), MemoryUnits::new(1024));

        kernel.reboot().unwrap();
        assert_eq!(kernel.table().memory().total(), MemoryUnits::new(512));
    }
}
