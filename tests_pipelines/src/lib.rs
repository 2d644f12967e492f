//! # Pipeline Integration Tests
//!
//! End-to-end tests for command lines run by the shell engine against a
//! booted kernel.
//!
//! ## Test Philosophy
//!
//! - **Happy path**: stages hand stdout to stdin, the last one prints
//! - **Fault isolation**: a failing stage reports and the line goes on
//! - **Accounting**: every reservation is returned, pids never repeat
//! - **Protection**: system processes and paths hold without `sudo`
//! - **Messaging**: mailboxes flush once, in arrival order

#![cfg(test)]

use cli_console::BufferTerminal;
use core_types::Pid;
use ipc::{MessageEnvelope, MessagePayload};
use kernel_api::{OutputStyle, Storage};
use resources::MemoryUnits;
use services_network::SimulatedNetwork;
use services_pipeline_executor::Shell;
use services_process_manager::{KillResult, ProcessSpec, ProcessStatus, ProcessTable};
use services_settings::{create_default_registry, KernelConfig};
use services_storage::MemoryStorage;
use sim_kernel::Kernel;
use std::cell::RefCell;
use std::rc::Rc;

type TestShell = Shell<MemoryStorage, BufferTerminal, SimulatedNetwork>;

// ============================================================================
// Fixtures
// ============================================================================

fn shell_with(config: KernelConfig) -> TestShell {
    let kernel = Kernel::boot(config).unwrap();
    Shell::new(
        kernel,
        MemoryStorage::with_default_layout("user"),
        BufferTerminal::new(),
        SimulatedNetwork::new(),
        create_default_registry(),
    )
    .with_default_packages()
}

fn shell() -> TestShell {
    shell_with(KernelConfig::default().with_seed(42))
}

fn errors(shell: &TestShell) -> Vec<String> {
    shell
        .terminal()
        .output(OutputStyle::Error)
        .into_iter()
        .map(String::from)
        .collect()
}

fn table() -> ProcessTable {
    ProcessTable::new(MemoryUnits::new(256), Some(3))
}

// ============================================================================
// Stage plumbing
// ============================================================================

#[test]
fn test_stdout_feeds_next_stage() {
    let mut shell = shell();
    let outcome = shell.execute("echo a | cat", false);
    assert_eq!(outcome.stdout, "a");
    assert!(outcome.is_success());
    assert_eq!(shell.terminal().output(OutputStyle::Normal), vec!["a"]);
}

#[test]
fn test_failing_stage_does_not_stop_the_line() {
    let mut shell = shell();
    let outcome = shell.execute("false_cmd | echo b", false);
    assert_eq!(outcome.stdout, "b");
    assert_eq!(outcome.stderr_lines, vec!["false_cmd: not found"]);
    assert_eq!(errors(&shell), vec!["false_cmd: not found"]);
}

#[test]
fn test_three_stage_module_pipeline() {
    let mut shell = shell();
    shell.execute("echo banana > /tmp/fruit", false);
    let outcome = shell.execute("cat /tmp/fruit | upper | wc -c", false);
    assert_eq!(outcome.stdout, "6");
}

#[test]
fn test_redirect_writes_file_instead_of_printing() {
    let mut shell = shell();
    let outcome = shell.execute("echo hello > /tmp/f", false);

    assert_eq!(outcome.redirected.as_deref(), Some("/tmp/f"));
    let node = shell.storage().read("/tmp/f").unwrap();
    assert_eq!(node.as_file(), Some("hello"));
    assert!(shell.terminal().output(OutputStyle::Normal).is_empty());
}

#[test]
fn test_stage_processes_record_the_whole_line() {
    let mut shell = shell();
    let outcome = shell.execute("sleep 5 | echo x", true);
    let job = outcome.job.unwrap();
    let process = shell.kernel().table().get(job).unwrap();
    assert_eq!(process.name, "echo");
    assert_eq!(process.command.as_deref(), Some("sleep 5 | echo x"));
    assert_eq!(process.stdout, vec!["x".to_string()]);
}

// ============================================================================
// Accounting
// ============================================================================

#[test]
fn test_memory_returns_to_baseline() {
    let mut shell = shell();
    let baseline = shell.kernel().table().memory().used();
    assert_eq!(baseline, MemoryUnits::new(160));

    for line in ["echo a | cat | upper", "ls /", "nope | nope", "ps", "memstat"] {
        shell.execute(line, false);
    }
    assert_eq!(shell.kernel().table().memory().used(), baseline);
    assert_eq!(shell.kernel().table().list().len(), 2);
}

#[test]
fn test_freed_memory_equals_reserved_memory() {
    let mut table = table();
    let sizes = [10, 25, 7];
    let pids: Vec<Pid> = sizes
        .iter()
        .map(|mb| table.create(ProcessSpec::user("w", MemoryUnits::new(*mb))).unwrap())
        .collect();
    assert_eq!(table.memory().used(), MemoryUnits::new(42));

    for (pid, mb) in pids.iter().zip(sizes) {
        let before = table.memory().used();
        assert!(table.kill(*pid).is_success());
        assert_eq!(before.saturating_sub(table.memory().used()), MemoryUnits::new(mb));
    }
    assert!(table.memory().used().is_zero());
}

#[test]
fn test_pids_strictly_increase_and_never_repeat() {
    let mut table = table();
    let a = table.create(ProcessSpec::user("a", MemoryUnits::new(1))).unwrap();
    let b = table.create(ProcessSpec::user("b", MemoryUnits::new(1))).unwrap();
    table.kill(b);
    let c = table.create(ProcessSpec::user("c", MemoryUnits::new(1))).unwrap();

    assert!(a < b);
    assert!(b < c);
}

#[test]
fn test_exhausted_pool_fails_the_stage() {
    let mut shell = shell_with(KernelConfig::default().with_seed(1).with_memory_total(168));
    assert!(shell.execute("sleep 10", true).job.is_some());

    let outcome = shell.execute("echo x", false);
    assert!(outcome.stdout.is_empty());
    assert_eq!(
        outcome.stderr_lines,
        vec!["Resource exhausted: cannot allocate 8 MB for 'echo'"]
    );
}

// ============================================================================
// Protection
// ============================================================================

#[test]
fn test_rm_root_needs_sudo() {
    let mut shell = shell();
    let outcome = shell.execute("rm /", false);
    assert_eq!(
        outcome.stderr_lines,
        vec!["Permission denied: / is protected (try sudo)"]
    );
    assert!(shell.storage().exists("/etc/motd"));

    let outcome = shell.execute("sudo rm /", false);
    assert!(outcome.is_success());
    assert_eq!(shell.storage().root_len(), 0);
}

#[test]
fn test_system_processes_survive_kill() {
    let mut shell = shell();
    let kernel_pid = shell.kernel().kernel_pid();

    for line in [format!("kill {}", kernel_pid), format!("sudo kill {}", kernel_pid)] {
        let outcome = shell.execute(&line, false);
        assert_eq!(
            outcome.stderr_lines,
            vec![format!(
                "Permission denied: Cannot kill system process {} (kernel)",
                kernel_pid
            )]
        );
    }
    assert!(shell.kernel().table().get(kernel_pid).is_some());

    let mut table = table();
    let pid = table
        .create(ProcessSpec::system("init", MemoryUnits::new(4)))
        .unwrap();
    assert!(matches!(table.kill(pid), KillResult::Protected { .. }));
}

// ============================================================================
// Scheduling
// ============================================================================

#[test]
fn test_suspended_process_reads_zero_cpu() {
    let mut table = table();
    let pid = table.create(ProcessSpec::user("busy", MemoryUnits::new(4))).unwrap();
    for _ in 0..3 {
        table.tick(1.0);
    }
    let cpu_time = table.get(pid).unwrap().cpu_time;

    assert!(table.suspend(pid));
    table.tick(1.0);
    let process = table.get(pid).unwrap();
    assert_eq!(process.status, ProcessStatus::Sleeping);
    assert_eq!(process.cpu, 0.0);

    for _ in 0..3 {
        table.tick(1.0);
    }
    assert_eq!(table.get(pid).unwrap().cpu_time, cpu_time);
}

#[test]
fn test_sleep_ticks_the_scheduler() {
    let mut shell = shell();
    shell.execute("sleep 3", false);
    assert_eq!(shell.kernel().now_ms(), 3000);

    let kernel = shell.kernel().table().get(shell.kernel().kernel_pid()).unwrap();
    assert!(kernel.cpu_time > 0.0);
}

// ============================================================================
// Messaging
// ============================================================================

#[test]
fn test_mailbox_flushes_once_in_order() {
    let mut table = table();
    let sender = table.create(ProcessSpec::user("tx", MemoryUnits::new(1))).unwrap();
    let receiver = table.create(ProcessSpec::user("rx", MemoryUnits::new(1))).unwrap();

    for text in ["one", "two", "three"] {
        table
            .post_message(sender, receiver, MessagePayload::text(text))
            .unwrap();
    }
    assert_eq!(table.mailbox(receiver).unwrap().len(), 3);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let flushed = table
        .on_message(
            receiver,
            Box::new(move |envelope: &MessageEnvelope| {
                let text = envelope.payload.as_text().unwrap_or_default().to_string();
                sink.borrow_mut().push(text);
            }),
        )
        .unwrap();
    assert_eq!(flushed, 3);
    assert!(table.mailbox(receiver).unwrap().is_empty());

    table
        .post_message(sender, receiver, MessagePayload::text("four"))
        .unwrap();
    assert!(table.mailbox(receiver).unwrap().is_empty());
    assert_eq!(*seen.borrow(), vec!["one", "two", "three", "four"]);
}

#[test]
fn test_msg_and_inbox_commands() {
    let mut shell = shell();
    let shell_pid = shell.kernel().shell_pid();

    let sent = shell.execute(&format!("msg {} hi there", shell_pid), false);
    assert!(sent.stdout.starts_with("sent msg:1 to"));

    let inbox = shell.execute("inbox", false);
    assert!(inbox.stdout.starts_with("msg:1 from "));
    assert!(inbox.stdout.ends_with(": hi there"));

    let again = shell.execute("inbox", false);
    assert_eq!(again.stdout, "(no messages)");
}

#[test]
fn test_worker_thread_computes_fib() {
    let mut shell = shell();
    let outcome = shell.execute("fib 20", false);
    assert_eq!(outcome.stdout, "fib(20) = 6765");
    assert_eq!(shell.kernel().table().thread_count(), 0);
}

// ============================================================================
// Sessions
// ============================================================================

#[test]
fn test_reboot_discards_jobs() {
    let mut shell = shell();
    let session = shell.kernel().session_id();
    shell.execute("sleep 100", true);
    assert_eq!(shell.kernel().table().list().len(), 3);

    shell.execute("reboot", false);
    assert_ne!(shell.kernel().session_id(), session);
    assert_eq!(shell.kernel().table().list().len(), 2);
    assert_eq!(shell.kernel().boot_count(), 2);
    assert_eq!(
        shell.kernel().table().memory().used(),
        MemoryUnits::new(160)
    );
}
