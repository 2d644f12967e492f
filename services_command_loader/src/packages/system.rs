//! Packages that exercise the process table: workers and IPC

use super::split_flags;
use crate::{CommandContext, CommandModule};
use core_types::{Pid, ThreadId};
use ipc::{MessageEnvelope, MessagePayload};
use kernel_api::ShellError;
use services_process_manager::{thread_body, ThreadInput};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Largest index whose Fibonacci number fits in a `u128`
pub const FIB_MAX: u32 = 186;

const WORKER_POLL: Duration = Duration::from_millis(100);
const WORKER_TIMEOUT: Duration = Duration::from_secs(5);

fn fibonacci(n: u32) -> u128 {
    let (mut a, mut b) = (0u128, 1u128);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}

fn parse_pid(raw: &str) -> Result<Pid, ShellError> {
    raw.parse()
        .map_err(|_| ShellError::InvalidInput(format!("invalid pid '{}'", raw)))
}

/// Computes a Fibonacci number on a worker thread
pub struct Fib;

impl CommandModule for Fib {
    fn name(&self) -> &'static str {
        "fib"
    }

    fn description(&self) -> &'static str {
        "compute a Fibonacci number on a worker thread"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let raw = args
            .first()
            .ok_or_else(|| ShellError::InvalidInput("usage: fib <n>".to_string()))?;
        let n: u32 = raw
            .parse()
            .ok()
            .filter(|n| *n <= FIB_MAX)
            .ok_or_else(|| {
                ShellError::InvalidInput(format!("fib: n must be between 0 and {}", FIB_MAX))
            })?;

        let outcome: Rc<RefCell<Option<Result<String, String>>>> = Rc::new(RefCell::new(None));
        let replies = Rc::clone(&outcome);
        let failures = Rc::clone(&outcome);

        let thread = ctx
            .spawn_thread(
                thread_body(move |input| match input {
                    ThreadInput::Start => Ok(Some(MessagePayload::text(fibonacci(n).to_string()))),
                    ThreadInput::Message(_) => Ok(None),
                }),
                Box::new(move |_: ThreadId, payload: MessagePayload| {
                    let value = payload.as_text().unwrap_or_default().to_string();
                    *replies.borrow_mut() = Some(Ok(value));
                }),
                Box::new(move |_: ThreadId, error: String| {
                    *failures.borrow_mut() = Some(Err(error));
                }),
            )
            .ok_or_else(|| ShellError::ExecutionError("fib: cannot start worker".to_string()))?;

        let deadline = Instant::now() + WORKER_TIMEOUT;
        while outcome.borrow().is_none() && Instant::now() < deadline {
            ctx.wait_thread_events(WORKER_POLL);
        }
        ctx.terminate_thread(thread);

        let result = outcome.borrow_mut().take();
        match result {
            Some(Ok(value)) => Ok(Some(format!("fib({}) = {}", n, value))),
            Some(Err(error)) => Err(ShellError::ExecutionError(format!("fib: {}", error))),
            None => Err(ShellError::ExecutionError(
                "fib: worker did not answer".to_string(),
            )),
        }
    }
}

/// Posts a text message to a process
pub struct Msg;

impl CommandModule for Msg {
    fn name(&self) -> &'static str {
        "msg"
    }

    fn description(&self) -> &'static str {
        "send a message to a process"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let (target, words) = args
            .split_first()
            .filter(|(_, words)| !words.is_empty())
            .ok_or_else(|| ShellError::InvalidInput("usage: msg <pid> <text>".to_string()))?;
        let to = parse_pid(target)?;
        let id = ctx.post_message(to, MessagePayload::text(words.join(" ")))?;
        Ok(Some(format!("sent {} to {}", id, to)))
    }
}

/// Lists (and by default drains) a process mailbox
pub struct Inbox;

fn render_message(envelope: &MessageEnvelope) -> String {
    let body = match envelope.payload.as_text() {
        Some(text) => text.to_string(),
        None => envelope.payload.as_value().to_string(),
    };
    format!("{} from {}: {}", envelope.id, envelope.from, body)
}

impl CommandModule for Inbox {
    fn name(&self) -> &'static str {
        "inbox"
    }

    fn description(&self) -> &'static str {
        "read queued messages"
    }

    fn execute(
        &self,
        args: &[String],
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<String>, ShellError> {
        let (flags, operands) = split_flags(args);
        let mut peek = false;
        for flag in flags {
            match flag {
                "--peek" | "-p" => peek = true,
                other => {
                    return Err(ShellError::InvalidInput(format!(
                        "inbox: unknown option '{}'",
                        other
                    )))
                }
            }
        }
        let pid = match operands.first() {
            Some(raw) => parse_pid(raw)?,
            None => ctx.shell_pid(),
        };

        let lines: Vec<String> = if peek {
            ctx.mailbox(pid)
                .ok_or_else(|| ShellError::NotFound(format!("process {}", pid)))?
                .iter()
                .map(render_message)
                .collect()
        } else {
            ctx.take_mailbox(pid)?.iter().map(render_message).collect()
        };

        if lines.is_empty() {
            return Ok(Some("(no messages)".to_string()));
        }
        Ok(Some(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::testing::Harness;

    #[test]
    fn test_fibonacci_values() {
        assert_eq!(fibonacci(0), 0);
        assert_eq!(fibonacci(1), 1);
        assert_eq!(fibonacci(10), 55);
        assert!(fibonacci(FIB_MAX) > fibonacci(FIB_MAX - 1));
    }

    #[test]
    fn test_fib_runs_on_worker() {
        let mut h = Harness::new();
        let out = h.run(&Fib, &["20"], &[]).unwrap();
        assert_eq!(out, Some("fib(20) = 6765".to_string()));
        // The worker is terminated before the command returns.
        assert_eq!(h.kernel.table().thread_count(), 0);
    }

    #[test]
    fn test_fib_rejects_bad_input() {
        let mut h = Harness::new();
        assert!(matches!(h.run(&Fib, &[], &[]), Err(ShellError::InvalidInput(_))));
        assert!(matches!(
            h.run(&Fib, &["187"], &[]),
            Err(ShellError::InvalidInput(_))
        ));
        assert!(matches!(
            h.run(&Fib, &["x"], &[]),
            Err(ShellError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_msg_then_inbox() {
        let mut h = Harness::new();
        let shell = h.kernel.shell_pid().to_string();

        let sent = h.run(&Msg, &[&shell, "hello", "there"], &[]).unwrap().unwrap();
        assert!(sent.starts_with("sent msg:"));
        assert!(sent.ends_with(&format!("to {}", shell)));

        let peeked = h.run(&Inbox, &["--peek"], &[]).unwrap().unwrap();
        assert!(peeked.ends_with("hello there"));

        let drained = h.run(&Inbox, &[], &[]).unwrap().unwrap();
        assert_eq!(drained, peeked);
        assert_eq!(
            h.run(&Inbox, &[], &[]).unwrap(),
            Some("(no messages)".to_string())
        );
    }

    #[test]
    fn test_inbox_leaves_listener_in_place() {
        let mut h = Harness::new();
        let shell = h.kernel.shell_pid();
        let heard = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&heard);
        h.kernel
            .table_mut()
            .on_message(
                shell,
                Box::new(move |envelope: &MessageEnvelope| {
                    sink.borrow_mut().push(render_message(envelope));
                }),
            )
            .unwrap();

        assert_eq!(
            h.run(&Inbox, &[], &[]).unwrap(),
            Some("(no messages)".to_string())
        );
        h.run(&Msg, &[&shell.to_string(), "still", "listening"], &[])
            .unwrap();
        assert_eq!(heard.borrow().len(), 1);
        assert!(heard.borrow()[0].ends_with("still listening"));
    }

    #[test]
    fn test_msg_to_unknown_pid() {
        let mut h = Harness::new();
        assert!(matches!(
            h.run(&Msg, &["999", "hi"], &[]),
            Err(ShellError::NotFound(_))
        ));
        assert!(matches!(
            h.run(&Msg, &["1"], &[]),
            Err(ShellError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_inbox_unknown_pid() {
        let mut h = Harness::new();
        assert!(matches!(
            h.run(&Inbox, &["999"], &[]),
            Err(ShellError::NotFound(_))
        ));
        assert!(matches!(
            h.run(&Inbox, &["--peek", "999"], &[]),
            Err(ShellError::NotFound(_))
        ));
    }
}
