//! Worker threads owned by processes
//!
//! Each worker is a host thread running a body closure. Commands reach it
//! over its own channel; replies and errors come back over a channel shared
//! by all workers of a table and are dispatched to the owner's callbacks
//! only when the owner pumps them.

use core_types::{Pid, ThreadId};
use ipc::MessagePayload;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// What a worker body is invoked with
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadInput {
    /// Delivered once, right after spawn
    Start,
    Message(MessagePayload),
}

/// Owner to worker
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadCommand {
    Start,
    Message(MessagePayload),
    Terminate,
}

/// Worker to owner
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    Message {
        thread: ThreadId,
        payload: MessagePayload,
    },
    Error {
        thread: ThreadId,
        error: String,
    },
}

impl ThreadEvent {
    pub fn thread(&self) -> ThreadId {
        match self {
            ThreadEvent::Message { thread, .. } | ThreadEvent::Error { thread, .. } => *thread,
        }
    }
}

/// Worker body: returns an optional reply, or an error string
pub type ThreadBody =
    Box<dyn FnMut(ThreadInput) -> Result<Option<MessagePayload>, String> + Send + 'static>;

/// Boxes a closure as a [`ThreadBody`]
pub fn thread_body<F>(body: F) -> ThreadBody
where
    F: FnMut(ThreadInput) -> Result<Option<MessagePayload>, String> + Send + 'static,
{
    Box::new(body)
}

/// Owner-side reply callback
pub type ThreadMessageHandler = Box<dyn FnMut(ThreadId, MessagePayload)>;

/// Owner-side error callback
pub type ThreadErrorHandler = Box<dyn FnMut(ThreadId, String)>;

/// Renders a caught panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

struct Worker {
    owner: Pid,
    commands: Sender<ThreadCommand>,
    on_message: ThreadMessageHandler,
    on_error: ThreadErrorHandler,
}

/// All live workers of one process table
pub(crate) struct WorkerPool {
    workers: HashMap<ThreadId, Worker>,
    events_tx: Sender<ThreadEvent>,
    events_rx: Receiver<ThreadEvent>,
    next_id: u32,
}

impl WorkerPool {
    pub(crate) fn new() -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            workers: HashMap::new(),
            events_tx,
            events_rx,
            next_id: 1,
        }
    }

    /// Starts a worker thread and sends it [`ThreadCommand::Start`]
    pub(crate) fn spawn(
        &mut self,
        owner: Pid,
        body: ThreadBody,
        on_message: ThreadMessageHandler,
        on_error: ThreadErrorHandler,
    ) -> std::io::Result<ThreadId> {
        let id = ThreadId::from_raw(self.next_id);
        let (commands, inbox) = mpsc::channel();
        let events = self.events_tx.clone();

        thread::Builder::new()
            .name(format!("simos-{}-{}", owner, id))
            .spawn(move || worker_loop(id, body, inbox, events))?;
        self.next_id += 1;

        // The receiver is alive until the loop sees Start, so this cannot fail.
        let _ = commands.send(ThreadCommand::Start);
        self.workers.insert(
            id,
            Worker {
                owner,
                commands,
                on_message,
                on_error,
            },
        );
        Ok(id)
    }

    pub(crate) fn owner(&self, id: ThreadId) -> Option<Pid> {
        self.workers.get(&id).map(|worker| worker.owner)
    }

    /// Queues a message for a worker; false if it is gone
    pub(crate) fn post(&self, id: ThreadId, payload: MessagePayload) -> bool {
        self.workers
            .get(&id)
            .map(|worker| worker.commands.send(ThreadCommand::Message(payload)).is_ok())
            .unwrap_or(false)
    }

    /// Stops a worker and forgets its callbacks
    pub(crate) fn terminate(&mut self, id: ThreadId) -> bool {
        match self.workers.remove(&id) {
            Some(worker) => {
                // A worker that already exited has dropped its receiver.
                let _ = worker.commands.send(ThreadCommand::Terminate);
                true
            }
            None => false,
        }
    }

    pub(crate) fn terminate_all(&mut self) {
        let ids: Vec<ThreadId> = self.workers.keys().copied().collect();
        for id in ids {
            self.terminate(id);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Dispatches every pending event; returns how many reached a callback
    pub(crate) fn pump(&mut self) -> usize {
        let mut dispatched = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.dispatch(event) {
                dispatched += 1;
            }
        }
        dispatched
    }

    /// Blocks up to `timeout` for the first event, then pumps the rest
    pub(crate) fn wait(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => usize::from(self.dispatch(event)) + self.pump(),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn dispatch(&mut self, event: ThreadEvent) -> bool {
        let Some(worker) = self.workers.get_mut(&event.thread()) else {
            log::debug!("dropping event from terminated {}", event.thread());
            return false;
        };
        match event {
            ThreadEvent::Message { thread, payload } => (worker.on_message)(thread, payload),
            ThreadEvent::Error { thread, error } => {
                log::warn!("{} of pid {} failed: {}", thread, worker.owner, error);
                (worker.on_error)(thread, error)
            }
        }
        true
    }
}

fn worker_loop(
    id: ThreadId,
    mut body: ThreadBody,
    inbox: Receiver<ThreadCommand>,
    events: Sender<ThreadEvent>,
) {
    for command in inbox {
        let input = match command {
            ThreadCommand::Start => ThreadInput::Start,
            ThreadCommand::Message(payload) => ThreadInput::Message(payload),
            ThreadCommand::Terminate => break,
        };

        let event = match panic::catch_unwind(AssertUnwindSafe(|| body(input))) {
            Ok(Ok(Some(payload))) => ThreadEvent::Message {
                thread: id,
                payload,
            },
            Ok(Ok(None)) => continue,
            Ok(Err(error)) => ThreadEvent::Error { thread: id, error },
            Err(panic) => {
                let _ = events.send(ThreadEvent::Error {
                    thread: id,
                    error: format!("panicked: {}", panic_message(panic.as_ref())),
                });
                break;
            }
        };

        if events.send(event).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const WAIT: Duration = Duration::from_secs(5);

    fn collector() -> (Rc<RefCell<Vec<String>>>, ThreadMessageHandler, ThreadErrorHandler) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let on_message = {
            let seen = Rc::clone(&seen);
            Box::new(move |_: ThreadId, payload: MessagePayload| {
                seen.borrow_mut().push(payload.to_string())
            }) as ThreadMessageHandler
        };
        let on_error = {
            let seen = Rc::clone(&seen);
            Box::new(move |_: ThreadId, error: String| {
                seen.borrow_mut().push(format!("error: {}", error))
            }) as ThreadErrorHandler
        };
        (seen, on_message, on_error)
    }

    #[test]
    fn test_worker_replies_to_start_and_messages() {
        let mut pool = WorkerPool::new();
        let (seen, on_message, on_error) = collector();
        let body = thread_body(|input| match input {
            ThreadInput::Start => Ok(Some(MessagePayload::text("ready"))),
            ThreadInput::Message(payload) => Ok(Some(MessagePayload::text(format!(
                "echo {}",
                payload
            )))),
        });

        let id = pool.spawn(Pid::FIRST, body, on_message, on_error).unwrap();
        assert_eq!(pool.owner(id), Some(Pid::FIRST));
        assert!(pool.post(id, MessagePayload::text("hi")));

        let mut received = 0;
        while received < 2 {
            let got = pool.wait(WAIT);
            assert!(got > 0, "worker did not reply");
            received += got;
        }
        assert_eq!(*seen.borrow(), vec!["ready".to_string(), "echo hi".to_string()]);
    }

    #[test]
    fn test_panicking_body_reports_error() {
        let mut pool = WorkerPool::new();
        let (seen, on_message, on_error) = collector();
        let body = thread_body(|_| panic!("worker exploded"));

        pool.spawn(Pid::FIRST, body, on_message, on_error).unwrap();
        assert_eq!(pool.wait(WAIT), 1);
        assert_eq!(*seen.borrow(), vec!["error: panicked: worker exploded".to_string()]);
    }

    #[test]
    fn test_terminated_worker_is_forgotten() {
        let mut pool = WorkerPool::new();
        let (_seen, on_message, on_error) = collector();
        let body = thread_body(|_| Ok(None));

        let id = pool.spawn(Pid::FIRST, body, on_message, on_error).unwrap();
        assert_eq!(pool.len(), 1);
        assert!(pool.terminate(id));
        assert!(!pool.terminate(id));
        assert!(!pool.post(id, MessagePayload::text("late")));
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_panic_message_variants() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(5u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
