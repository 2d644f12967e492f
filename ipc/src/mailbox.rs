//! FIFO mailbox for messages awaiting a listener.

use crate::MessageEnvelope;
use std::collections::VecDeque;

/// Pending messages of one process, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    messages: VecDeque<MessageEnvelope>,
}

impl Mailbox {
    /// Creates an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of queued messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns whether the mailbox is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends a message.
    pub fn push(&mut self, message: MessageEnvelope) {
        self.messages.push_back(message);
    }

    /// Pops the oldest message.
    pub fn pop(&mut self) -> Option<MessageEnvelope> {
        self.messages.pop_front()
    }

    /// Removes and returns every queued message, oldest first.
    pub fn drain(&mut self) -> Vec<MessageEnvelope> {
        self.messages.drain(..).collect()
    }

    /// Iterates queued messages without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &MessageEnvelope> {
        self.messages.iter()
    }
}
