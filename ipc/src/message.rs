//! Message types and envelope structure

use core_types::{MessageId, Pid};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A routed message between two processes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Sequence number assigned by the process table
    pub id: MessageId,
    /// Sending process
    pub from: Pid,
    /// Receiving process
    pub to: Pid,
    /// Message body
    pub payload: MessagePayload,
}

impl MessageEnvelope {
    /// Creates a new message envelope
    pub fn new(id: MessageId, from: Pid, to: Pid, payload: MessagePayload) -> Self {
        Self {
            id,
            from,
            to,
            payload,
        }
    }
}

impl fmt::Display for MessageEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}: {}", self.id, self.from, self.to, self.payload)
    }
}

/// Type-erased message payload
///
/// Payloads are JSON values: cheap to clone, `Send`, and able to carry any
/// serializable type across the process/thread boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    data: serde_json::Value,
}

impl MessagePayload {
    /// Creates a new payload from serializable data
    pub fn new<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        let data = serde_json::to_value(data)?;
        Ok(Self { data })
    }

    /// Creates a plain text payload
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: serde_json::Value::String(text.into()),
        }
    }

    /// Deserializes the payload into a specific type
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    /// Returns the payload as text if it is a JSON string
    pub fn as_text(&self) -> Option<&str> {
        self.data.as_str()
    }

    /// Returns the raw JSON value
    pub fn as_value(&self) -> &serde_json::Value {
        &self.data
    }
}

impl From<serde_json::Value> for MessagePayload {
    fn from(data: serde_json::Value) -> Self {
        Self { data }
    }
}

impl fmt::Display for MessagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data.as_str() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "{}", self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Job {
        n: u64,
        label: String,
    }

    #[test]
    fn test_typed_payload() {
        let job = Job {
            n: 10,
            label: "fib".to_string(),
        };
        let payload = MessagePayload::new(&job).unwrap();
        let back: Job = payload.deserialize().unwrap();
        assert_eq!(back, job);
        assert!(payload.as_text().is_none());
    }

    #[test]
    fn test_text_payload_display() {
        let payload = MessagePayload::text("hello");
        assert_eq!(payload.as_text(), Some("hello"));
        assert_eq!(payload.to_string(), "hello");
        assert_eq!(MessagePayload::from(serde_json::json!(42)).to_string(), "42");
    }

    #[test]
    fn test_deserialize_wrong_type_fails() {
        let payload = MessagePayload::text("not a number");
        assert!(payload.deserialize::<u64>().is_err());
    }

    #[test]
    fn test_envelope_display() {
        let envelope = MessageEnvelope::new(
            MessageId::from_raw(1),
            Pid::from_raw(2),
            Pid::from_raw(3),
            MessagePayload::text("ping"),
        );
        assert_eq!(envelope.to_string(), "msg:1 2 -> 3: ping");
    }
}
