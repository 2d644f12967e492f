//! Simulated network for the shell's `fetch` and `ping` commands.
//!
//! No sockets are opened. A table of known hosts answers with a fixed
//! latency and document body, so every run is reproducible.

use kernel_api::{Network, NetworkError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A host known to the simulated network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub latency_ms: u64,
    pub body: String,
}

impl HostEntry {
    pub fn new(latency_ms: u64, body: impl Into<String>) -> Self {
        Self {
            latency_ms,
            body: body.into(),
        }
    }
}

/// Deterministic in-memory network.
#[derive(Debug, Clone)]
pub struct SimulatedNetwork {
    hosts: HashMap<String, HostEntry>,
    online: bool,
    requests: u64,
}

impl SimulatedNetwork {
    /// Creates a network with no known hosts.
    pub fn empty() -> Self {
        Self {
            hosts: HashMap::new(),
            online: true,
            requests: 0,
        }
    }

    /// Creates a network with the default hosts.
    pub fn new() -> Self {
        Self::empty()
            .with_host("localhost", HostEntry::new(0, "ok"))
            .with_host(
                "example.com",
                HostEntry::new(
                    42,
                    "<html><head><title>Example Domain</title></head>\
                     <body><h1>Example Domain</h1></body></html>",
                ),
            )
    }

    /// Registers or replaces a host.
    pub fn with_host(mut self, host: impl Into<String>, entry: HostEntry) -> Self {
        self.hosts.insert(host.into(), entry);
        self
    }

    /// Takes the whole network up or down.
    pub fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    /// Number of requests served or refused so far.
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    fn lookup(&mut self, host: &str) -> Result<&HostEntry, NetworkError> {
        self.requests += 1;
        if !self.online {
            return Err(NetworkError::HostUnreachable(host.to_string()));
        }
        self.hosts
            .get(host)
            .ok_or_else(|| NetworkError::HostUnreachable(host.to_string()))
    }
}

impl Default for SimulatedNetwork {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts the host from `http(s)://host[:port]/path` or a bare host.
pub fn host_of(url: &str) -> Result<&str, NetworkError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(NetworkError::InvalidUrl(url.to_string()));
    }
    Ok(host)
}

impl Network for SimulatedNetwork {
    fn fetch(&mut self, url: &str) -> Result<String, NetworkError> {
        let host = host_of(url)?.to_string();
        let body = self.lookup(&host)?.body.clone();
        log::debug!("network: fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }

    fn ping(&mut self, host: &str) -> Result<u64, NetworkError> {
        let host = host_of(host)?.to_string();
        Ok(self.lookup(&host)?.latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://example.com/index.html").unwrap(), "example.com");
        assert_eq!(host_of("http://localhost:8080").unwrap(), "localhost");
        assert_eq!(host_of("example.com").unwrap(), "example.com");
        assert!(matches!(host_of("https://"), Err(NetworkError::InvalidUrl(_))));
    }

    #[test]
    fn test_fetch_known_host() {
        let mut net = SimulatedNetwork::new();
        let body = net.fetch("https://example.com/").unwrap();
        assert!(body.contains("Example Domain"));
        assert_eq!(net.request_count(), 1);
    }

    #[test]
    fn test_unknown_host_unreachable() {
        let mut net = SimulatedNetwork::new();
        assert_eq!(
            net.ping("nowhere.invalid"),
            Err(NetworkError::HostUnreachable("nowhere.invalid".to_string()))
        );
    }

    #[test]
    fn test_offline_network() {
        let mut net = SimulatedNetwork::new();
        assert_eq!(net.ping("example.com"), Ok(42));
        net.set_online(false);
        assert!(net.ping("example.com").is_err());
    }

    #[test]
    fn test_host_entry_serializes() {
        let entry = HostEntry::new(5, "hi");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"latency_ms":5,"body":"hi"}"#);
    }
}
