//! # Logger Service
//!
//! This crate implements structured kernel logging.
//!
//! ## Philosophy
//!
//! Logging is explicit and structured, not text-based or printf-style.
//! Every crate logs through the `log` facade; this crate installs the
//! backend that keeps a bounded ring of recent entries (read back by the
//! `dmesg` built-in) and optionally echoes them to host stderr.
//!
//! Host stdout is reserved for the terminal, so the logger never writes there.

use core_types::Pid;
use log::{LevelFilter, Metadata, Record};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Default number of entries retained by the ring
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace | log::Level::Debug => LogLevel::Debug,
            log::Level::Info => LogLevel::Info,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Error => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// A structured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Module path or subsystem that emitted the entry
    pub target: String,
    /// Source process (if known)
    pub source: Option<Pid>,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            target: String::new(),
            source: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Sets the emitting subsystem
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Sets the source process
    pub fn with_source(mut self, source: Pid) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds a field to the log entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:<5}]", self.level)?;
        if !self.target.is_empty() {
            write!(f, " {}:", self.target)?;
        }
        if let Some(pid) = self.source {
            write!(f, " pid={}", pid)?;
        }
        write!(f, " {}", self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Bounded ring of recent log entries
#[derive(Debug, Clone)]
pub struct LogRing {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogRing {
    /// Creates a ring that retains at most `capacity` entries
    pub const fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Appends an entry, evicting the oldest when full
    pub fn push(&mut self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Returns the last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for LogRing {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

/// `log` backend that records into a ring buffer
pub struct KernelLogger {
    ring: Mutex<LogRing>,
    echo: AtomicBool,
    dropped: AtomicUsize,
}

impl KernelLogger {
    /// Creates a logger with the given ring capacity
    pub const fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(LogRing::new(capacity)),
            echo: AtomicBool::new(false),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Enables or disables echoing entries to host stderr
    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::Relaxed);
    }

    /// Records a structured entry directly
    pub fn record(&self, entry: LogEntry) {
        if self.echo.load(Ordering::Relaxed) {
            eprintln!("{}", entry);
        }
        match self.ring.lock() {
            Ok(mut ring) => ring.push(entry),
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Returns the last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        self.ring
            .lock()
            .map(|ring| ring.recent(count))
            .unwrap_or_default()
    }

    /// Discards all retained entries
    pub fn clear(&self) {
        if let Ok(mut ring) = self.ring.lock() {
            ring.clear();
        }
    }

    /// Number of entries lost to a poisoned ring
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let entry = LogEntry::new(record.level().into(), record.args().to_string())
            .with_target(record.target());
        self.record(entry);
    }

    fn flush(&self) {}
}

/// Global logger instance
static LOGGER: KernelLogger = KernelLogger::new(DEFAULT_RING_CAPACITY);

/// Installs the kernel logger as the `log` backend
///
/// Calling this more than once keeps the first installation and only
/// updates the level and echo flag.
pub fn init(max_level: LevelFilter, echo: bool) {
    LOGGER.set_echo(echo);
    // Already installed (tests, reboot): keep the existing backend.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(max_level);
}

/// Returns the global kernel logger
pub fn logger() -> &'static KernelLogger {
    &LOGGER
}

/// Returns the last `count` entries recorded by the global logger
pub fn recent(count: usize) -> Vec<LogEntry> {
    LOGGER.recent(count)
}

/// Parses a level name as accepted on the command line
pub fn parse_level_filter(name: &str) -> Option<LevelFilter> {
    match name.to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_entry_creation() {
        let entry = LogEntry::new(LogLevel::Info, "test message");
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.message, "test message");
        assert!(entry.source.is_none());
        assert!(entry.fields.is_empty());
    }

    #[test]
    fn test_log_entry_display() {
        let entry = LogEntry::new(LogLevel::Warn, "memory low")
            .with_target("resources")
            .with_source(Pid::from_raw(3))
            .with_field("available", "4 MB");
        assert_eq!(
            entry.to_string(),
            "[WARN ] resources: pid=3 memory low available=4 MB"
        );
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut ring = LogRing::new(2);
        ring.push(LogEntry::new(LogLevel::Info, "one"));
        ring.push(LogEntry::new(LogLevel::Info, "two"));
        ring.push(LogEntry::new(LogLevel::Info, "three"));

        let recent = ring.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "two");
        assert_eq!(recent[1].message, "three");
        assert_eq!(ring.recent(1)[0].message, "three");
    }

    #[test]
    fn test_zero_capacity_ring_keeps_nothing() {
        let mut ring = LogRing::new(0);
        ring.push(LogEntry::new(LogLevel::Info, "x"));
        assert!(ring.is_empty());
    }

    #[test]
    fn test_kernel_logger_records_entries() {
        let logger = KernelLogger::new(8);
        logger.record(LogEntry::new(LogLevel::Error, "boom").with_target("test"));
        let recent = logger.recent(5);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].target, "test");

        logger.clear();
        assert!(logger.recent(5).is_empty());
    }

    #[test]
    fn test_parse_level_filter() {
        assert_eq!(parse_level_filter("INFO"), Some(LevelFilter::Info));
        assert_eq!(parse_level_filter("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level_filter("loud"), None);
    }
}
