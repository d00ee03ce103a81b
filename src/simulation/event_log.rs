//! Bounded, severity-tagged record of simulation outcomes.
//!
//! Entries are kept in a ring buffer: once capacity is reached the oldest
//! entry is evicted. Readers see the most recent entry first.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of retained entries.
pub const EVENT_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    /// Device name, or `System` for topology-wide events.
    pub label: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn push(&mut self, label: &str, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        log::debug!("[{}] {:?}: {}", label, severity, message);
        if self.entries.len() >= self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(LogEntry {
            timestamp: Local::now(),
            label: label.to_string(),
            severity,
            message,
        });
    }

    /// Entries, most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
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
