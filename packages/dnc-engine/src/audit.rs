//! Operational run log: what happened, when, at what severity.
//!
//! This is part of the engine's data model, not a tracing backend. The
//! controller appends an entry for every notable action (run started, item
//! checked, skip, cancel, completion summary) and the display surfaces read
//! it back. Bounded at 1000 entries; the oldest entry is dropped first.
//!
//! Reads come back newest-first for display. Export uses
//! [`RunLog::chronological`] to preserve original order. Clearing the log is
//! independent of clearing results.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// Maximum number of log entries to retain.
const MAX_LOG_ENTRIES: usize = 1000;

/// How loudly an entry should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timestamped log line.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
}

impl LogEntry {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            at: Utc::now(),
            message: message.into(),
            severity,
        }
    }
}

/// Bounded, thread-safe run log.
#[derive(Debug, Default)]
pub struct RunLog {
    entries: Mutex<VecDeque<LogEntry>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES)),
        }
    }

    /// Acquire the entries lock, recovering from poison if necessary.
    /// A panicked writer leaves at worst one garbled line; availability wins.
    fn lock_entries(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry, evicting the oldest once the buffer is full.
    pub fn record(&self, entry: LogEntry) {
        let mut entries = self.lock_entries();
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogEntry::new(message, Severity::Info));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.record(LogEntry::new(message, Severity::Success));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.record(LogEntry::new(message, Severity::Warning));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogEntry::new(message, Severity::Error));
    }

    /// The most recent N entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.lock_entries();
        entries.iter().rev().take(n).cloned().collect()
    }

    /// Every retained entry in original order, for export.
    pub fn chronological(&self) -> Vec<LogEntry> {
        self.lock_entries().iter().cloned().collect()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }
}
