//! Structured JSON logger for plinthdb
//!
//! - One log line = one event
//! - `event` first, `severity` second, then fields sorted by key
//! - Synchronous, no buffering
//! - Lines below the process-wide threshold are dropped before formatting

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-candidate planner detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Rejected requests
    Warn = 2,
    /// Operation failures
    Error = 3,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }

    fn from_u8(level: u8) -> Self {
        match level {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Set the lowest severity that is written
    pub fn set_threshold(severity: Severity) {
        THRESHOLD.store(severity as u8, Ordering::Relaxed);
    }

    /// Current lowest severity that is written
    pub fn threshold() -> Severity {
        Severity::from_u8(THRESHOLD.load(Ordering::Relaxed))
    }

    /// Returns true if a line at `severity` would be written
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::threshold()
    }

    /// Log an event with the given severity and fields.
    ///
    /// Errors go to stderr, everything else to stdout.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        if severity >= Severity::Error {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = Self::render(severity, event, fields);
        // Logging must never fail the caller
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Format one JSON line, newline included
    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        output.push_str(&json_string(event));
        output.push_str(",\"severity\":");
        output.push_str(&json_string(severity.as_str()));
        for (key, value) in sorted {
            output.push(',');
            output.push_str(&json_string(key));
            output.push(':');
            output.push_str(&json_string(value));
        }
        output.push_str("}\n");
        output
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

fn json_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Capture a log line for testing, ignoring the threshold
#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}
