//! Structured JSON event logger
//!
//! One log line = one event, written synchronously:
//! - `event` and `severity` lead every line, then `ts`, then the fields
//!   sorted alphabetically so output is deterministic
//! - Errors go to stderr, everything else to stdout
//! - Nothing in this engine is user-facing; these lines exist for the
//!   operator reading the reconciler's output

use std::fmt;
use std::io::{self, Write};

use chrono::{SecondsFormat, Utc};

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-operation detail (every directory round trip)
    Trace = 0,
    /// Normal reconciliation progress
    Info = 1,
    /// Recoverable conditions (tolerated mutation races)
    Warn = 2,
    /// Failed mutations and aborted ticks
    Error = 3,
}

impl Severity {
    /// String form used in the log line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Synchronous structured logger
pub struct Logger;

impl Logger {
    /// Emit one event line with the given fields.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
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
        let mut line = String::with_capacity(256);
        line.push_str("{\"event\":");
        push_json_text(&mut line, event);
        line.push_str(",\"severity\":\"");
        line.push_str(severity.as_str());
        line.push_str("\",\"ts\":\"");
        line.push_str(&Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        line.push('"');

        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);
        for (key, value) in sorted {
            line.push(',');
            push_json_text(&mut line, key);
            line.push(':');
            push_json_text(&mut line, value);
        }

        line.push_str("}\n");
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Log at TRACE level.
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level.
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level.
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level.
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

/// Append a JSON-quoted, escaped string.
fn push_json_text(out: &mut String, text: &str) {
    // serde_json performs the escaping; the surrounding line stays
    // hand-assembled to preserve key order.
    out.push_str(&serde_json::Value::from(text).to_string());
}

#[cfg(test)]
fn capture(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
    }

    #[test]
    fn test_line_is_valid_json() {
        let line = capture(Severity::Info, "SLOT_CREATED", &[("slot", "_ha_standby_1")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "SLOT_CREATED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["slot"], "_ha_standby_1");
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn test_fields_are_sorted_for_determinism() {
        let a = capture(Severity::Info, "E", &[("zebra", "1"), ("apple", "2")]);
        let b = capture(Severity::Info, "E", &[("apple", "2"), ("zebra", "1")]);

        // Timestamps differ; key order must not.
        let keys_sorted = |line: &str| {
            let apple = line.find("apple").unwrap();
            let zebra = line.find("zebra").unwrap();
            apple < zebra
        };
        assert!(keys_sorted(&a));
        assert!(keys_sorted(&b));
    }

    #[test]
    fn test_escapes_special_characters() {
        let line = capture(Severity::Warn, "E", &[("msg", "quote \" and\nnewline")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["msg"], "quote \" and\nnewline");
    }

    #[test]
    fn test_one_event_one_line() {
        let line = capture(Severity::Info, "E", &[("a", "1"), ("b", "2")]);
        assert_eq!(line.chars().filter(|c| *c == '\n').count(), 1);
        assert!(line.ends_with('\n'));
    }
}
