// Event domain models - the two things the core ever tells the outside world:
// a status line for the activity log, and a named counter increment.

use chrono::{DateTime, Utc};
use std::fmt;

/// Severity/category tag shown in front of every activity log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// A moderation action or detection
    Output,
    /// A denylist edit
    Region,
    /// A toggle change
    Config,
    /// The gateway answered without data we need
    Degraded,
    /// Something went wrong
    Failure,
}

impl LogKind {
    pub fn tag(&self) -> &'static str {
        match self {
            LogKind::Output => "OUTPUT",
            LogKind::Region => "REGION",
            LogKind::Config => "CONFIG",
            LogKind::Degraded => "FAILED",
            LogKind::Failure => "FAILURE",
        }
    }
}

/// One line in the activity log.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub kind: LogKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl LogLine {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::new(LogKind::Output, message)
    }

    pub fn region(message: impl Into<String>) -> Self {
        Self::new(LogKind::Region, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(LogKind::Config, message)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(LogKind::Degraded, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(LogKind::Failure, message)
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.tag(), self.message)
    }
}

/// Display counters on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    Blocked,
    Deleted,
}

impl Counter {
    pub const ALL: [Counter; 2] = [Counter::Blocked, Counter::Deleted];

    pub fn name(&self) -> &'static str {
        match self {
            Counter::Blocked => "Blocked",
            Counter::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_renders_tag_prefix() {
        let line = LogLine::output("Blocked User (UID: 7)");
        assert_eq!(line.to_string(), "[OUTPUT] Blocked User (UID: 7)");

        let line = LogLine::degraded("no phone country");
        assert_eq!(line.to_string(), "[FAILED] no phone country");
    }

    #[test]
    fn test_counter_names() {
        assert_eq!(Counter::Blocked.to_string(), "Blocked");
        assert_eq!(Counter::Deleted.name(), "Deleted");
    }
}
