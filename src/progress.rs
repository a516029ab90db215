//! Progress event types for sync runs.
//!
//! Provides callback-based progress reporting that decouples the sync
//! engine from UI presentation (log panes, IPC streams). Events are
//! discrete `(message, level)` pairs emitted at bootstrap milestones,
//! batch boundaries and per-task outcomes.

use std::fmt;

/// Severity of a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Informational milestone (bootstrap step, batch boundary).
    Info,
    /// Degraded but non-fatal condition (unmatched task, skipped field).
    Warn,
    /// A recorded failure (per-field or per-task).
    Error,
    /// A task or run completed with every attempted update applied.
    Success,
}

impl LogLevel {
    /// Stable upper-case name for log-pane rendering.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One discrete progress event.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Severity of the event.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
}

impl ProgressEvent {
    /// Build an event with an explicit level.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Informational event.
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Warning event.
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Error event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Success event.
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }
}

/// Callback invoked for every progress event. Must be cheap and
/// non-blocking; the coordinator calls it inline between suspension
/// points.
pub type ProgressSink = Box<dyn Fn(ProgressEvent) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn level_names() {
        assert_eq!(LogLevel::Info.name(), "INFO");
        assert_eq!(LogLevel::Warn.name(), "WARN");
        assert_eq!(LogLevel::Error.name(), "ERROR");
        assert_eq!(LogLevel::Success.name(), "SUCCESS");
    }

    #[test]
    fn level_display_matches_name() {
        assert_eq!(LogLevel::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn constructors_set_level() {
        assert_eq!(ProgressEvent::info("a").level, LogLevel::Info);
        assert_eq!(ProgressEvent::warn("b").level, LogLevel::Warn);
        assert_eq!(ProgressEvent::error("c").level, LogLevel::Error);
        assert_eq!(ProgressEvent::success("d").level, LogLevel::Success);
    }

    #[test]
    fn sink_receives_events() {
        let seen: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: ProgressSink = Box::new(move |event| {
            sink_seen.lock().expect("lock").push(event);
        });

        sink(ProgressEvent::info("batch 1 of 2"));
        sink(ProgressEvent::success("run complete"));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].message, "batch 1 of 2");
        assert_eq!(seen[1].level, LogLevel::Success);
    }
}
