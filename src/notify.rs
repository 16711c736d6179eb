//! Transient user-facing feedback.
//!
//! Both realms report outcomes through a [`NotificationSink`]: a non-blocking,
//! fire-and-forget surface tagged with a severity. The sink never fails and
//! never blocks automation; rendering (an on-page toast, a status line) belongs
//! to the host embedding the engine.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Notification severity, mirrored in how the host styles the message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

/// A transient, non-blocking feedback surface usable from either realm.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);

    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }

    fn warning(&self, message: &str) {
        self.notify(Severity::Warning, message);
    }

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }
}

// ── Implementations ─────────────────────────────────────────────────────────

/// Sink that forwards notifications to the `tracing` subscriber.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!(target: "pagebridge::notify", "{message}"),
            Severity::Warning => tracing::warn!(target: "pagebridge::notify", "{message}"),
            Severity::Success | Severity::Info => {
                tracing::info!(target: "pagebridge::notify", severity = %severity, "{message}")
            }
        }
    }
}

/// Composite sink that fans a notification out to multiple backends.
pub struct CompositeSink {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl CompositeSink {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn add(&mut self, sink: Arc<dyn NotificationSink>) {
        self.sinks.push(sink);
    }
}

impl NotificationSink for CompositeSink {
    fn notify(&self, severity: Severity, message: &str) {
        for sink in &self.sinks {
            sink.notify(severity, message);
        }
    }
}

/// Sink that buffers notifications in memory.
///
/// A polling UI drains this to render toasts; tests read it to assert on
/// reported outcomes.
#[derive(Debug, Default)]
pub struct BufferSink {
    records: Mutex<Vec<(Severity, String)>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn records(&self) -> Vec<(Severity, String)> {
        self.records.lock().unwrap().clone()
    }

    /// Drain and return all buffered notifications.
    pub fn drain(&self) -> Vec<(Severity, String)> {
        std::mem::take(&mut *self.records.lock().unwrap())
    }

    /// Number of records with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl NotificationSink for BufferSink {
    fn notify(&self, severity: Severity, message: &str) {
        self.records
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}
