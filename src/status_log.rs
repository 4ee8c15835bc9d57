//! Session-scoped status log
//!
//! Append-only list of [`StatusEvent`]s, mirrored onto the event broadcast so
//! presentation layers can either render a snapshot or follow live.
//! Nothing here is persisted.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::types::{Event, Severity, StatusEvent};

/// Append-only status log shared by the orchestrator and poll loop
#[derive(Clone, Debug)]
pub struct StatusLog {
    entries: Arc<Mutex<Vec<StatusEvent>>>,
    event_tx: broadcast::Sender<Event>,
}

impl StatusLog {
    /// Create an empty log that also publishes to `event_tx`
    pub fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            event_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StatusEvent>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an event and broadcast it
    pub fn push(&self, event: StatusEvent) {
        match event.severity {
            Severity::Error => tracing::warn!(status = %event.message, "status event"),
            _ => tracing::info!(status = %event.message, "status event"),
        }
        self.lock().push(event.clone());
        // No subscribers is fine
        self.event_tx.send(Event::Status(event)).ok();
    }

    /// Append an informational event
    pub fn info(&self, message: impl Into<String>) {
        self.push(StatusEvent::info(message));
    }

    /// Append a success event
    pub fn success(&self, message: impl Into<String>) {
        self.push(StatusEvent::success(message));
    }

    /// Append an error event
    pub fn error(&self, message: impl Into<String>) {
        self.push(StatusEvent::error(message));
    }

    /// Copy of every event so far, oldest first
    pub fn snapshot(&self) -> Vec<StatusEvent> {
        self.lock().clone()
    }

    /// Number of events so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been logged yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
