//! Event types and broadcast bus
//!
//! All events are broadcast via [`EventBus`] and serialized for SSE
//! transmission. The bus doubles as the user-facing notification sink:
//! [`ShelfEvent::Notification`] carries success/error messages for the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// Shelf event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShelfEvent {
    /// Import pipeline moved between stages (upload / preview / result)
    ImportStageChanged {
        run_id: Uuid,
        old_stage: String,
        new_stage: String,
        timestamp: DateTime<Utc>,
    },

    /// A write batch finished
    ImportProgressUpdate {
        run_id: Uuid,
        completed_batches: usize,
        total_batches: usize,
        /// Rounded percentage (0-100), never decreases within one run
        percentage: u8,
        timestamp: DateTime<Utc>,
    },

    /// Import run reached its terminal result
    ImportCompleted {
        run_id: Uuid,
        imported: usize,
        skipped: usize,
        overwritten: usize,
        errors: usize,
        timestamp: DateTime<Utc>,
    },

    /// User-facing message
    Notification {
        level: NotificationLevel,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl ShelfEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            ShelfEvent::ImportStageChanged { .. } => "ImportStageChanged",
            ShelfEvent::ImportProgressUpdate { .. } => "ImportProgressUpdate",
            ShelfEvent::ImportCompleted { .. } => "ImportCompleted",
            ShelfEvent::Notification { .. } => "Notification",
        }
    }

    pub fn notification(level: NotificationLevel, message: impl Into<String>) -> Self {
        ShelfEvent::Notification {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Broadcast channel shared by the pipeline and the SSE endpoint
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ShelfEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ShelfEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ShelfEvent,
    ) -> Result<usize, broadcast::error::SendError<ShelfEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ShelfEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
