//! Notification sink
//!
//! The executor and reconciler report command and service-action outcomes
//! through an injected [`NotificationSink`] instead of owning any audit or
//! messaging implementation. Sink failures never affect execution outcomes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use tracing::{info, warn};

/// One human-readable outcome entry
#[derive(Debug, Clone)]
pub struct NotificationMessage {
    /// Name of the server, service, or command the outcome belongs to
    pub target: String,
    pub success: bool,
    pub body: String,
    pub occurred_at: DateTime<Utc>,
}

impl NotificationMessage {
    pub fn new(target: impl Into<String>, success: bool, body: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            success,
            body: body.into(),
            occurred_at: Utc::now(),
        }
    }
}

/// Outcome reporting capability injected into the executor
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, message: NotificationMessage);
}

/// Sink that writes entries to the tracing log
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, message: NotificationMessage) {
        if message.success {
            info!(target_name = %message.target, "{}", message.body);
        } else {
            warn!(target_name = %message.target, "{}", message.body);
        }
    }
}

/// Sink that discards everything
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn notify(&self, _message: NotificationMessage) {}
}

/// Sink that records entries in memory, for assertions in tests
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<NotificationMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<NotificationMessage> {
        self.entries.lock().expect("sink lock poisoned").clone()
    }
}

#[async_trait]
impl NotificationSink for MemorySink {
    async fn notify(&self, message: NotificationMessage) {
        self.entries.lock().expect("sink lock poisoned").push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_sink_records_entries() {
        let sink = MemorySink::new();
        sink.notify(NotificationMessage::new("web-01", true, "command completed"))
            .await;
        sink.notify(NotificationMessage::new("web-02", false, "command failed"))
            .await;

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert_eq!(entries[1].target, "web-02");
        assert!(!entries[1].success);
    }
}
