//! WebhookEventStore port - dedupe ledger for processed gateway events.
//!
//! The gateway redelivers events after timeouts and 5xx responses, so every
//! handler must be idempotent. This store records which event ids have been
//! seen, with the outcome and payload kept for auditing.
//!
//! Implementations must make `save` first-writer-wins (PRIMARY KEY on
//! event_id, `ON CONFLICT DO NOTHING`): two deliveries of the same event
//! racing through the processor must resolve to one `Inserted` and one
//! `AlreadyExists`.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Record of a processed webhook event.
#[derive(Debug, Clone)]
pub struct WebhookEventRecord {
    /// Gateway event id (evt_xxx format).
    pub event_id: String,

    /// Gateway event type string.
    pub event_type: String,

    /// When the event was processed.
    pub processed_at: Timestamp,

    /// Outcome: "success" or "ignored". Hard failures leave no record so the
    /// gateway redelivers.
    pub result: String,

    /// Error or ignore reason, when there is one.
    pub detail: Option<String>,

    /// Original event payload for auditing.
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    /// Record for an event that was applied.
    pub fn success(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: "success".to_string(),
            detail: None,
            payload,
        }
    }

    /// Record for an event that was acknowledged but deliberately dropped.
    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: "ignored".to_string(),
            detail: Some(reason.into()),
            payload,
        }
    }

}

/// Result of attempting to save a webhook event record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    /// First time seeing this event.
    Inserted,
    /// Another delivery already recorded it.
    AlreadyExists,
}

/// Port for the processed-event ledger.
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Find a previously processed event by gateway event id.
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    /// Attempt to save a record; first writer wins.
    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Delete records processed before the cutoff. Returns the count deleted.
    ///
    /// Retention policy hook (e.g. keep 30 days).
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
