use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::errors::{OutboxResult, SnapshotError};
use super::event::Envelope;
use super::log_record::{LogRecord, NewLogRecord};

/// Persistence and locking primitives over the outbox table.
pub trait OutboxStore: Send + Sync + 'static {
    /// Handle of an open transaction the writer appends into.
    type Tx;

    /// Runs `f` inside one transaction, rolling back if it returns an error.
    fn transaction<R, F>(&self, f: F) -> OutboxResult<R>
    where
        F: FnOnce(&mut Self::Tx) -> OutboxResult<R>;

    fn persist(&self, tx: &mut Self::Tx, records: Vec<NewLogRecord>) -> OutboxResult<usize>;

    /// Atomically reserves up to `limit` claimable rows for `token`.
    fn claim(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expiry: DateTime<Utc>,
        limit: i64,
    ) -> OutboxResult<usize>;

    fn fetch_claimed(&self, token: &str, now: DateTime<Utc>) -> OutboxResult<Vec<LogRecord>>;

    fn delete(&self, record: &LogRecord) -> OutboxResult<()>;

    fn find_by_ids(&self, ids: &[i64]) -> OutboxResult<Vec<LogRecord>>;
}

/// Delivers one batch of same-typed envelopes to the broker.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event_type: &str, events: &[Envelope]) -> OutboxResult<()>;
}

impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    fn publish(&self, event_type: &str, events: &[Envelope]) -> OutboxResult<()> {
        (**self).publish(event_type, events)
    }
}

/// One entity of a full-state replay.
///
/// `payload` keeps the application's own type so compaction keys resolve
/// exactly as they do for change events of the same entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T = Value> {
    pub id: String,
    pub data_type: String,
    pub payload: T,
}

/// Application-supplied source of snapshot pages.
///
/// Pages must be sorted ascending by id and contiguous: nothing between the
/// first and last id of a page may be left out.
pub trait SnapshotEventProvider<T = Value>: Send + Sync {
    fn supported_event_types(&self) -> Vec<String>;

    fn get_snapshot(
        &self,
        event_type: &str,
        cursor: Option<&str>,
        filter: Option<&str>,
    ) -> Result<Vec<Snapshot<T>>, SnapshotError>;
}
