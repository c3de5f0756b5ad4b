use std::any::Any;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::compaction::CompactionKeyResolver;
use crate::domain::errors::OutboxResult;
use crate::domain::event::{encode_body, DataOp, EventKind};
use crate::domain::log_record::NewLogRecord;
use crate::domain::ports::OutboxStore;

/// Appends outbox rows inside a transaction owned by the caller.
///
/// The writer never opens a transaction of its own: every method takes the
/// caller's `Tx` so the event commits or rolls back with the business change.
pub struct LogWriter<S: OutboxStore> {
    store: Arc<S>,
    compaction: Arc<CompactionKeyResolver>,
    random_eids: bool,
}

impl<S: OutboxStore> LogWriter<S> {
    pub fn new(store: Arc<S>, compaction: Arc<CompactionKeyResolver>) -> Self {
        Self {
            store,
            compaction,
            random_eids: false,
        }
    }

    /// Stamp every new record with an explicit random eid instead of
    /// deriving it from the row id at send time.
    pub fn with_random_eids(mut self, enabled: bool) -> Self {
        self.random_eids = enabled;
        self
    }

    pub fn write<T>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        kind: &EventKind,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<()>
    where
        T: Serialize + Any,
    {
        let record = self.build_record(event_type, kind, payload, flow_id)?;
        self.store.persist(tx, vec![record])?;
        Ok(())
    }

    /// Persists all items as one insert. Nothing is written if any payload
    /// fails to serialize.
    pub fn write_all<'a, T, I>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        items: I,
        flow_id: Option<&str>,
    ) -> OutboxResult<usize>
    where
        T: Serialize + Any + 'a,
        I: IntoIterator<Item = (EventKind, &'a T)>,
    {
        let records = items
            .into_iter()
            .map(|(kind, payload)| self.build_record(event_type, &kind, payload, flow_id))
            .collect::<OutboxResult<Vec<_>>>()?;
        if records.is_empty() {
            return Ok(0);
        }
        self.store.persist(tx, records)
    }

    pub fn fire_create_event<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<()> {
        let kind = EventKind::data_change(DataOp::Create, data_type);
        self.write(tx, event_type, &kind, payload, flow_id)
    }

    pub fn fire_update_event<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<()> {
        let kind = EventKind::data_change(DataOp::Update, data_type);
        self.write(tx, event_type, &kind, payload, flow_id)
    }

    pub fn fire_delete_event<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<()> {
        let kind = EventKind::data_change(DataOp::Delete, data_type);
        self.write(tx, event_type, &kind, payload, flow_id)
    }

    pub fn fire_snapshot_event<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<()> {
        let kind = EventKind::data_change(DataOp::Snapshot, data_type);
        self.write(tx, event_type, &kind, payload, flow_id)
    }

    pub fn fire_business_event<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<()> {
        self.write(tx, event_type, &EventKind::Business, payload, flow_id)
    }

    pub fn fire_create_events<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payloads: &[T],
        flow_id: Option<&str>,
    ) -> OutboxResult<usize> {
        self.fire_data_change_events(tx, event_type, DataOp::Create, data_type, payloads, flow_id)
    }

    pub fn fire_update_events<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payloads: &[T],
        flow_id: Option<&str>,
    ) -> OutboxResult<usize> {
        self.fire_data_change_events(tx, event_type, DataOp::Update, data_type, payloads, flow_id)
    }

    pub fn fire_delete_events<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        data_type: &str,
        payloads: &[T],
        flow_id: Option<&str>,
    ) -> OutboxResult<usize> {
        self.fire_data_change_events(tx, event_type, DataOp::Delete, data_type, payloads, flow_id)
    }

    pub fn fire_business_events<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        payloads: &[T],
        flow_id: Option<&str>,
    ) -> OutboxResult<usize> {
        let items = payloads.iter().map(|p| (EventKind::Business, p));
        self.write_all(tx, event_type, items, flow_id)
    }

    fn fire_data_change_events<T: Serialize + Any>(
        &self,
        tx: &mut S::Tx,
        event_type: &str,
        op: DataOp,
        data_type: &str,
        payloads: &[T],
        flow_id: Option<&str>,
    ) -> OutboxResult<usize> {
        let items = payloads
            .iter()
            .map(|p| (EventKind::data_change(op, data_type), p));
        self.write_all(tx, event_type, items, flow_id)
    }

    fn build_record<T: Serialize + Any>(
        &self,
        event_type: &str,
        kind: &EventKind,
        payload: &T,
        flow_id: Option<&str>,
    ) -> OutboxResult<NewLogRecord> {
        Ok(NewLogRecord {
            event_type: event_type.to_string(),
            body: encode_body(kind, payload)?,
            flow_id: flow_id.map(str::to_string),
            compaction_key: self.compaction.resolve(event_type, payload),
            eid: self.random_eids.then(Uuid::new_v4),
        })
    }
}
