//! In-memory doubles for exercising the writer, transmitter and snapshot
//! generator without a database or broker.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::domain::clock::{Clock, SystemClock};
use crate::domain::errors::{OutboxError, OutboxResult};
use crate::domain::event::Envelope;
use crate::domain::log_record::{LogRecord, NewLogRecord};
use crate::domain::ports::{EventPublisher, OutboxStore};

#[derive(Default)]
struct Rows {
    next_id: i64,
    by_id: BTreeMap<i64, LogRecord>,
}

pub struct InMemoryTx {
    pending: Vec<NewLogRecord>,
}

pub struct InMemoryOutboxStore {
    rows: Mutex<Rows>,
    clock: Arc<dyn Clock>,
    persist_calls: AtomicUsize,
    failing_deletes: Mutex<HashSet<i64>>,
}

impl Default for InMemoryOutboxStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl InMemoryOutboxStore {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: Mutex::new(Rows::default()),
            clock,
            persist_calls: AtomicUsize::new(0),
            failing_deletes: Mutex::new(HashSet::new()),
        }
    }

    pub fn all(&self) -> Vec<LogRecord> {
        self.rows.lock().unwrap().by_id.values().cloned().collect()
    }

    pub fn persist_calls(&self) -> usize {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub fn fail_delete_of(&self, id: i64) {
        self.failing_deletes.lock().unwrap().insert(id);
    }
}

impl OutboxStore for InMemoryOutboxStore {
    type Tx = InMemoryTx;

    fn transaction<R, F>(&self, f: F) -> OutboxResult<R>
    where
        F: FnOnce(&mut Self::Tx) -> OutboxResult<R>,
    {
        let mut tx = InMemoryTx {
            pending: Vec::new(),
        };
        let result = f(&mut tx)?;

        let now = self.clock.now();
        let mut rows = self.rows.lock().unwrap();
        for new in tx.pending {
            rows.next_id += 1;
            let id = rows.next_id;
            rows.by_id.insert(
                id,
                LogRecord {
                    id,
                    event_type: new.event_type,
                    body: new.body,
                    flow_id: new.flow_id,
                    compaction_key: new.compaction_key,
                    eid: new.eid,
                    created_at: now,
                    last_modified_at: now,
                    locked_by: None,
                    locked_until: None,
                },
            );
        }
        Ok(result)
    }

    fn persist(&self, tx: &mut Self::Tx, records: Vec<NewLogRecord>) -> OutboxResult<usize> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        let count = records.len();
        tx.pending.extend(records);
        Ok(count)
    }

    fn claim(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expiry: DateTime<Utc>,
        limit: i64,
    ) -> OutboxResult<usize> {
        let mut rows = self.rows.lock().unwrap();
        let mut claimed = 0;
        for row in rows.by_id.values_mut() {
            if claimed as i64 >= limit {
                break;
            }
            if row.is_claimable_at(now) {
                row.locked_by = Some(token.to_string());
                row.locked_until = Some(expiry);
                claimed += 1;
            }
        }
        Ok(claimed)
    }

    fn fetch_claimed(&self, token: &str, now: DateTime<Utc>) -> OutboxResult<Vec<LogRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .by_id
            .values()
            .filter(|r| r.locked_by.as_deref() == Some(token))
            .filter(|r| r.locked_until.is_some_and(|until| until > now))
            .cloned()
            .collect())
    }

    fn delete(&self, record: &LogRecord) -> OutboxResult<()> {
        if self.failing_deletes.lock().unwrap().contains(&record.id) {
            return Err(OutboxError::Database(format!(
                "delete of record {} refused",
                record.id
            )));
        }
        self.rows.lock().unwrap().by_id.remove(&record.id);
        Ok(())
    }

    fn find_by_ids(&self, ids: &[i64]) -> OutboxResult<Vec<LogRecord>> {
        let rows = self.rows.lock().unwrap();
        Ok(ids.iter().filter_map(|id| rows.by_id.get(id).cloned()).collect())
    }
}

/// Publisher that remembers every batch and fails for chosen event types.
#[derive(Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<(String, Vec<Envelope>)>>,
    failing_types: Mutex<HashSet<String>>,
}

impl RecordingPublisher {
    pub fn fail_for(&self, event_type: &str) {
        self.failing_types
            .lock()
            .unwrap()
            .insert(event_type.to_string());
    }

    pub fn batches(&self) -> Vec<(String, Vec<Envelope>)> {
        self.batches.lock().unwrap().clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event_type: &str, events: &[Envelope]) -> OutboxResult<()> {
        if self.failing_types.lock().unwrap().contains(event_type) {
            return Err(OutboxError::Transmission(format!(
                "broker rejected {} events",
                event_type
            )));
        }
        self.batches
            .lock()
            .unwrap()
            .push((event_type.to_string(), events.to_vec()));
        Ok(())
    }
}
