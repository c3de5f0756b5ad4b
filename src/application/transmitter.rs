use std::sync::Arc;

use chrono::Duration;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::batcher::{BatchItem, EventBatcher, DEFAULT_MAX_BATCH_BYTES};
use crate::domain::clock::Clock;
use crate::domain::errors::OutboxResult;
use crate::domain::event::Envelope;
use crate::domain::log_record::LogRecord;
use crate::domain::ports::{EventPublisher, OutboxStore};

#[derive(Debug, Clone)]
pub struct TransmissionSettings {
    pub lock_duration: Duration,
    /// Claims expiring within this margin are not sent.
    pub lock_duration_buffer: Duration,
    pub claim_batch_size: i64,
    pub max_batch_bytes: usize,
}

impl Default for TransmissionSettings {
    fn default() -> Self {
        Self {
            lock_duration: Duration::minutes(10),
            lock_duration_buffer: Duration::minutes(1),
            claim_batch_size: 1000,
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub claimed: usize,
    pub skipped: usize,
    pub sent: usize,
    pub failed: usize,
    pub dropped: usize,
}

/// Claims outbox records, ships them to the broker and deletes what was
/// delivered. Every invocation uses a fresh claim token, so any number of
/// instances may poll the same table.
pub struct EventTransmitter<S, P> {
    store: Arc<S>,
    publisher: P,
    clock: Arc<dyn Clock>,
    settings: TransmissionSettings,
}

impl<S, P> EventTransmitter<S, P>
where
    S: OutboxStore,
    P: EventPublisher,
{
    pub fn new(
        store: Arc<S>,
        publisher: P,
        clock: Arc<dyn Clock>,
        settings: TransmissionSettings,
    ) -> Self {
        Self {
            store,
            publisher,
            clock,
            settings,
        }
    }

    /// Runs one poll cycle. Failures are logged per batch and never abort
    /// the cycle; undelivered records become claimable again on expiry.
    pub fn send_events(&self) -> CycleReport {
        let token = Uuid::new_v4().to_string();
        let mut report = CycleReport::default();

        let records = match self.claim(&token) {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to claim outbox records: {}", e);
                return report;
            }
        };
        if records.is_empty() {
            return report;
        }
        report.claimed = records.len();

        let mut sent = 0;
        let mut failed = 0;
        let mut batcher = EventBatcher::new(
            self.settings.max_batch_bytes,
            |event_type: &str, batch: Vec<BatchItem<Envelope>>| {
                let (records, envelopes): (Vec<LogRecord>, Vec<Envelope>) =
                    batch.into_iter().map(|i| (i.record, i.message)).unzip();
                match self.publisher.publish(event_type, &envelopes) {
                    Ok(()) => {
                        sent += records.len();
                        for record in &records {
                            if let Err(e) = self.store.delete(record) {
                                error!(
                                    "Delivered outbox record {} but could not delete it: {}",
                                    record.id, e
                                );
                            }
                        }
                    }
                    Err(e) => {
                        failed += records.len();
                        warn!(
                            "Failed to send {} {} events, leaving them for retry: {}",
                            records.len(),
                            event_type,
                            e
                        );
                    }
                }
            },
        );

        let mut unmappable = 0;
        for record in records {
            if self.near_expiry(&record) {
                info!(
                    "Skipping outbox record {}: claim expires within the safety buffer",
                    record.id
                );
                report.skipped += 1;
                continue;
            }
            match Envelope::from_record(&record) {
                Ok(envelope) => batcher.push(record, envelope),
                Err(e) => {
                    error!(
                        "Could not map outbox record {} ({}) to an event: {}",
                        record.id, record.event_type, e
                    );
                    unmappable += 1;
                }
            }
        }
        let dropped = batcher.finish();

        report.sent = sent;
        report.failed = failed;
        report.dropped = dropped + unmappable;
        debug!("Outbox cycle {}: {:?}", token, report);
        report
    }

    fn claim(&self, token: &str) -> OutboxResult<Vec<LogRecord>> {
        let now = self.clock.now();
        let expiry = now + self.settings.lock_duration;
        let claimed = self
            .store
            .claim(token, now, expiry, self.settings.claim_batch_size)?;
        debug!("Claimed {} outbox records with token {}", claimed, token);
        if claimed == 0 {
            return Ok(Vec::new());
        }
        self.store.fetch_claimed(token, now)
    }

    fn near_expiry(&self, record: &LogRecord) -> bool {
        match record.locked_until {
            Some(until) => self.clock.now() >= until - self.settings.lock_duration_buffer,
            None => true,
        }
    }
}
