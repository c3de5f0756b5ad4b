use log::{error, warn};
use serde::Serialize;

use crate::domain::log_record::LogRecord;

/// Broker's hard limit on one batch payload.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 50_000_000;

/// A claimed record paired with the message built from it.
#[derive(Debug, Clone)]
pub struct BatchItem<M> {
    pub record: LogRecord,
    pub message: M,
}

/// Groups consecutive same-typed messages into batches that stay within 80%
/// of the broker's payload limit, handing each full batch to `publish`.
///
/// Sizes are measured as the JSON array body sent to the broker, so the
/// brackets and separating commas count.
pub struct EventBatcher<M, F>
where
    F: FnMut(&str, Vec<BatchItem<M>>),
{
    threshold: usize,
    items: Vec<BatchItem<M>>,
    /// Serialized length of `items` as a JSON array; 0 while empty.
    size: usize,
    dropped: usize,
    publish: F,
}

impl<M, F> EventBatcher<M, F>
where
    M: Serialize,
    F: FnMut(&str, Vec<BatchItem<M>>),
{
    pub fn new(max_batch_bytes: usize, publish: F) -> Self {
        Self {
            threshold: max_batch_bytes / 5 * 4,
            items: Vec::new(),
            size: 0,
            dropped: 0,
            publish,
        }
    }

    pub fn push(&mut self, record: LogRecord, message: M) {
        let size = match serde_json::to_vec(&message) {
            Ok(bytes) => bytes.len(),
            Err(e) => {
                error!(
                    "Dropping outbox record {} ({}): could not serialize message: {}",
                    record.id, record.event_type, e
                );
                self.dropped += 1;
                return;
            }
        };

        let type_changed = self
            .items
            .first()
            .is_some_and(|first| first.record.event_type != record.event_type);
        if type_changed || (!self.items.is_empty() && self.size_with(size) > self.threshold) {
            self.flush();
        }

        if self.items.is_empty() && self.size_with(size) > self.threshold {
            warn!(
                "Outbox record {} alone is {} bytes, above the batch threshold of {} bytes",
                record.id, size, self.threshold
            );
        }

        self.size = self.size_with(size);
        self.items.push(BatchItem { record, message });
    }

    /// Body length once a message of `size` bytes is appended.
    fn size_with(&self, size: usize) -> usize {
        if self.items.is_empty() {
            size + 2
        } else {
            self.size + 1 + size
        }
    }

    /// Publishes the pending batch, if any.
    pub fn flush(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let items = std::mem::take(&mut self.items);
        self.size = 0;
        let event_type = items[0].record.event_type.clone();
        (self.publish)(&event_type, items);
    }

    /// Flushes the remainder and returns how many messages were dropped.
    pub fn finish(mut self) -> usize {
        self.flush();
        self.dropped
    }
}
