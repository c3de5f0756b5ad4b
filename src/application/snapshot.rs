use std::any::Any;
use std::sync::Arc;

use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::application::log_writer::LogWriter;
use crate::domain::errors::SnapshotError;
use crate::domain::event::{DataOp, EventKind};
use crate::domain::ports::{OutboxStore, SnapshotEventProvider};

/// Entry point for on-demand snapshot requests.
pub trait SnapshotTrigger: Send + Sync {
    fn supported_event_types(&self) -> Vec<String>;

    /// Enqueues a full-state replay of `event_type`, returning how many
    /// snapshot events were written.
    fn generate(&self, event_type: &str, filter: Option<&str>) -> Result<usize, SnapshotError>;
}

/// Replays provider pages as snapshot events, `T` being the payload type
/// the provider hands out.
pub struct SnapshotGenerator<S: OutboxStore, T: 'static = Value> {
    store: Arc<S>,
    writer: Arc<LogWriter<S>>,
    provider: Option<Arc<dyn SnapshotEventProvider<T>>>,
}

impl<S: OutboxStore, T: Serialize + Any> SnapshotGenerator<S, T> {
    pub fn new(
        store: Arc<S>,
        writer: Arc<LogWriter<S>>,
        provider: Option<Arc<dyn SnapshotEventProvider<T>>>,
    ) -> Self {
        Self {
            store,
            writer,
            provider,
        }
    }
}

impl<S: OutboxStore, T: Serialize + Any> SnapshotTrigger for SnapshotGenerator<S, T> {
    fn supported_event_types(&self) -> Vec<String> {
        self.provider
            .as_ref()
            .map(|p| p.supported_event_types())
            .unwrap_or_default()
    }

    fn generate(&self, event_type: &str, filter: Option<&str>) -> Result<usize, SnapshotError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(SnapshotError::ProviderNotImplemented)?;

        let mut cursor: Option<String> = None;
        let mut total = 0;
        loop {
            let page = provider.get_snapshot(event_type, cursor.as_deref(), filter)?;
            let Some(last) = page.last() else {
                break;
            };
            if cursor.as_deref() == Some(last.id.as_str()) {
                return Err(SnapshotError::Provider(format!(
                    "snapshot cursor for {} did not advance past {}",
                    event_type, last.id
                )));
            }
            let next_cursor = last.id.clone();

            // One transaction per page.
            total += self.store.transaction(|tx| {
                let items = page.iter().map(|s| {
                    (
                        EventKind::data_change(DataOp::Snapshot, s.data_type.clone()),
                        &s.payload,
                    )
                });
                self.writer.write_all(tx, event_type, items, None)
            })?;
            cursor = Some(next_cursor);
        }

        info!("Enqueued {} snapshot events for {}", total, event_type);
        Ok(total)
    }
}
