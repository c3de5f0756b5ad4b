use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::Url;

use crate::domain::errors::{OutboxError, OutboxResult};
use crate::domain::event::Envelope;
use crate::domain::ports::EventPublisher;

/// Posts batches to `{base_url}/event-types/{type}` as a JSON array.
pub struct HttpEventPublisher {
    client: Client,
    base_url: Url,
}

impl HttpEventPublisher {
    pub fn new(base_url: &str, timeout: Duration) -> OutboxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OutboxError::Transmission(format!("cannot build HTTP client: {}", e)))?;

        let base_url = Url::parse(base_url).map_err(|e| {
            OutboxError::Transmission(format!("invalid broker URL {}: {}", base_url, e))
        })?;

        Ok(Self { client, base_url })
    }

    /// The event type travels as a single, percent-encoded path segment.
    pub fn endpoint(&self, event_type: &str) -> OutboxResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                OutboxError::Transmission(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("event-types")
            .push(event_type);
        Ok(url)
    }
}

impl EventPublisher for HttpEventPublisher {
    fn publish(&self, event_type: &str, events: &[Envelope]) -> OutboxResult<()> {
        let url = self.endpoint(event_type)?;
        debug!("Posting {} events to {}", events.len(), url);

        let response = self
            .client
            .post(url)
            .json(events)
            .send()
            .map_err(|e| OutboxError::Transmission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OutboxError::Transmission(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}
