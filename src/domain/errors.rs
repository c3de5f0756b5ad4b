use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Transmission failed: {0}")]
    Transmission(String),
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Failures surfaced by snapshot generation.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
    #[error("No snapshot provider registered")]
    ProviderNotImplemented,
    #[error("Snapshot provider failed: {0}")]
    Provider(String),
    #[error(transparent)]
    Outbox(#[from] OutboxError),
}

pub type OutboxResult<T> = Result<T, OutboxError>;
