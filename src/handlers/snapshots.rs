use actix_web::{web, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::snapshot::SnapshotTrigger;
use crate::errors::AppError;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotCreatedResponse {
    pub event_type: String,
    /// Number of snapshot events written to the outbox.
    pub events: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SnapshotEventTypesResponse {
    pub event_types: Vec<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /snapshot
///
/// Lists the event types the registered snapshot provider can replay.
#[utoipa::path(
    get,
    path = "/snapshot",
    responses(
        (status = 200, description = "Supported event types", body = SnapshotEventTypesResponse),
    ),
    tag = "snapshots"
)]
pub async fn list_snapshot_event_types(
    trigger: web::Data<dyn SnapshotTrigger>,
) -> Result<HttpResponse, AppError> {
    let mut event_types = trigger.supported_event_types();
    event_types.sort();
    Ok(HttpResponse::Ok().json(SnapshotEventTypesResponse { event_types }))
}

/// POST /snapshot/{event_type}
///
/// Enqueues a full-state replay of the given event type into the outbox.
/// The optional request body is handed to the provider as an opaque filter.
#[utoipa::path(
    post,
    path = "/snapshot/{event_type}",
    params(
        ("event_type" = String, Path, description = "Event type to replay"),
    ),
    request_body(content = String, description = "Opaque filter", content_type = "text/plain"),
    responses(
        (status = 201, description = "Snapshot events enqueued", body = SnapshotCreatedResponse),
        (status = 400, description = "Filter is not UTF-8 text"),
        (status = 422, description = "Unknown event type"),
        (status = 501, description = "No snapshot provider registered"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "snapshots"
)]
pub async fn create_snapshot(
    trigger: web::Data<dyn SnapshotTrigger>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let event_type = path.into_inner();
    let filter = if body.is_empty() {
        None
    } else {
        let text = String::from_utf8(body.to_vec())
            .map_err(|_| AppError::BadRequest("snapshot filter must be UTF-8 text".to_string()))?;
        Some(text)
    };
    let trigger = trigger.into_inner();

    let events = {
        let event_type = event_type.clone();
        web::block(move || trigger.generate(&event_type, filter.as_deref()))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??
    };

    Ok(HttpResponse::Created().json(SnapshotCreatedResponse { event_type, events }))
}
