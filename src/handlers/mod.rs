pub mod snapshots;

use actix_web::web;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(snapshots::list_snapshot_event_types, snapshots::create_snapshot),
    components(schemas(
        snapshots::SnapshotCreatedResponse,
        snapshots::SnapshotEventTypesResponse
    )),
    tags((name = "snapshots", description = "Outbox snapshot administration"))
)]
pub struct ApiDoc;

/// Registers the administrative routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/snapshot")
            .route("", web::get().to(snapshots::list_snapshot_event_types))
            .route("/{event_type}", web::post().to(snapshots::create_snapshot)),
    );
}
