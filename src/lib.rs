pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::scheduler::TransmissionScheduler;
use application::snapshot::SnapshotTrigger;
use application::transmitter::EventTransmitter;
use config::OutboxConfig;
use domain::clock::Clock;
use domain::errors::OutboxError;
use infrastructure::outbox_store::DieselOutboxStore;
use infrastructure::publisher::HttpEventPublisher;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Start polling the outbox on a background thread.
///
/// The HTTP client is built on that thread; the returned handle stops the
/// loop when dropped or when `stop` is called.
pub fn spawn_transmitter(
    config: &OutboxConfig,
    store: Arc<DieselOutboxStore>,
    clock: Arc<dyn Clock>,
) -> std::io::Result<TransmissionScheduler> {
    let settings = config.transmission_settings();
    let broker_url = config.broker_url.clone();
    let timeout = config.broker_timeout;

    TransmissionScheduler::spawn(config.poll_interval, move || {
        let broker_url = broker_url
            .ok_or_else(|| OutboxError::Transmission("no broker URL configured".to_string()))?;
        let publisher = HttpEventPublisher::new(&broker_url, timeout)?;
        let transmitter = EventTransmitter::new(store, publisher, clock, settings);
        Ok::<_, OutboxError>(move || {
            transmitter.send_events();
        })
    })
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    snapshots: Arc<dyn SnapshotTrigger>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let snapshots = web::Data::from(snapshots);
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(snapshots.clone())
            .wrap(Logger::default())
            .configure(handlers::routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", handlers::ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
