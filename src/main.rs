use std::sync::Arc;

use dotenvy::dotenv;
use event_outbox::application::log_writer::LogWriter;
use event_outbox::application::snapshot::{SnapshotGenerator, SnapshotTrigger};
use event_outbox::config::OutboxConfig;
use event_outbox::domain::clock::{Clock, SystemClock};
use event_outbox::domain::compaction::CompactionKeyResolver;
use event_outbox::infrastructure::outbox_store::DieselOutboxStore;
use event_outbox::{build_server, create_pool, run_migrations, spawn_transmitter};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = OutboxConfig::from_env().expect("Invalid outbox configuration");

    let pool = create_pool(&config.database_url).expect("Failed to create database connection pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(DieselOutboxStore::new(pool, clock.clone()));
    let writer = Arc::new(
        LogWriter::new(store.clone(), Arc::new(CompactionKeyResolver::new()))
            .with_random_eids(config.random_eids),
    );
    // The standalone relay has no application data to replay.
    let snapshots: Arc<dyn SnapshotTrigger> = Arc::new(
        SnapshotGenerator::<_, serde_json::Value>::new(store.clone(), writer, None),
    );

    let scheduler = if config.scheduler_enabled {
        Some(spawn_transmitter(&config, store, clock)?)
    } else {
        log::info!("Outbox polling is disabled");
        None
    };

    log::info!("Starting server at http://{}:{}", config.host, config.port);
    let served = build_server(snapshots, &config.host, config.port)?.await;

    if let Some(scheduler) = scheduler {
        scheduler.stop();
    }
    served
}
