//! Chatvue room directory projector entry point.

use std::error::Error;

use chatvue_event_store::postgres::{PgCheckpointStore, PgEventStore};
use chatvue_projector::config::ProjectorConfig;
use chatvue_projector::directory::PgRoomDirectory;
use chatvue_projector::worker::ProjectorWorker;
use chatvue_rooms::application::projections::RoomDirectoryProjection;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Chatvue room directory projector");

    let config = ProjectorConfig::from_env()?;

    // Create database connection pool.
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.store_timeout)
        .connect(&config.database_url)
        .await?;

    chatvue_event_store::migrate(&pool).await?;

    let store = PgEventStore::new(pool.clone());
    let checkpoints = PgCheckpointStore::new(pool.clone());
    let directory = PgRoomDirectory::new(pool);
    let projection =
        RoomDirectoryProjection::new(&config.projection_name, &directory, &checkpoints);
    let worker = ProjectorWorker::new(
        &store,
        projection,
        config.batch_size,
        config.poll_interval,
        config.store_timeout,
    );

    tracing::info!(
        projection = %config.projection_name,
        batch_size = config.batch_size,
        "Projector running"
    );

    worker
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
