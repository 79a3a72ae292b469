//! ==============================================================================
//! main.rs - sensorhub entry point
//! ==============================================================================
//!
//! purpose:
//!     wire the pieces together and serve:
//!     - load configuration (sensorhub.toml or defaults, env overrides)
//!     - connect to MongoDB; a failed connect is NOT fatal, the service runs
//!       in store-unavailable mode (ingest answers 503, the Grafana endpoints
//!       answer their "no data" fallbacks)
//!     - build the router and serve until killed
//!
//! architecture:
//!
//!     field node ──POST /receive_sensor_data──▶ ┌───────────┐
//!                                               │ sensorhub │──▶ MongoDB
//!     Grafana ────POST /query, /search─────────▶└───────────┘
//!
//! one logical store operation per request, awaited to completion; the
//! mongodb driver owns pooling. no background tasks, no retries.
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sensorhub::config::HostConfig;
use sensorhub::domain::AppState;
use sensorhub::routes;
use sensorhub::store::{MongoStore, StoreGateway};

#[tokio::main]
async fn main() -> Result<()> {
    // startup banner
    println!("===========================================================");
    println!("  sensorhub - sensor ingest + Grafana SimpleJSON datasource");
    println!("===========================================================");

    // step 1: load configuration
    let mut config = HostConfig::load_or_default();
    config.apply_env_overrides();
    config.print_summary();

    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // step 2: connect the store. degrade instead of dying: Grafana must keep
    // getting 200s even when the database is down.
    let store: Option<Arc<dyn StoreGateway>> = match MongoStore::connect(&config.database).await {
        Ok(store) => {
            info!(
                database = %config.database.database,
                collection = %config.database.collection,
                "connected to MongoDB"
            );
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("MongoDB unavailable, serving in degraded mode: {e:#}");
            None
        }
    };

    // step 3: serve
    let app = routes::router(AppState { store });
    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
