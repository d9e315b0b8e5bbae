//! Logistics server entry point.

use std::sync::Arc;

use api::config::LogisticsConfig;
use api::error::StartupError;
use api::state::LogisticsState;
use sqlx::postgres::PgPoolOptions;
use store::{PostgresLogisticsStore, ReferenceData};

#[tokio::main]
async fn main() {
    let config = LogisticsConfig::from_env();
    api::server::init_tracing(&config.log_level);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "logistics server failed");
        std::process::exit(1);
    }
}

async fn run(config: LogisticsConfig) -> Result<(), StartupError> {
    let metrics_handle = api::server::install_metrics()?;

    let reference = match &config.reference_data_path {
        Some(path) => ReferenceData::from_json_file(path)?,
        None => ReferenceData::builtin(),
    };
    tracing::info!(
        localities = reference.localities.len(),
        centers = reference.distribution_centers.len(),
        "reference data loaded"
    );

    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresLogisticsStore::new(pool);
            store.run_migrations().await?;
            store.seed_reference_data(&reference).await?;
            tracing::info!("using PostgreSQL store");
            let state = LogisticsState::from_config(store, &config)?;
            api::logistics_app(Arc::new(state), metrics_handle)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, shipments are kept in memory");
            let store = store::InMemoryLogisticsStore::with_reference_data(&reference);
            let state = LogisticsState::from_config(store, &config)?;
            api::logistics_app(Arc::new(state), metrics_handle)
        }
    };

    api::server::serve(app, &config.addr(), api::LOGISTICS_SERVICE).await
}
