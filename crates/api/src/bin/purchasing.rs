//! Purchasing server entry point.

use std::sync::Arc;

use api::config::PurchasingConfig;
use api::error::StartupError;
use api::state::PurchasingState;

#[tokio::main]
async fn main() {
    let config = PurchasingConfig::from_env();
    api::server::init_tracing(&config.log_level);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "purchasing server failed");
        std::process::exit(1);
    }
}

async fn run(config: PurchasingConfig) -> Result<(), StartupError> {
    let metrics_handle = api::server::install_metrics()?;

    tracing::info!(
        stock_url = %config.stock_url,
        logistics_url = %config.logistics_url,
        timeout = ?config.upstream_timeout,
        "upstream services configured"
    );
    let state = PurchasingState::from_config(&config)?;
    let app = api::purchasing_app(Arc::new(state), metrics_handle);

    api::server::serve(app, &config.addr(), api::PURCHASING_SERVICE).await
}
