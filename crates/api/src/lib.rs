//! HTTP servers with observability for the fulfillment pipeline.
//!
//! Two routers share this crate: the logistics service (shipments, quotes,
//! transport methods) and the purchasing service (cart, checkout, order
//! history). Both carry structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use store::LogisticsStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::{LogisticsState, PurchasingState};

pub const LOGISTICS_SERVICE: &str = "logistics";
pub const PURCHASING_SERVICE: &str = "purchasing";

/// Creates the logistics router.
pub fn logistics_app<S: LogisticsStore + Clone + 'static>(
    state: Arc<LogisticsState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    Router::new()
        .route("/health", get(|| routes::health::check(LOGISTICS_SERVICE)))
        .route(
            "/shipping",
            post(routes::shipping::create::<S>).get(routes::shipping::list::<S>),
        )
        .route("/shipping/cost", post(routes::shipping::cost::<S>))
        .route("/shipping/transport-methods", get(routes::shipping::methods))
        .route("/shipping/{id}", get(routes::shipping::get::<S>))
        .route("/shipping/{id}/cancel", post(routes::shipping::cancel::<S>))
        .route(
            "/shipments/{id}/status",
            put(routes::shipping::update_status::<S>),
        )
        .route("/localities", get(routes::localities::lookup::<S>))
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

/// Creates the purchasing router.
pub fn purchasing_app(state: Arc<PurchasingState>, metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(|| routes::health::check(PURCHASING_SERVICE)))
        .route("/checkout", post(routes::checkout::run))
        .route(
            "/cart",
            get(routes::cart::get).delete(routes::cart::clear),
        )
        .route("/cart/items", post(routes::cart::add_item))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update_item).delete(routes::cart::remove_item),
        )
        .route("/orders", get(routes::orders::list))
        .route(
            "/orders/{id}",
            get(routes::orders::get).delete(routes::orders::cancel),
        )
        .route(
            "/shipping-notifications/{shipping_id}/cancelled",
            post(routes::notifications::shipment_cancelled),
        )
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(handle)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
