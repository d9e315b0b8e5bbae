//! Checkout endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use purchasing::{CheckoutRequest, Receipt};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::PurchasingState;

/// POST /checkout — runs the checkout saga over the caller's cart.
pub async fn run(
    State(state): State<Arc<PurchasingState>>,
    Caller(identity): Caller,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<Receipt>, ApiError> {
    Ok(Json(state.checkout.checkout(&identity, req).await?))
}
