//! Notices sent by logistics.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::ShippingId;
use purchasing::{OrderBook, OrderRecord};

use crate::error::ApiError;
use crate::state::PurchasingState;

/// POST /shipping-notifications/{shippingId}/cancelled — marks the owning
/// order's shipment as cancelled. Repeated notices are harmless.
pub async fn shipment_cancelled(
    State(state): State<Arc<PurchasingState>>,
    Path(shipping_id): Path<ShippingId>,
) -> Result<Json<OrderRecord>, ApiError> {
    let order = state
        .checkout
        .orders()
        .shipment_cancelled(shipping_id)
        .await?;
    Ok(Json(order))
}
