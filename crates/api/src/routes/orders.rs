//! Order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ReservationId;
use purchasing::identity::resolve_user;
use purchasing::{OrderBook, OrderRecord};
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::PurchasingState;

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<OrderRecord>,
}

/// GET /orders — the caller's orders, newest first.
pub async fn list(
    State(state): State<Arc<PurchasingState>>,
    Caller(identity): Caller,
) -> Result<Json<OrdersResponse>, ApiError> {
    let user = resolve_user(state.checkout.users(), &identity).await?;
    let orders = state.checkout.orders().orders(user.id).await?;
    Ok(Json(OrdersResponse { orders }))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<Arc<PurchasingState>>,
    Caller(identity): Caller,
    Path(id): Path<ReservationId>,
) -> Result<Json<OrderRecord>, ApiError> {
    let user = resolve_user(state.checkout.users(), &identity).await?;
    Ok(Json(state.checkout.orders().order(user.id, id).await?))
}

/// DELETE /orders/{id} — cancels a pending order of the caller.
pub async fn cancel(
    State(state): State<Arc<PurchasingState>>,
    Caller(identity): Caller,
    Path(id): Path<ReservationId>,
) -> Result<StatusCode, ApiError> {
    let user = resolve_user(state.checkout.users(), &identity).await?;
    state.checkout.cancel_order(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
