//! Cart endpoints. Bodies are camelCase; every route needs an
//! authenticated caller.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, ProductId};
use purchasing::identity::resolve_user;
use purchasing::{Cart, CartItem, LocalUser};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::Caller;
use crate::state::PurchasingState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub subtotal: Money,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            subtotal: cart.subtotal(),
            items: cart.items,
        }
    }
}

async fn caller(state: &PurchasingState, Caller(identity): &Caller) -> Result<LocalUser, ApiError> {
    Ok(resolve_user(state.checkout.users(), identity).await?)
}

// -- Handlers --

/// GET /cart
pub async fn get(
    State(state): State<Arc<PurchasingState>>,
    who: Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let user = caller(&state, &who).await?;
    let cart = state.checkout.carts().items(user.id).await?;
    Ok(Json(cart.into()))
}

/// POST /cart/items — adds a line or increases an existing one.
pub async fn add_item(
    State(state): State<Arc<PurchasingState>>,
    who: Caller,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let user = caller(&state, &who).await?;
    let cart = state
        .checkout
        .carts()
        .add_item(user.id, req.product_id, req.quantity, req.unit_price)
        .await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

/// PUT /cart/items/{productId} — zero or less removes the line.
pub async fn update_item(
    State(state): State<Arc<PurchasingState>>,
    who: Caller,
    Path(product_id): Path<ProductId>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let user = caller(&state, &who).await?;
    let cart = state
        .checkout
        .carts()
        .update_quantity(user.id, product_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/{productId}
pub async fn remove_item(
    State(state): State<Arc<PurchasingState>>,
    who: Caller,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>, ApiError> {
    let user = caller(&state, &who).await?;
    let cart = state
        .checkout
        .carts()
        .remove_item(user.id, product_id)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart
pub async fn clear(
    State(state): State<Arc<PurchasingState>>,
    who: Caller,
) -> Result<StatusCode, ApiError> {
    let user = caller(&state, &who).await?;
    state.checkout.carts().clear(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
