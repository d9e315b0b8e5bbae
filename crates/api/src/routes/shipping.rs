//! Logistics endpoints: shipment creation, quotes, status changes and
//! queries. Bodies and query strings are snake_case.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::{
    PageRequest, Paginated, ProductId, ReservationId, ShippingId, ShippingStatus, TransportType,
    UserId,
};
use logistics::{
    CreateShipment, Quote, ShipmentCancelled, ShipmentCreated, ShipmentSummary, ShipmentView,
    StatusUpdated, TransportMethod, UpdateStatus, transport_methods,
};
use serde::{Deserialize, Serialize};
use store::{LogisticsStore, NewAddress, ProductLine, ShipmentQuery};

use crate::error::ApiError;
use crate::state::LogisticsState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateShippingRequest {
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub delivery_address: NewAddress,
    pub transport_type: Option<String>,
    pub products: Vec<ProductRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CostRequest {
    pub delivery_address: NewAddress,
    pub transport_type: Option<String>,
    pub products: Vec<ProductRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub new_status: String,
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub user_id: Option<i64>,
    pub status: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub from_date: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub to_date: Option<String>,
    /// Non-numeric or out-of-range values fall back to the default.
    pub page: Option<String>,
    pub limit: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct TransportMethodsResponse {
    pub transport_methods: Vec<TransportMethod>,
}

// -- Parsing --

fn transport(raw: Option<&str>) -> Result<Option<TransportType>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: common::UnknownVariant| {
                ApiError::bad_request("validation_error", e.to_string())
            }),
    }
}

fn product_lines(products: Vec<ProductRequest>) -> Result<Vec<ProductLine>, ApiError> {
    products
        .into_iter()
        .map(|p| {
            u32::try_from(p.quantity)
                .ok()
                .filter(|q| *q > 0)
                .map(|quantity| ProductLine {
                    product_id: p.id,
                    quantity,
                })
                .ok_or_else(|| {
                    ApiError::bad_request(
                        "validation_error",
                        format!("quantity for product {} must be greater than zero", p.id),
                    )
                })
        })
        .collect()
}

fn status(raw: &str) -> Result<ShippingStatus, ApiError> {
    raw.parse()
        .map_err(|e: common::UnknownVariant| ApiError::bad_request("validation_error", e.to_string()))
}

fn date(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        ApiError::bad_request(
            "validation_error",
            format!("{field} must be a date in YYYY-MM-DD format"),
        )
    })
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Translates query parameters into a store query. Dates cover whole days.
pub fn shipment_query(params: ListParams) -> Result<ShipmentQuery, ApiError> {
    let mut query = ShipmentQuery::new().page(PageRequest::parse(
        params.page.as_deref(),
        params.limit.as_deref(),
    ));

    if let Some(user_id) = params.user_id {
        query = query.user_id(UserId::new(user_id));
    }
    if let Some(raw) = params.status.as_deref().filter(|s| !s.trim().is_empty()) {
        query = query.status(status(raw)?);
    }

    let from = params
        .from_date
        .as_deref()
        .map(|raw| date(raw, "from_date"))
        .transpose()?;
    let to = params
        .to_date
        .as_deref()
        .map(|raw| date(raw, "to_date"))
        .transpose()?;

    if let (Some(from), Some(to)) = (from, to) {
        if to < from {
            return Err(ApiError::bad_request(
                "invalid_range",
                "to_date must not be before from_date",
            ));
        }
    }
    if let Some(from) = from {
        query = query.created_from(start_of_day(from));
    }
    if let Some(to) = to {
        query = query.created_to(start_of_day(to) + Duration::days(1) - Duration::nanoseconds(1));
    }

    Ok(query)
}

// -- Handlers --

/// POST /shipping — creates a shipment.
pub async fn create<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Json(req): Json<CreateShippingRequest>,
) -> Result<(StatusCode, Json<ShipmentCreated>), ApiError> {
    let cmd = CreateShipment {
        order_id: req.order_id,
        user_id: req.user_id,
        delivery_address: req.delivery_address,
        transport_type: transport(req.transport_type.as_deref())?,
        products: product_lines(req.products)?,
    };
    let created = state.shipments.create(cmd).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /shipping/cost — prices a shipment without creating it.
pub async fn cost<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Json(req): Json<CostRequest>,
) -> Result<Json<Quote>, ApiError> {
    let transport = transport(req.transport_type.as_deref())?;
    let lines = product_lines(req.products)?;
    let quote = state
        .shipments
        .quote(&req.delivery_address.postal_code, transport, &lines)
        .await?;
    Ok(Json(quote))
}

/// GET /shipping/{id}
pub async fn get<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Path(id): Path<ShippingId>,
) -> Result<Json<ShipmentView>, ApiError> {
    Ok(Json(state.shipments.get(id).await?))
}

/// GET /shipping — filtered, paginated listing, newest first.
pub async fn list<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Paginated<ShipmentSummary>>, ApiError> {
    let query = shipment_query(params)?;
    Ok(Json(state.shipments.list(&query).await?))
}

/// POST /shipping/{id}/cancel
pub async fn cancel<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Path(id): Path<ShippingId>,
) -> Result<Json<ShipmentCancelled>, ApiError> {
    Ok(Json(state.shipments.cancel(id).await?))
}

/// PUT /shipments/{id}/status
pub async fn update_status<S: LogisticsStore + Clone + 'static>(
    State(state): State<Arc<LogisticsState<S>>>,
    Path(id): Path<ShippingId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<StatusUpdated>, ApiError> {
    let mut cmd = UpdateStatus::new(id, status(&req.new_status)?);
    cmd.message = req.message;
    Ok(Json(state.shipments.update_status(cmd).await?))
}

/// GET /shipping/transport-methods
pub async fn methods() -> Json<TransportMethodsResponse> {
    Json(TransportMethodsResponse {
        transport_methods: transport_methods(),
    })
}
