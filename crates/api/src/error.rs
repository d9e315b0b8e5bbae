//! API error types with HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use common::Money;
use logistics::{CatalogError, CostError, LocalityError, NotifyError, ShipmentError};
use purchasing::{CartError, CheckoutFailure, ClientError, IdentityError, OrderError};
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

/// Error body shared by both services.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "productsTotal", skip_serializing_if = "Option::is_none")]
    pub products_total: Option<Money>,
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Request rejected before reaching a service.
    BadRequest { code: &'static str, message: String },
    Shipment(ShipmentError),
    Locality(LocalityError),
    Cart(CartError),
    Order(OrderError),
    Identity(IdentityError),
    Checkout(CheckoutFailure),
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }

    fn parts(self) -> (StatusCode, ErrorBody) {
        let body = |code: &'static str, message: String| ErrorBody {
            code,
            message,
            products_total: None,
        };

        match self {
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, body(code, message)),
            ApiError::Shipment(err) => {
                let status = shipment_status(&err);
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "shipment operation failed");
                    "Internal server error".to_string()
                } else {
                    err.to_string()
                };
                (status, body(err.code(), message))
            }
            ApiError::Locality(err) => match &err {
                LocalityError::MissingParameters => {
                    (StatusCode::BAD_REQUEST, body(err.code(), err.to_string()))
                }
                LocalityError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, body(err.code(), err.to_string()))
                }
                LocalityError::Store(_) => internal(&err),
            },
            ApiError::Cart(err) => {
                let (status, code) = match &err {
                    CartError::InvalidQuantity
                    | CartError::InvalidPrice
                    | CartError::TotalTooLarge => {
                        (StatusCode::BAD_REQUEST, "VALIDATION")
                    }
                    CartError::ItemNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                    CartError::Conflict { .. } | CartError::Contention(_) => {
                        (StatusCode::CONFLICT, "CONFLICT")
                    }
                    CartError::Storage(_) => return internal(&err),
                };
                (status, body(code, err.to_string()))
            }
            ApiError::Order(err) => match &err {
                OrderError::NotFound(_) | OrderError::ShipmentNotFound(_) => {
                    (StatusCode::NOT_FOUND, body("NOT_FOUND", err.to_string()))
                }
                OrderError::NotCancellable { .. } => {
                    (StatusCode::BAD_REQUEST, body("VALIDATION", err.to_string()))
                }
                OrderError::Storage(_) => internal(&err),
            },
            ApiError::Identity(err) => match &err {
                IdentityError::Unauthenticated => {
                    (StatusCode::UNAUTHORIZED, body("UNAUTHORIZED", err.to_string()))
                }
                IdentityError::Directory(_) => internal(&err),
            },
            ApiError::Checkout(failure) => {
                let status = checkout_status(failure.code());
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %failure.error, "checkout failed unexpectedly");
                    "Internal server error".to_string()
                } else {
                    failure.error.to_string()
                };
                (
                    status,
                    ErrorBody {
                        code: failure.code(),
                        message,
                        products_total: failure.products_total,
                    },
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.parts();
        (status, Json(body)).into_response()
    }
}

fn internal(err: &dyn std::error::Error) -> (StatusCode, ErrorBody) {
    tracing::error!(error = %err, "internal server error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorBody {
            code: "INTERNAL",
            message: "Internal server error".to_string(),
            products_total: None,
        },
    )
}

fn shipment_status(err: &ShipmentError) -> StatusCode {
    match err {
        ShipmentError::Validation(_) => StatusCode::BAD_REQUEST,
        ShipmentError::NoProducts | ShipmentError::UnknownLocality { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ShipmentError::NotFound(_) => StatusCode::NOT_FOUND,
        ShipmentError::InvalidTransition { .. } | ShipmentError::Contention(_) => {
            StatusCode::CONFLICT
        }
        ShipmentError::Cost(CostError::Catalog(CatalogError::ProductNotFound(_))) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ShipmentError::Cost(CostError::Catalog(_)) => StatusCode::SERVICE_UNAVAILABLE,
        ShipmentError::Cost(_) => StatusCode::BAD_REQUEST,
        ShipmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn checkout_status(code: &str) -> StatusCode {
    match code {
        "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
        "EMPTY_CART" | "VALIDATION" => StatusCode::BAD_REQUEST,
        "INSUFFICIENT_STOCK" => StatusCode::CONFLICT,
        "STOCK_SERVICE_UNAVAILABLE" => StatusCode::SERVICE_UNAVAILABLE,
        "SHIPPING_CREATION_FAILED" => StatusCode::UNPROCESSABLE_ENTITY,
        "SHIPPING_SERVICE_UNAVAILABLE" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<ShipmentError> for ApiError {
    fn from(err: ShipmentError) -> Self {
        ApiError::Shipment(err)
    }
}

impl From<LocalityError> for ApiError {
    fn from(err: LocalityError) -> Self {
        ApiError::Locality(err)
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::Identity(err)
    }
}

impl From<CheckoutFailure> for ApiError {
    fn from(failure: CheckoutFailure) -> Self {
        ApiError::Checkout(failure)
    }
}

/// Errors while wiring a server at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Catalog client: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Purchasing notifier: {0}")]
    Notifier(#[from] NotifyError),

    #[error("Upstream client: {0}")]
    Client(#[from] ClientError),

    #[error("Store: {0}")]
    Store(#[from] StoreError),

    #[error("Database connection: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Metrics recorder: {0}")]
    Metrics(String),

    #[error("Server: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use common::{ProductId, ShippingId};
    use purchasing::SagaError;

    use super::*;

    #[test]
    fn shipment_errors_map_to_statuses() {
        let (status, body) = ApiError::from(ShipmentError::NotFound(ShippingId::new(9))).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "not_found");

        let unknown = ShipmentError::UnknownLocality {
            postal_code: "Z9999".to_string(),
            locality_name: "Nowhere".to_string(),
        };
        let (status, _) = ApiError::from(unknown).parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = ApiError::from(ShipmentError::NoProducts).parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "validation_error");

        let blank = ShipmentError::Validation("delivery_address.street is required".to_string());
        let (status, _) = ApiError::from(blank).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = ShipmentError::Cost(CostError::Catalog(CatalogError::ProductNotFound(
            ProductId::new(7),
        )));
        let (status, body) = ApiError::from(missing).parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, "product_not_found");
    }

    #[test]
    fn store_failures_hide_details() {
        let err = ShipmentError::Store(StoreError::Database(sqlx::Error::PoolTimedOut));
        let (status, body) = ApiError::from(err).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "Internal server error");
    }

    #[test]
    fn locality_errors_map_to_statuses() {
        let (status, body) = ApiError::from(LocalityError::MissingParameters).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "missing_parameters");

        let missing = LocalityError::NotFound {
            postal_code: "H3500".to_string(),
            locality_name: "Atlantis".to_string(),
        };
        let (status, body) = ApiError::from(missing).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "not_found");
    }

    #[test]
    fn checkout_failures_keep_products_total() {
        let failure = CheckoutFailure::with_total(
            SagaError::ShippingUnavailable("down".to_string()),
            Money::from_cents(304_550),
        );
        let (status, body) = ApiError::from(failure).parts();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.code, "SHIPPING_SERVICE_UNAVAILABLE");
        assert_eq!(body.products_total, Some(Money::from_cents(304_550)));

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["productsTotal"], 3045.5);
    }

    #[test]
    fn checkout_codes_map_to_statuses() {
        assert_eq!(checkout_status("UNAUTHORIZED"), StatusCode::UNAUTHORIZED);
        assert_eq!(checkout_status("EMPTY_CART"), StatusCode::BAD_REQUEST);
        assert_eq!(checkout_status("INSUFFICIENT_STOCK"), StatusCode::CONFLICT);
        assert_eq!(
            checkout_status("STOCK_SERVICE_UNAVAILABLE"),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            checkout_status("SHIPPING_CREATION_FAILED"),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(checkout_status("INTERNAL"), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn cart_errors_map_to_statuses() {
        let (status, body) = ApiError::from(CartError::InvalidQuantity).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "VALIDATION");

        let (status, _) = ApiError::from(CartError::ItemNotFound(ProductId::new(3))).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = ApiError::from(IdentityError::Unauthenticated).parts();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
