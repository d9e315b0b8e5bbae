//! Purchasing error types.

use std::time::Duration;

use common::{Money, ProductId, ReservationId, ShippingId, UserId, Version};
use thiserror::Error;

use crate::orders::OrderStatus;

/// Errors from the stock and logistics HTTP clients.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The remote service answered with a 4xx status.
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Network failure or a 5xx answer.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("No answer within {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Builds the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if (400..500).contains(&status) {
            ClientError::Rejected { status, message }
        } else {
            ClientError::Unavailable(format!("status {status}: {message}"))
        }
    }

    /// True for failures where the remote side never gave a business answer.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, ClientError::Rejected { .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::InvalidResponse(e.to_string())
        } else {
            ClientError::Unavailable(e.to_string())
        }
    }
}

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Unit price must be greater than zero and at most 99999999.99")]
    InvalidPrice,

    #[error("Cart total exceeds the supported amount")]
    TotalTooLarge,

    #[error("Product {0} is not in the cart")]
    ItemNotFound(ProductId),

    /// The cart changed since it was loaded.
    #[error("Cart of user {user_id} changed: expected version {expected}, found {actual}")]
    Conflict {
        user_id: UserId,
        expected: Version,
        actual: Version,
    },

    #[error("Cart of user {0} is being modified concurrently, retry later")]
    Contention(UserId),

    #[error("Cart storage error: {0}")]
    Storage(String),
}

/// Errors from the order history.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order {0} not found")]
    NotFound(ReservationId),

    #[error("No order has shipment {0}")]
    ShipmentNotFound(ShippingId),

    #[error("Order {order_id} is {status}; only pending orders can be cancelled")]
    NotCancellable {
        order_id: ReservationId,
        status: OrderStatus,
    },

    #[error("Order storage error: {0}")]
    Storage(String),
}

/// Errors while resolving the caller to a local user.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("User directory error: {0}")]
    Directory(String),
}

/// Errors that abort a checkout.
#[derive(Debug, Error)]
pub enum SagaError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("The cart is empty")]
    EmptyCart,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Stock service unavailable: {0}")]
    StockUnavailable(String),

    /// Logistics refused the shipment.
    #[error("Shipment could not be created: {0}")]
    ShippingRejected(String),

    #[error("Logistics service unavailable: {0}")]
    ShippingUnavailable(String),

    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SagaError {
    /// Stable code returned to callers.
    pub fn code(&self) -> &'static str {
        match self {
            SagaError::Unauthenticated => "UNAUTHORIZED",
            SagaError::EmptyCart => "EMPTY_CART",
            SagaError::Validation(_) => "VALIDATION",
            SagaError::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            SagaError::StockUnavailable(_) => "STOCK_SERVICE_UNAVAILABLE",
            SagaError::ShippingRejected(_) => "SHIPPING_CREATION_FAILED",
            SagaError::ShippingUnavailable(_) => "SHIPPING_SERVICE_UNAVAILABLE",
            SagaError::Cart(_) | SagaError::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn from_stock(e: ClientError) -> Self {
        match e {
            ClientError::Rejected { message, .. } => SagaError::InsufficientStock(message),
            other => SagaError::StockUnavailable(other.to_string()),
        }
    }

    pub(crate) fn from_shipping(e: ClientError) -> Self {
        match e {
            ClientError::Rejected { message, .. } => SagaError::ShippingRejected(message),
            other => SagaError::ShippingUnavailable(other.to_string()),
        }
    }
}

impl From<IdentityError> for SagaError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Unauthenticated => SagaError::Unauthenticated,
            IdentityError::Directory(msg) => SagaError::Internal(msg),
        }
    }
}

/// A failed checkout. Carries the products total when it was computed
/// before the failure.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CheckoutFailure {
    #[source]
    pub error: SagaError,
    pub products_total: Option<Money>,
}

impl CheckoutFailure {
    pub fn new(error: SagaError) -> Self {
        Self {
            error,
            products_total: None,
        }
    }

    pub fn with_total(error: SagaError, products_total: Money) -> Self {
        Self {
            error,
            products_total: Some(products_total),
        }
    }

    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

impl From<SagaError> for CheckoutFailure {
    fn from(error: SagaError) -> Self {
        Self::new(error)
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutFailure>;
