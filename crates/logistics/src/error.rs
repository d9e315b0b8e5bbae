//! Logistics error types.

use common::ProductId;
use thiserror::Error;

/// Errors from the product catalog collaborator.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product {0} not found in catalog")]
    ProductNotFound(ProductId),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
}

/// Errors while pricing a shipment.
#[derive(Debug, Error)]
pub enum CostError {
    #[error("At least one product is required")]
    NoProducts,

    #[error("Quantity for product {0} must be greater than zero")]
    InvalidQuantity(ProductId),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors while notifying purchasing about a shipment change.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Purchasing rejected the notification: {0}")]
    Rejected(String),
}
