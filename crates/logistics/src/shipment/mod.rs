//! Shipment lifecycle: creation, status changes and queries.

mod commands;
mod service;
mod state;
mod views;

pub use commands::{CreateShipment, UpdateStatus};
pub use service::{
    CANCELLED_MESSAGE, CREATED_MESSAGE, DEFAULT_STATUS_MESSAGE, PENDING_CARRIER, ShipmentService,
};
pub use state::{Transition, TransitionError, plan, plan_cancel};
pub use views::{
    ShipmentCancelled, ShipmentCreated, ShipmentSummary, ShipmentView, StatusUpdated,
};

use common::ShippingId;
use store::StoreError;
use thiserror::Error;

use crate::error::{CatalogError, CostError};

/// Errors from shipment lifecycle operations.
#[derive(Debug, Error)]
pub enum ShipmentError {
    /// The request is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A shipment was requested without any product lines.
    #[error("Products list cannot be empty")]
    NoProducts,

    /// The delivery address names a locality that is not registered.
    #[error("Unknown locality '{locality_name}' for postal code {postal_code}")]
    UnknownLocality {
        postal_code: String,
        locality_name: String,
    },

    #[error("Shipment {0} not found")]
    NotFound(ShippingId),

    /// The requested status change is not allowed from the current status.
    #[error("Shipment {shipping_id}: {source}")]
    InvalidTransition {
        shipping_id: ShippingId,
        source: TransitionError,
    },

    /// Concurrent writers kept winning the version race.
    #[error("Shipment {0} is being modified concurrently, retry later")]
    Contention(ShippingId),

    #[error("Cost calculation failed: {0}")]
    Cost(#[from] CostError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ShipmentError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ShipmentError::Validation(_) | ShipmentError::NoProducts => "validation_error",
            ShipmentError::UnknownLocality { .. } => "unknown_locality",
            ShipmentError::NotFound(_) => "not_found",
            ShipmentError::InvalidTransition { .. } => "invalid_state_transition",
            ShipmentError::Contention(_) => "concurrent_modification",
            ShipmentError::Cost(CostError::Catalog(CatalogError::ProductNotFound(_))) => {
                "product_not_found"
            }
            ShipmentError::Cost(CostError::Catalog(_)) => "catalog_unavailable",
            ShipmentError::Cost(_) => "validation_error",
            ShipmentError::Store(_) => "internal_error",
        }
    }
}
