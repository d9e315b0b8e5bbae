//! Shipping engine for the logistics service.
//!
//! This crate provides:
//! - Distance estimation between postal codes (centroid + haversine)
//! - Shipping cost quotes from catalog dimensions
//! - Nearest distribution center selection
//! - Locality lookup by postal code, name or state
//! - The shipment lifecycle: creation, status state machine and queries
//! - Cancellation notices back to purchasing

pub mod catalog;
pub mod centers;
pub mod cost;
pub mod error;
pub mod geo;
pub mod localities;
pub mod notifier;
pub mod shipment;
pub mod transport;

pub use catalog::{CatalogClient, HttpCatalogClient, ProductDimensions, StaticCatalog};
pub use centers::{DEFAULT_CENTER_ID, nearest_center};
pub use cost::{CURRENCY, CostCalculator, DEFAULT_ORIGIN_POSTAL_CODE, ProductCost, Quote};
pub use error::{CatalogError, CostError, NotifyError};
pub use geo::{DistanceEstimator, FALLBACK_DISTANCE_KM, GeoPoint, haversine_km};
pub use localities::{LocalityDirectory, LocalityError, LocalityLookup};
pub use notifier::{
    HttpPurchasingNotifier, InMemoryPurchasingNotifier, LoggingNotifier, PurchasingNotifier,
    ShipmentCancelledNotice,
};
pub use shipment::{
    CreateShipment, ShipmentCancelled, ShipmentCreated, ShipmentError, ShipmentService,
    ShipmentSummary, ShipmentView, StatusUpdated, UpdateStatus,
};
pub use transport::{TransportMethod, transport_methods};
