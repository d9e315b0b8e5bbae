//! Persistence for the logistics service.
//!
//! Reference data (localities, distribution centers), deduplicated
//! addresses, travels and shipments with their append-only status log.
//! Two implementations share one set of repository traits: an in-memory
//! store for tests and local runs, and a PostgreSQL store.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod query;
pub mod reference;
pub mod repository;

pub use error::{Result, StoreError};
pub use memory::InMemoryLogisticsStore;
pub use model::{
    Address, DistributionCenter, Locality, NewAddress, NewShipment, ProductLine, ShippingDetail,
    ShippingLog, StatusChange, Travel,
};
pub use postgres::PostgresLogisticsStore;
pub use query::{LocalityQuery, ShipmentQuery};
pub use reference::{DistributionCenterSeed, ReferenceData};
pub use repository::{
    AddressRepository, DistributionCenterRepository, LocalityRepository, LogisticsStore,
    ShipmentRepository, TravelRepository,
};
