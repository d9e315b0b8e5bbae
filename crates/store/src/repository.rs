use async_trait::async_trait;
use common::{AddressId, DistributionCenterId, ShippingId, TransportMethodId, TravelId, Version};

use crate::{
    Address, DistributionCenter, Locality, LocalityQuery, NewAddress, NewShipment, Result,
    ShipmentQuery, ShippingDetail, StatusChange, Travel,
};

/// Read access to the locality reference table.
#[async_trait]
pub trait LocalityRepository: Send + Sync {
    /// Returns every locality registered under the exact postal code.
    async fn localities_by_postal_code(&self, postal_code: &str) -> Result<Vec<Locality>>;

    /// Looks up a locality by its (postal code, name) key. Name comparison
    /// ignores case.
    async fn locality(&self, postal_code: &str, locality_name: &str) -> Result<Option<Locality>>;

    /// Returns one page of localities matching `query`, plus the total
    /// number of matches.
    async fn search_localities(&self, query: &LocalityQuery) -> Result<(Vec<Locality>, u64)>;
}

#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Returns the existing address whose four fields match exactly, or
    /// inserts a new one.
    async fn find_or_create_address(&self, fields: &NewAddress) -> Result<Address>;

    async fn address(&self, id: AddressId) -> Result<Option<Address>>;
}

#[async_trait]
pub trait DistributionCenterRepository: Send + Sync {
    /// Returns all centers ordered by id.
    async fn distribution_centers(&self) -> Result<Vec<DistributionCenter>>;

    async fn distribution_center(&self, id: DistributionCenterId)
    -> Result<Option<DistributionCenter>>;
}

#[async_trait]
pub trait TravelRepository: Send + Sync {
    /// Returns the travel for the (center, method) pair, creating it if needed.
    async fn find_or_create_travel(
        &self,
        center: DistributionCenterId,
        method: TransportMethodId,
    ) -> Result<Travel>;

    async fn travel(&self, id: TravelId) -> Result<Option<Travel>>;
}

/// Shipment persistence.
///
/// Shipments are never deleted. The only mutation is
/// [`apply_status_change`](ShipmentRepository::apply_status_change), which
/// is guarded by the row's [`Version`].
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Persists a new shipment in `created` status with its initial log.
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<ShippingDetail>;

    async fn shipment(&self, id: ShippingId) -> Result<Option<ShippingDetail>>;

    /// Sets the status and appends one log entry.
    ///
    /// Fails with `ConcurrencyConflict` if the stored version is not
    /// `expected`, and with `NotFound` if the shipment does not exist.
    async fn apply_status_change(
        &self,
        id: ShippingId,
        expected: Version,
        change: StatusChange,
    ) -> Result<ShippingDetail>;

    /// Returns one page of matching shipments, newest first, plus the total
    /// number of matches.
    async fn list_shipments(&self, query: &ShipmentQuery) -> Result<(Vec<ShippingDetail>, u64)>;
}

/// Everything the shipment lifecycle needs from storage.
pub trait LogisticsStore:
    LocalityRepository
    + AddressRepository
    + DistributionCenterRepository
    + TravelRepository
    + ShipmentRepository
{
}

impl<T> LogisticsStore for T where
    T: LocalityRepository
        + AddressRepository
        + DistributionCenterRepository
        + TravelRepository
        + ShipmentRepository
{
}
