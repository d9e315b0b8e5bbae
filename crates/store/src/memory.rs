use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    AddressId, DistributionCenterId, ShippingId, TransportMethodId, TravelId, Version,
};
use tokio::sync::RwLock;

use crate::{
    Address, AddressRepository, DistributionCenter, DistributionCenterRepository, Locality,
    LocalityQuery, LocalityRepository, NewAddress, NewShipment, ReferenceData, Result,
    ShipmentQuery,
    ShipmentRepository, ShippingDetail, StatusChange, StoreError, Travel, TravelRepository,
};

#[derive(Debug, Default)]
struct State {
    localities: Vec<Locality>,
    addresses: Vec<Address>,
    centers: BTreeMap<DistributionCenterId, DistributionCenter>,
    travels: Vec<Travel>,
    shipments: BTreeMap<ShippingId, ShippingDetail>,
    next_address_id: i64,
    next_travel_id: i64,
    next_shipping_id: i64,
}

impl State {
    fn find_or_create_address(&mut self, fields: &NewAddress) -> Address {
        if let Some(existing) = self.addresses.iter().find(|a| fields.matches(a)) {
            return existing.clone();
        }
        self.next_address_id += 1;
        let address = Address {
            id: AddressId::new(self.next_address_id),
            street: fields.street.clone(),
            number: fields.number,
            postal_code: fields.postal_code.clone(),
            locality_name: fields.locality_name.clone(),
        };
        self.addresses.push(address.clone());
        address
    }
}

/// In-memory logistics store for tests and local runs.
///
/// Provides the same interface and concurrency semantics as the
/// PostgreSQL implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogisticsStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryLogisticsStore {
    /// Creates a new empty store with no reference data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with localities and distribution centers.
    pub fn with_reference_data(data: &ReferenceData) -> Self {
        let mut state = State {
            localities: data.localities.clone(),
            ..State::default()
        };
        for seed in &data.distribution_centers {
            let address = seed
                .address
                .as_ref()
                .map(|fields| state.find_or_create_address(fields));
            state.centers.insert(
                seed.id,
                DistributionCenter {
                    id: seed.id,
                    name: seed.name.clone(),
                    address,
                },
            );
        }
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Returns the number of stored shipments.
    pub async fn shipment_count(&self) -> usize {
        self.state.read().await.shipments.len()
    }

    /// Returns the number of stored addresses.
    pub async fn address_count(&self) -> usize {
        self.state.read().await.addresses.len()
    }
}

#[async_trait]
impl LocalityRepository for InMemoryLogisticsStore {
    async fn localities_by_postal_code(&self, postal_code: &str) -> Result<Vec<Locality>> {
        let state = self.state.read().await;
        Ok(state
            .localities
            .iter()
            .filter(|l| l.postal_code == postal_code)
            .cloned()
            .collect())
    }

    async fn locality(&self, postal_code: &str, locality_name: &str) -> Result<Option<Locality>> {
        let state = self.state.read().await;
        Ok(state
            .localities
            .iter()
            .find(|l| {
                l.postal_code == postal_code && l.locality_name.eq_ignore_ascii_case(locality_name)
            })
            .cloned())
    }

    async fn search_localities(&self, query: &LocalityQuery) -> Result<(Vec<Locality>, u64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&Locality> =
            state.localities.iter().filter(|l| query.matches(l)).collect();
        matching.sort_by(|a, b| {
            a.state
                .to_uppercase()
                .cmp(&b.state.to_uppercase())
                .then_with(|| a.locality_name.cmp(&b.locality_name))
                .then_with(|| a.postal_code.cmp(&b.postal_code))
        });

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl AddressRepository for InMemoryLogisticsStore {
    async fn find_or_create_address(&self, fields: &NewAddress) -> Result<Address> {
        Ok(self.state.write().await.find_or_create_address(fields))
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        let state = self.state.read().await;
        Ok(state.addresses.iter().find(|a| a.id == id).cloned())
    }
}

#[async_trait]
impl DistributionCenterRepository for InMemoryLogisticsStore {
    async fn distribution_centers(&self) -> Result<Vec<DistributionCenter>> {
        Ok(self.state.read().await.centers.values().cloned().collect())
    }

    async fn distribution_center(
        &self,
        id: DistributionCenterId,
    ) -> Result<Option<DistributionCenter>> {
        Ok(self.state.read().await.centers.get(&id).cloned())
    }
}

#[async_trait]
impl TravelRepository for InMemoryLogisticsStore {
    async fn find_or_create_travel(
        &self,
        center: DistributionCenterId,
        method: TransportMethodId,
    ) -> Result<Travel> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .travels
            .iter()
            .find(|t| t.distribution_center_id == center && t.transport_method_id == method)
        {
            return Ok(existing.clone());
        }
        state.next_travel_id += 1;
        let travel = Travel {
            id: TravelId::new(state.next_travel_id),
            distribution_center_id: center,
            transport_method_id: method,
            created_at: Utc::now(),
        };
        state.travels.push(travel.clone());
        Ok(travel)
    }

    async fn travel(&self, id: TravelId) -> Result<Option<Travel>> {
        let state = self.state.read().await;
        Ok(state.travels.iter().find(|t| t.id == id).cloned())
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryLogisticsStore {
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<ShippingDetail> {
        let mut state = self.state.write().await;
        state.next_shipping_id += 1;
        let id = ShippingId::new(state.next_shipping_id);
        let detail = ShippingDetail::from_new(id, shipment);
        state.shipments.insert(id, detail.clone());
        Ok(detail)
    }

    async fn shipment(&self, id: ShippingId) -> Result<Option<ShippingDetail>> {
        Ok(self.state.read().await.shipments.get(&id).cloned())
    }

    async fn apply_status_change(
        &self,
        id: ShippingId,
        expected: Version,
        change: StatusChange,
    ) -> Result<ShippingDetail> {
        let mut state = self.state.write().await;
        let detail = state
            .shipments
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "shipment",
                id: id.to_string(),
            })?;

        if detail.version != expected {
            return Err(StoreError::ConcurrencyConflict {
                entity: "shipment",
                id: id.to_string(),
                expected,
                actual: detail.version,
            });
        }

        detail.apply(change);
        Ok(detail.clone())
    }

    async fn list_shipments(&self, query: &ShipmentQuery) -> Result<(Vec<ShippingDetail>, u64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&ShippingDetail> = state
            .shipments
            .values()
            .filter(|s| query.matches(s.user_id, s.status, s.created_at))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit() as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use common::{Money, PageRequest, ProductId, ReservationId, ShippingStatus, UserId};
    use uuid::Uuid;

    use super::*;
    use crate::ProductLine;

    fn new_shipment(user: i64) -> NewShipment {
        NewShipment {
            order_id: ReservationId::new(100 + user),
            user_id: UserId::new(user),
            travel_id: TravelId::new(1),
            delivery_address_id: AddressId::new(1),
            products: vec![ProductLine {
                product_id: ProductId::new(1),
                quantity: 1,
            }],
            total_cost: Money::from_cents(12_345),
            currency: "ARS".to_string(),
            tracking_number: Uuid::new_v4(),
            carrier_name: "PENDING".to_string(),
            created_at: Utc::now(),
            estimated_delivery_at: Utc::now() + Duration::days(7),
            initial_log: "Shipping created.".to_string(),
        }
    }

    fn change(status: ShippingStatus) -> StatusChange {
        StatusChange {
            status,
            message: format!("now {status}"),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn seeded_store_exposes_reference_data() {
        let store = InMemoryLogisticsStore::with_reference_data(&ReferenceData::builtin());

        let moron = store.localities_by_postal_code("B1708").await.unwrap();
        assert_eq!(moron.len(), 2);

        let resistencia = store.locality("H3500", "resistencia").await.unwrap();
        assert!(resistencia.is_some());

        let centers = store.distribution_centers().await.unwrap();
        assert_eq!(centers.len(), 3);
        assert_eq!(centers[0].id, DistributionCenterId::new(1));
        assert_eq!(store.address_count().await, 3);
    }

    #[tokio::test]
    async fn locality_search_filters_sorts_and_pages() {
        let store = InMemoryLogisticsStore::with_reference_data(&ReferenceData::builtin());

        let (found, total) = store
            .search_localities(&LocalityQuery::new().state("buenos aires"))
            .await
            .unwrap();
        assert_eq!(total, 2);
        let names: Vec<_> = found.iter().map(|l| l.locality_name.as_str()).collect();
        assert_eq!(names, ["Haedo", "Moron"]);

        let (second, total) = store
            .search_localities(
                &LocalityQuery::new()
                    .postal_code("B1708")
                    .page(PageRequest::new(Some(2), Some(1))),
            )
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(second[0].locality_name, "Moron");

        let (none, total) = store
            .search_localities(&LocalityQuery::new().locality_name("atlantis"))
            .await
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn address_is_deduplicated_on_exact_match() {
        let store = InMemoryLogisticsStore::new();
        let fields = NewAddress {
            street: "Av. Siempre Viva".to_string(),
            number: 742,
            postal_code: "H3500".to_string(),
            locality_name: "Resistencia".to_string(),
        };

        let first = store.find_or_create_address(&fields).await.unwrap();
        let second = store.find_or_create_address(&fields).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = NewAddress {
            number: 743,
            ..fields
        };
        let third = store.find_or_create_address(&other).await.unwrap();
        assert_ne!(first.id, third.id);
        assert_eq!(store.address_count().await, 2);
    }

    #[tokio::test]
    async fn travel_is_reused_per_center_and_method() {
        let store = InMemoryLogisticsStore::new();
        let center = DistributionCenterId::new(1);

        let road = store
            .find_or_create_travel(center, TransportMethodId::new(1))
            .await
            .unwrap();
        let again = store
            .find_or_create_travel(center, TransportMethodId::new(1))
            .await
            .unwrap();
        let air = store
            .find_or_create_travel(center, TransportMethodId::new(2001))
            .await
            .unwrap();

        assert_eq!(road.id, again.id);
        assert_ne!(road.id, air.id);
        assert_eq!(store.travel(air.id).await.unwrap(), Some(air));
    }

    #[tokio::test]
    async fn status_change_checks_version() {
        let store = InMemoryLogisticsStore::new();
        let detail = store.insert_shipment(new_shipment(1)).await.unwrap();

        let updated = store
            .apply_status_change(detail.id, detail.version, change(ShippingStatus::Reserved))
            .await
            .unwrap();
        assert_eq!(updated.version, Version::new(2));
        assert_eq!(updated.logs.len(), 2);

        let stale = store
            .apply_status_change(detail.id, detail.version, change(ShippingStatus::InTransit))
            .await;
        assert!(matches!(
            stale,
            Err(StoreError::ConcurrencyConflict { expected, actual, .. })
                if expected == Version::new(1) && actual == Version::new(2)
        ));

        let stored = store.shipment(detail.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ShippingStatus::Reserved);
    }

    #[tokio::test]
    async fn status_change_on_missing_shipment_is_not_found() {
        let store = InMemoryLogisticsStore::new();
        let result = store
            .apply_status_change(
                ShippingId::new(99),
                Version::first(),
                change(ShippingStatus::Reserved),
            )
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn list_filters_paginates_and_orders_newest_first() {
        let store = InMemoryLogisticsStore::new();
        for user in [1, 2, 1, 1] {
            store.insert_shipment(new_shipment(user)).await.unwrap();
        }

        let (items, total) = store
            .list_shipments(&ShipmentQuery::new().user_id(UserId::new(1)))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(items.iter().all(|s| s.user_id == UserId::new(1)));
        assert!(items.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let (page, total) = store
            .list_shipments(&ShipmentQuery::new().page(PageRequest::new(Some(2), Some(3))))
            .await
            .unwrap();
        assert_eq!(total, 4);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, ShippingId::new(1));
    }
}
