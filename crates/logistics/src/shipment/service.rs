//! Shipment service providing the lifecycle operations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use common::{Paginated, ShippingId, ShippingStatus, TransportType, TravelId};
use store::{
    Address, LogisticsStore, NewShipment, ProductLine, ShipmentQuery, ShippingDetail,
    StatusChange, StoreError,
};
use uuid::Uuid;

use crate::catalog::CatalogClient;
use crate::centers::nearest_center;
use crate::cost::{CostCalculator, Quote};
use crate::geo::{DistanceEstimator, normalize_postal_code};
use crate::notifier::{PurchasingNotifier, ShipmentCancelledNotice};
use crate::transport::{method_id, transport_type_for};

use super::{
    CreateShipment, ShipmentCancelled, ShipmentCreated, ShipmentError, ShipmentSummary,
    ShipmentView, StatusUpdated, Transition, UpdateStatus, plan, plan_cancel,
};

/// Log line recorded when a shipment is created.
pub const CREATED_MESSAGE: &str = "Shipping created.";

/// Log line recorded by an explicit cancel.
pub const CANCELLED_MESSAGE: &str = "The shipment was cancelled.";

/// Log line recorded by an operator status change without a message.
pub const DEFAULT_STATUS_MESSAGE: &str = "Status updated by logistics operator.";

/// Carrier assigned until a real one is chosen.
pub const PENDING_CARRIER: &str = "PENDING";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Outcome of a version-checked mutation.
struct Mutation {
    previous: ShippingStatus,
    detail: ShippingDetail,
    changed: bool,
}

/// Creates shipments and drives them through the status state machine.
///
/// Every status mutation is a compare-and-swap on the shipment version. On a
/// lost race the shipment is reloaded, the guards are evaluated again and the
/// write is retried, up to a bounded number of attempts.
pub struct ShipmentService<S, C, N> {
    store: S,
    costs: CostCalculator<S, C>,
    notifier: Arc<N>,
    max_attempts: u32,
}

impl<S, C, N> ShipmentService<S, C, N>
where
    S: LogisticsStore + Clone,
    C: CatalogClient,
    N: PurchasingNotifier + 'static,
{
    pub fn new(store: S, catalog: C, notifier: N) -> Self {
        let costs = CostCalculator::new(DistanceEstimator::new(store.clone()), catalog);
        Self {
            store,
            costs,
            notifier: Arc::new(notifier),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many times a mutation is attempted before giving up.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Prices `lines` without persisting anything.
    pub async fn quote(
        &self,
        delivery_postal_code: &str,
        transport: Option<TransportType>,
        lines: &[ProductLine],
    ) -> Result<Quote, ShipmentError> {
        Ok(self
            .costs
            .quote(delivery_postal_code, transport, lines)
            .await?)
    }

    /// Creates a shipment in `created` status.
    #[tracing::instrument(skip(self, cmd), fields(order_id = %cmd.order_id, user_id = %cmd.user_id))]
    pub async fn create(&self, cmd: CreateShipment) -> Result<ShipmentCreated, ShipmentError> {
        cmd.validate()?;

        let quote = self
            .costs
            .quote(
                &cmd.delivery_address.postal_code,
                cmd.transport_type,
                &cmd.products,
            )
            .await?;

        let address = self
            .store
            .find_or_create_address(&cmd.delivery_address)
            .await?;
        self.resolve_locality(&address).await?;

        let centers = self.store.distribution_centers().await?;
        let center = nearest_center(self.costs.distance(), &address.postal_code, &centers).await;

        let travel = self
            .store
            .find_or_create_travel(center, method_id(quote.transport_type))
            .await?;

        let now = Utc::now();
        let detail = self
            .store
            .insert_shipment(NewShipment {
                order_id: cmd.order_id,
                user_id: cmd.user_id,
                travel_id: travel.id,
                delivery_address_id: address.id,
                products: cmd.products,
                total_cost: quote.total_cost,
                currency: quote.currency.clone(),
                tracking_number: Uuid::new_v4(),
                carrier_name: PENDING_CARRIER.to_string(),
                created_at: now,
                estimated_delivery_at: quote.estimated_delivery_at,
                initial_log: CREATED_MESSAGE.to_string(),
            })
            .await?;

        metrics::counter!(
            "shipments_created_total",
            "transport_type" => quote.transport_type.as_str()
        )
        .increment(1);
        tracing::info!(
            shipping_id = %detail.id,
            center = %center,
            total_cost = %detail.total_cost,
            "shipment created"
        );

        Ok(ShipmentCreated {
            shipping_id: detail.id,
            status: detail.status,
            transport_type: quote.transport_type,
            estimated_delivery_at: detail.estimated_delivery_at,
            total_cost: detail.total_cost,
            currency: detail.currency,
        })
    }

    /// Full detail of one shipment.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: ShippingId) -> Result<ShipmentView, ShipmentError> {
        let detail = self.load(id).await?;

        let travel = self.store.travel(detail.travel_id).await?;
        let transport = travel
            .as_ref()
            .and_then(|t| transport_type_for(t.transport_method_id));
        let departure_address = match &travel {
            Some(travel) => self
                .store
                .distribution_center(travel.distribution_center_id)
                .await?
                .and_then(|center| center.address),
            None => None,
        };
        let delivery_address = self.store.address(detail.delivery_address_id).await?;

        Ok(ShipmentView::new(
            detail,
            transport,
            delivery_address,
            departure_address,
        ))
    }

    /// One page of shipments matching `query`, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list(
        &self,
        query: &ShipmentQuery,
    ) -> Result<Paginated<ShipmentSummary>, ShipmentError> {
        let (rows, total) = self.store.list_shipments(query).await?;

        let mut transports: HashMap<TravelId, Option<TransportType>> = HashMap::new();
        let mut items = Vec::with_capacity(rows.len());
        for detail in rows {
            let transport = match transports.get(&detail.travel_id) {
                Some(cached) => *cached,
                None => {
                    let found = self
                        .store
                        .travel(detail.travel_id)
                        .await?
                        .and_then(|t| transport_type_for(t.transport_method_id));
                    transports.insert(detail.travel_id, found);
                    found
                }
            };
            items.push(ShipmentSummary::new(detail, transport));
        }

        Ok(Paginated::new(items, query.page, total))
    }

    /// Cancels a shipment and notifies purchasing in the background.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: ShippingId) -> Result<ShipmentCancelled, ShipmentError> {
        let outcome = self.cancel_with(id, CANCELLED_MESSAGE).await?;
        Ok(ShipmentCancelled {
            shipping_id: outcome.detail.id,
            status: outcome.detail.status,
            cancelled_at: outcome.detail.updated_at,
        })
    }

    /// Operator-driven status change. Moving to `cancelled` goes through the
    /// cancel path so purchasing is notified.
    #[tracing::instrument(skip(self, cmd), fields(shipping_id = %cmd.shipping_id, new_status = %cmd.new_status))]
    pub async fn update_status(&self, cmd: UpdateStatus) -> Result<StatusUpdated, ShipmentError> {
        let id = cmd.shipping_id;
        let target = cmd.new_status;
        let message = cmd
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STATUS_MESSAGE.to_string());

        let outcome = if target == ShippingStatus::Cancelled {
            self.cancel_with(id, &message).await?
        } else {
            self.mutate(id, |detail| {
                match plan(detail.status, target) {
                    Ok(Transition::NoOp) => Ok(None),
                    Ok(_) => Ok(Some(StatusChange {
                        status: target,
                        message: message.clone(),
                        at: Utc::now(),
                    })),
                    Err(source) => Err(ShipmentError::InvalidTransition {
                        shipping_id: id,
                        source,
                    }),
                }
            })
            .await?
        };

        Ok(StatusUpdated {
            shipping_id: id,
            previous_status: outcome.previous,
            status: outcome.detail.status,
            updated_at: outcome.detail.updated_at,
            changed: outcome.changed,
        })
    }

    async fn cancel_with(&self, id: ShippingId, message: &str) -> Result<Mutation, ShipmentError> {
        let outcome = self
            .mutate(id, |detail| {
                plan_cancel(detail.status).map_err(|source| ShipmentError::InvalidTransition {
                    shipping_id: id,
                    source,
                })?;
                Ok(Some(StatusChange {
                    status: ShippingStatus::Cancelled,
                    message: message.to_string(),
                    at: Utc::now(),
                }))
            })
            .await?;

        self.notify_cancelled(&outcome.detail);
        Ok(outcome)
    }

    /// Sends the cancellation notice without waiting for it. Failures are
    /// logged; the cancellation stands.
    fn notify_cancelled(&self, detail: &ShippingDetail) {
        let notice = ShipmentCancelledNotice {
            shipping_id: detail.id,
            order_id: detail.order_id,
            cancelled_at: detail.updated_at,
        };
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.shipment_cancelled(notice).await {
                metrics::counter!("cancellation_notice_failed_total").increment(1);
                tracing::warn!(
                    shipping_id = %notice.shipping_id,
                    error = %e,
                    "failed to notify purchasing about cancelled shipment"
                );
            }
        });
    }

    /// Loads the shipment, lets `decide` pick a change and writes it against
    /// the loaded version. `Ok(None)` from `decide` means nothing to do.
    async fn mutate<F>(&self, id: ShippingId, decide: F) -> Result<Mutation, ShipmentError>
    where
        F: Fn(&ShippingDetail) -> Result<Option<StatusChange>, ShipmentError>,
    {
        for attempt in 1..=self.max_attempts {
            let current = self.load(id).await?;
            let previous = current.status;

            let Some(change) = decide(&current)? else {
                return Ok(Mutation {
                    previous,
                    detail: current,
                    changed: false,
                });
            };
            let status = change.status;

            match self
                .store
                .apply_status_change(id, current.version, change)
                .await
            {
                Ok(detail) => {
                    metrics::counter!(
                        "shipment_transitions_total",
                        "from" => previous.as_str(),
                        "to" => status.as_str()
                    )
                    .increment(1);
                    tracing::info!(%previous, %status, "shipment status changed");
                    return Ok(Mutation {
                        previous,
                        detail,
                        changed: true,
                    });
                }
                Err(StoreError::ConcurrencyConflict { .. }) => {
                    tracing::debug!(attempt, "version conflict, reloading shipment");
                }
                Err(StoreError::NotFound { .. }) => return Err(ShipmentError::NotFound(id)),
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(attempts = self.max_attempts, "giving up after repeated version conflicts");
        Err(ShipmentError::Contention(id))
    }

    async fn load(&self, id: ShippingId) -> Result<ShippingDetail, ShipmentError> {
        self.store
            .shipment(id)
            .await?
            .ok_or(ShipmentError::NotFound(id))
    }

    /// The delivery locality must be registered, either under the postal
    /// code as given or under its normalized form.
    async fn resolve_locality(&self, address: &Address) -> Result<(), ShipmentError> {
        let raw = address.postal_code.trim();
        if self
            .store
            .locality(raw, &address.locality_name)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let normalized = normalize_postal_code(raw);
        if normalized != raw
            && self
                .store
                .locality(&normalized, &address.locality_name)
                .await?
                .is_some()
        {
            return Ok(());
        }

        Err(ShipmentError::UnknownLocality {
            postal_code: address.postal_code.clone(),
            locality_name: address.locality_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use common::{ProductId, ReservationId, UserId};
    use store::{InMemoryLogisticsStore, NewAddress, ReferenceData};

    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::notifier::InMemoryPurchasingNotifier;

    type Service = ShipmentService<InMemoryLogisticsStore, StaticCatalog, InMemoryPurchasingNotifier>;

    fn service() -> (Service, InMemoryPurchasingNotifier) {
        let store = InMemoryLogisticsStore::with_reference_data(&ReferenceData::builtin());
        let notifier = InMemoryPurchasingNotifier::new();
        let svc = ShipmentService::new(store, StaticCatalog::new(), notifier.clone());
        (svc, notifier)
    }

    fn create_cmd(postal_code: &str, locality: &str) -> CreateShipment {
        CreateShipment {
            order_id: ReservationId::new(77),
            user_id: UserId::new(5),
            delivery_address: NewAddress {
                street: "Av. Siempre Viva".to_string(),
                number: 742,
                postal_code: postal_code.to_string(),
                locality_name: locality.to_string(),
            },
            transport_type: Some(TransportType::Road),
            products: vec![ProductLine {
                product_id: ProductId::new(1),
                quantity: 2,
            }],
        }
    }

    #[tokio::test]
    async fn create_persists_created_shipment() {
        let (svc, _) = service();
        let created = svc.create(create_cmd("H3500", "Resistencia")).await.unwrap();

        assert_eq!(created.status, ShippingStatus::Created);
        assert_eq!(created.transport_type, TransportType::Road);
        assert_eq!(created.currency, "ARS");

        let view = svc.get(created.shipping_id).await.unwrap();
        assert_eq!(view.carrier_name, PENDING_CARRIER);
        assert_eq!(view.logs.len(), 1);
        assert_eq!(view.logs[0].message, CREATED_MESSAGE);
        assert_eq!(view.transport_type, Some(TransportType::Road));
        // nearest center to Resistencia is the Resistencia hub
        assert_eq!(
            view.departure_address.map(|a| a.postal_code),
            Some("H3500".to_string())
        );
    }

    #[tokio::test]
    async fn create_rejects_unknown_locality() {
        let (svc, _) = service();
        let err = svc
            .create(create_cmd("H3500", "Atlantis"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShipmentError::UnknownLocality { .. }));
        assert_eq!(err.code(), "unknown_locality");
        assert_eq!(svc.store().shipment_count().await, 0);
    }

    #[tokio::test]
    async fn create_accepts_long_postal_code() {
        let (svc, _) = service();
        let created = svc
            .create(create_cmd("H3500ABC", "resistencia"))
            .await
            .unwrap();
        assert_eq!(created.status, ShippingStatus::Created);
    }

    #[tokio::test]
    async fn cancel_notifies_purchasing() {
        let (svc, notifier) = service();
        let created = svc.create(create_cmd("H3500", "Resistencia")).await.unwrap();

        let cancelled = svc.cancel(created.shipping_id).await.unwrap();
        assert_eq!(cancelled.status, ShippingStatus::Cancelled);

        assert!(notifier.wait_for(1, Duration::from_secs(1)).await);
        assert_eq!(notifier.sent()[0].order_id, ReservationId::new(77));
    }

    #[tokio::test]
    async fn notifier_failure_keeps_cancellation() {
        let (svc, notifier) = service();
        notifier.set_fail(true);
        let created = svc.create(create_cmd("H3500", "Resistencia")).await.unwrap();

        svc.cancel(created.shipping_id).await.unwrap();
        let view = svc.get(created.shipping_id).await.unwrap();
        assert_eq!(view.status, ShippingStatus::Cancelled);
    }

    #[tokio::test]
    async fn same_status_is_noop() {
        let (svc, _) = service();
        let created = svc.create(create_cmd("H3500", "Resistencia")).await.unwrap();

        let updated = svc
            .update_status(UpdateStatus::new(created.shipping_id, ShippingStatus::Created))
            .await
            .unwrap();
        assert!(!updated.changed);
        assert_eq!(svc.get(created.shipping_id).await.unwrap().logs.len(), 1);
    }

    #[tokio::test]
    async fn missing_shipment_is_not_found() {
        let (svc, _) = service();
        let err = svc.cancel(ShippingId::new(404)).await.unwrap_err();
        assert!(matches!(err, ShipmentError::NotFound(_)));
    }
}
