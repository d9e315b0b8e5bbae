//! Read models returned by the shipment service.

use chrono::{DateTime, Utc};
use common::{Money, ReservationId, ShippingId, ShippingStatus, TransportType, UserId};
use serde::Serialize;
use store::{Address, ProductLine, ShippingDetail, ShippingLog};
use uuid::Uuid;

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentCreated {
    pub shipping_id: ShippingId,
    pub status: ShippingStatus,
    pub transport_type: TransportType,
    pub estimated_delivery_at: DateTime<Utc>,
    pub total_cost: Money,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShipmentCancelled {
    pub shipping_id: ShippingId,
    pub status: ShippingStatus,
    pub cancelled_at: DateTime<Utc>,
}

/// Result of an operator status change. `changed` is false when the
/// shipment already had the requested status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdated {
    pub shipping_id: ShippingId,
    pub previous_status: ShippingStatus,
    pub status: ShippingStatus,
    pub updated_at: DateTime<Utc>,
    pub changed: bool,
}

/// Full shipment detail with its addresses and history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentView {
    pub shipping_id: ShippingId,
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub status: ShippingStatus,
    pub transport_type: Option<TransportType>,
    pub products: Vec<ProductLine>,
    pub total_cost: Money,
    pub currency: String,
    pub tracking_number: Uuid,
    pub carrier_name: String,
    pub delivery_address: Option<Address>,
    /// Address of the distribution center the shipment leaves from.
    pub departure_address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub logs: Vec<ShippingLog>,
}

impl ShipmentView {
    pub(crate) fn new(
        detail: ShippingDetail,
        transport_type: Option<TransportType>,
        delivery_address: Option<Address>,
        departure_address: Option<Address>,
    ) -> Self {
        let mut logs = detail.logs;
        logs.sort_by_key(|log| log.timestamp);
        Self {
            shipping_id: detail.id,
            order_id: detail.order_id,
            user_id: detail.user_id,
            status: detail.status,
            transport_type,
            products: detail.products,
            total_cost: detail.total_cost,
            currency: detail.currency,
            tracking_number: detail.tracking_number,
            carrier_name: detail.carrier_name,
            delivery_address,
            departure_address,
            created_at: detail.created_at,
            updated_at: detail.updated_at,
            estimated_delivery_at: detail.estimated_delivery_at,
            logs,
        }
    }
}

/// One row of a shipment listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentSummary {
    pub shipping_id: ShippingId,
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub status: ShippingStatus,
    pub transport_type: Option<TransportType>,
    pub total_cost: Money,
    pub currency: String,
    pub products: Vec<ProductLine>,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
}

impl ShipmentSummary {
    pub(crate) fn new(detail: ShippingDetail, transport_type: Option<TransportType>) -> Self {
        Self {
            shipping_id: detail.id,
            order_id: detail.order_id,
            user_id: detail.user_id,
            status: detail.status,
            transport_type,
            total_cost: detail.total_cost,
            currency: detail.currency,
            products: detail.products,
            created_at: detail.created_at,
            estimated_delivery_at: detail.estimated_delivery_at,
        }
    }
}
