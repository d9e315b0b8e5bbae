//! Rows owned by the logistics service.

use chrono::{DateTime, Utc};
use common::{
    AddressId, DistributionCenterId, Money, ProductId, ReservationId, ShippingId, ShippingStatus,
    TransportMethodId, TravelId, UserId, Version,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named place with coordinates. Several localities may share a postal code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locality {
    pub postal_code: String,
    pub locality_name: String,
    pub lat: f64,
    pub lon: f64,
    pub state: String,
    pub country: String,
}

/// Address fields as submitted by a caller, before deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewAddress {
    pub street: String,
    pub number: i32,
    pub postal_code: String,
    pub locality_name: String,
}

impl NewAddress {
    /// True if every field matches exactly.
    pub fn matches(&self, address: &Address) -> bool {
        self.street == address.street
            && self.number == address.number
            && self.postal_code == address.postal_code
            && self.locality_name == address.locality_name
    }
}

/// A persisted, deduplicated address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub street: String,
    pub number: i32,
    pub postal_code: String,
    pub locality_name: String,
}

/// Warehouse that shipments depart from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionCenter {
    pub id: DistributionCenterId,
    pub name: String,
    pub address: Option<Address>,
}

/// Reusable trip record for a (distribution center, transport method) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travel {
    pub id: TravelId,
    pub distribution_center_id: DistributionCenterId,
    pub transport_method_id: TransportMethodId,
    pub created_at: DateTime<Utc>,
}

/// A product and quantity attached to a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// One entry in a shipment's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLog {
    pub timestamp: DateTime<Utc>,
    pub status: ShippingStatus,
    pub message: String,
}

/// Everything needed to persist a new shipment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShipment {
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub travel_id: TravelId,
    pub delivery_address_id: AddressId,
    pub products: Vec<ProductLine>,
    pub total_cost: Money,
    pub currency: String,
    pub tracking_number: Uuid,
    pub carrier_name: String,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub initial_log: String,
}

/// The shipment aggregate as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingDetail {
    pub id: ShippingId,
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub travel_id: TravelId,
    pub delivery_address_id: AddressId,
    pub products: Vec<ProductLine>,
    pub status: ShippingStatus,
    pub total_cost: Money,
    pub currency: String,
    pub tracking_number: Uuid,
    pub carrier_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_delivery_at: DateTime<Utc>,
    pub logs: Vec<ShippingLog>,
    pub version: Version,
}

impl ShippingDetail {
    /// Builds the row a freshly inserted shipment reads back as.
    pub fn from_new(id: ShippingId, new: NewShipment) -> Self {
        let log = ShippingLog {
            timestamp: new.created_at,
            status: ShippingStatus::Created,
            message: new.initial_log,
        };
        Self {
            id,
            order_id: new.order_id,
            user_id: new.user_id,
            travel_id: new.travel_id,
            delivery_address_id: new.delivery_address_id,
            products: new.products,
            status: ShippingStatus::Created,
            total_cost: new.total_cost,
            currency: new.currency,
            tracking_number: new.tracking_number,
            carrier_name: new.carrier_name,
            created_at: new.created_at,
            updated_at: new.created_at,
            estimated_delivery_at: new.estimated_delivery_at,
            logs: vec![log],
            version: Version::first(),
        }
    }

    /// Applies a status change in place and bumps the version.
    pub fn apply(&mut self, change: StatusChange) {
        self.status = change.status;
        self.updated_at = change.at;
        self.logs.push(ShippingLog {
            timestamp: change.at,
            status: change.status,
            message: change.message,
        });
        self.version = self.version.next();
    }
}

/// The only mutation a stored shipment accepts: a new status plus its log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: ShippingStatus,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new() -> NewShipment {
        NewShipment {
            order_id: ReservationId::new(10),
            user_id: UserId::new(1),
            travel_id: TravelId::new(1),
            delivery_address_id: AddressId::new(1),
            products: vec![ProductLine {
                product_id: ProductId::new(1),
                quantity: 2,
            }],
            total_cost: Money::from_cents(1000),
            currency: "ARS".to_string(),
            tracking_number: Uuid::new_v4(),
            carrier_name: "PENDING".to_string(),
            created_at: Utc::now(),
            estimated_delivery_at: Utc::now(),
            initial_log: "Shipping created.".to_string(),
        }
    }

    #[test]
    fn new_shipment_starts_created_with_one_log() {
        let detail = ShippingDetail::from_new(ShippingId::new(1), sample_new());
        assert_eq!(detail.status, ShippingStatus::Created);
        assert_eq!(detail.logs.len(), 1);
        assert_eq!(detail.logs[0].message, "Shipping created.");
        assert_eq!(detail.version, Version::first());
    }

    #[test]
    fn apply_appends_log_and_bumps_version() {
        let mut detail = ShippingDetail::from_new(ShippingId::new(1), sample_new());
        let at = Utc::now();
        detail.apply(StatusChange {
            status: ShippingStatus::InTransit,
            message: "On the road".to_string(),
            at,
        });
        assert_eq!(detail.status, ShippingStatus::InTransit);
        assert_eq!(detail.updated_at, at);
        assert_eq!(detail.logs.len(), 2);
        assert_eq!(detail.logs[1].status, ShippingStatus::InTransit);
        assert_eq!(detail.version, Version::new(2));
    }

    #[test]
    fn address_match_requires_all_fields() {
        let fields = NewAddress {
            street: "Av. Siempre Viva".to_string(),
            number: 742,
            postal_code: "H3500".to_string(),
            locality_name: "Resistencia".to_string(),
        };
        let mut stored = Address {
            id: AddressId::new(1),
            street: fields.street.clone(),
            number: fields.number,
            postal_code: fields.postal_code.clone(),
            locality_name: fields.locality_name.clone(),
        };
        assert!(fields.matches(&stored));
        stored.number = 743;
        assert!(!fields.matches(&stored));
    }
}
