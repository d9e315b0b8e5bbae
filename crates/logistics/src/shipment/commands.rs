//! Shipment commands.

use common::{ReservationId, ShippingId, ShippingStatus, TransportType, UserId};
use store::{NewAddress, ProductLine};

use super::ShipmentError;

/// Request to create a shipment for a purchase.
#[derive(Debug, Clone)]
pub struct CreateShipment {
    /// Purchase the shipment belongs to; purchasing uses the reservation id.
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub delivery_address: NewAddress,
    /// Road when absent.
    pub transport_type: Option<TransportType>,
    pub products: Vec<ProductLine>,
}

impl CreateShipment {
    /// Checks the request shape before any pricing or persistence happens.
    pub fn validate(&self) -> Result<(), ShipmentError> {
        if self.products.is_empty() {
            return Err(ShipmentError::NoProducts);
        }
        let address = &self.delivery_address;
        if address.street.trim().is_empty() {
            return Err(ShipmentError::Validation(
                "delivery_address.street is required".to_string(),
            ));
        }
        if address.postal_code.trim().is_empty() {
            return Err(ShipmentError::Validation(
                "delivery_address.postal_code is required".to_string(),
            ));
        }
        if address.locality_name.trim().is_empty() {
            return Err(ShipmentError::Validation(
                "delivery_address.locality_name is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Operator-driven status change.
#[derive(Debug, Clone)]
pub struct UpdateStatus {
    pub shipping_id: ShippingId,
    pub new_status: ShippingStatus,
    /// Log message; a default is recorded when absent or blank.
    pub message: Option<String>,
}

impl UpdateStatus {
    pub fn new(shipping_id: ShippingId, new_status: ShippingStatus) -> Self {
        Self {
            shipping_id,
            new_status,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
