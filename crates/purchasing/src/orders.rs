//! Order history kept after successful checkouts.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, ProductId, ReservationId, ShippingId, ShippingStatus, TransportType, UserId};
use serde::{Deserialize, Serialize};

use crate::error::OrderError;

/// Where a purchase stands from the buyer's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed and not cancelled; the buyer may still cancel it.
    Pending,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// A completed purchase. The reservation id doubles as the order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub order_id: ReservationId,
    pub shipping_id: ShippingId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub items: Vec<OrderLine>,
    pub products_total: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub currency: String,
    pub transport_type: TransportType,
    pub shipping_status: ShippingStatus,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait OrderBook: Send + Sync {
    async fn record(&self, order: OrderRecord) -> Result<(), OrderError>;

    /// The user's orders, newest first.
    async fn orders(&self, user_id: UserId) -> Result<Vec<OrderRecord>, OrderError>;

    async fn order(&self, user_id: UserId, order_id: ReservationId) -> Result<OrderRecord, OrderError>;

    /// Marks a pending order of `user_id` as cancelled. Fails with
    /// `NotCancellable` when the order is no longer pending.
    async fn cancel(&self, user_id: UserId, order_id: ReservationId) -> Result<OrderRecord, OrderError>;

    /// Marks the order owning `shipping_id` as cancelled. Already cancelled
    /// orders are returned unchanged.
    async fn shipment_cancelled(&self, shipping_id: ShippingId) -> Result<OrderRecord, OrderError>;
}

#[async_trait]
impl<T: OrderBook + ?Sized> OrderBook for Arc<T> {
    async fn record(&self, order: OrderRecord) -> Result<(), OrderError> {
        (**self).record(order).await
    }

    async fn orders(&self, user_id: UserId) -> Result<Vec<OrderRecord>, OrderError> {
        (**self).orders(user_id).await
    }

    async fn order(&self, user_id: UserId, order_id: ReservationId) -> Result<OrderRecord, OrderError> {
        (**self).order(user_id, order_id).await
    }

    async fn cancel(&self, user_id: UserId, order_id: ReservationId) -> Result<OrderRecord, OrderError> {
        (**self).cancel(user_id, order_id).await
    }

    async fn shipment_cancelled(&self, shipping_id: ShippingId) -> Result<OrderRecord, OrderError> {
        (**self).shipment_cancelled(shipping_id).await
    }
}

/// In-memory order history.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderBook {
    orders: Arc<RwLock<Vec<OrderRecord>>>,
}

impl InMemoryOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, OrderError> {
        Ok(self.orders.read().map_err(storage)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, OrderError> {
        Ok(self.len()? == 0)
    }
}

fn storage(e: impl std::fmt::Display) -> OrderError {
    OrderError::Storage(e.to_string())
}

#[async_trait]
impl OrderBook for InMemoryOrderBook {
    async fn record(&self, order: OrderRecord) -> Result<(), OrderError> {
        self.orders.write().map_err(storage)?.push(order);
        Ok(())
    }

    async fn orders(&self, user_id: UserId) -> Result<Vec<OrderRecord>, OrderError> {
        let orders = self.orders.read().map_err(storage)?;
        let mut mine: Vec<OrderRecord> = orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(mine)
    }

    async fn order(&self, user_id: UserId, order_id: ReservationId) -> Result<OrderRecord, OrderError> {
        let orders = self.orders.read().map_err(storage)?;
        orders
            .iter()
            .find(|o| o.user_id == user_id && o.order_id == order_id)
            .cloned()
            .ok_or(OrderError::NotFound(order_id))
    }

    #[tracing::instrument(skip(self))]
    async fn cancel(&self, user_id: UserId, order_id: ReservationId) -> Result<OrderRecord, OrderError> {
        let mut orders = self.orders.write().map_err(storage)?;
        let order = orders
            .iter_mut()
            .find(|o| o.user_id == user_id && o.order_id == order_id)
            .ok_or(OrderError::NotFound(order_id))?;

        if order.status != OrderStatus::Pending {
            return Err(OrderError::NotCancellable {
                order_id,
                status: order.status,
            });
        }
        order.status = OrderStatus::Cancelled;
        order.shipping_status = ShippingStatus::Cancelled;
        Ok(order.clone())
    }

    #[tracing::instrument(skip(self))]
    async fn shipment_cancelled(&self, shipping_id: ShippingId) -> Result<OrderRecord, OrderError> {
        let mut orders = self.orders.write().map_err(storage)?;
        let order = orders
            .iter_mut()
            .find(|o| o.shipping_id == shipping_id)
            .ok_or(OrderError::ShipmentNotFound(shipping_id))?;

        if order.shipping_status != ShippingStatus::Cancelled {
            order.shipping_status = ShippingStatus::Cancelled;
            order.status = OrderStatus::Cancelled;
            tracing::info!(order_id = %order.order_id, "order shipment cancelled by logistics");
        }
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(order: i64, shipping: i64, user: i64) -> OrderRecord {
        OrderRecord {
            order_id: ReservationId::new(order),
            shipping_id: ShippingId::new(shipping),
            user_id: UserId::new(user),
            status: OrderStatus::Pending,
            items: vec![],
            products_total: Money::from_cents(1000),
            shipping_cost: Money::from_cents(500),
            total: Money::from_cents(1500),
            currency: "ARS".to_string(),
            transport_type: TransportType::Road,
            shipping_status: ShippingStatus::Created,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn orders_are_scoped_to_user() {
        let book = InMemoryOrderBook::new();
        book.record(record(1, 10, 1)).await.unwrap();
        book.record(record(2, 11, 2)).await.unwrap();

        assert_eq!(book.orders(UserId::new(1)).await.unwrap().len(), 1);
        assert!(book.order(UserId::new(1), ReservationId::new(1)).await.is_ok());
        assert!(matches!(
            book.order(UserId::new(1), ReservationId::new(2)).await,
            Err(OrderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancellation_notice_marks_order() {
        let book = InMemoryOrderBook::new();
        book.record(record(1, 10, 1)).await.unwrap();

        let updated = book.shipment_cancelled(ShippingId::new(10)).await.unwrap();
        assert_eq!(updated.shipping_status, ShippingStatus::Cancelled);
        assert_eq!(updated.status, OrderStatus::Cancelled);

        let again = book.shipment_cancelled(ShippingId::new(10)).await.unwrap();
        assert_eq!(again, updated);

        assert!(matches!(
            book.shipment_cancelled(ShippingId::new(99)).await,
            Err(OrderError::ShipmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_pending_orders_of_the_owner_cancel() {
        let book = InMemoryOrderBook::new();
        book.record(record(1, 10, 1)).await.unwrap();

        assert!(matches!(
            book.cancel(UserId::new(2), ReservationId::new(1)).await,
            Err(OrderError::NotFound(_))
        ));

        let cancelled = book.cancel(UserId::new(1), ReservationId::new(1)).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.shipping_status, ShippingStatus::Cancelled);

        assert!(matches!(
            book.cancel(UserId::new(1), ReservationId::new(1)).await,
            Err(OrderError::NotCancellable {
                status: OrderStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn len_counts_every_user() {
        let book = InMemoryOrderBook::new();
        assert!(book.is_empty().unwrap());
        book.record(record(1, 10, 1)).await.unwrap();
        book.record(record(2, 11, 2)).await.unwrap();
        assert_eq!(book.len().unwrap(), 2);
    }
}
