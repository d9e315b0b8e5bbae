//! Checkout saga coordinator.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{Money, ReservationId, ShippingId, ShippingStatus, TransportType, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{Cart, CartService, CartStore};
use crate::clients::{
    CostRequestPayload, CreateShippingPayload, DeliveryAddress, Reservation, ReservationLine,
    ReservationRequest, ReservationStatus, ShippingAddressPayload, ShippingClient,
    ShippingCreated, ShippingQuote, StockClient, product_payloads,
};
use crate::error::{CheckoutFailure, ClientError, OrderError, Result, SagaError};
use crate::identity::{Identity, LocalUser, UserDirectory, resolve_user};
use crate::orders::{OrderBook, OrderLine, OrderRecord, OrderStatus};
use crate::state::{CheckoutStep, SagaState};

/// Per-call limit for remote calls when none is configured.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Reason sent to stock when a reservation is rolled back.
pub const CANCELLATION_REASON: &str = "Checkout failed: the shipment could not be created";

/// Reason sent to stock when the buyer cancels an order.
pub const USER_CANCELLATION_REASON: &str = "Cancelled by the customer";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub delivery_address: DeliveryAddress,
    /// Road when absent.
    #[serde(default)]
    pub transport_type: Option<TransportType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub products_total: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub currency: String,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub reservation_id: ReservationId,
    pub shipping_id: ShippingId,
    pub transport_type: TransportType,
    pub costs: CostBreakdown,
    pub estimated_delivery_at: DateTime<Utc>,
    pub delivery_address: DeliveryAddress,
    pub items: Vec<OrderLine>,
    pub reservation_status: ReservationStatus,
    pub shipping_status: ShippingStatus,
}

/// Undo action registered by a completed step.
#[derive(Debug, Clone, Copy)]
enum Compensation {
    CancelReservation(ReservationId),
}

impl Compensation {
    fn step(&self) -> CheckoutStep {
        match self {
            Compensation::CancelReservation(_) => CheckoutStep::ReserveStock,
        }
    }
}

/// Progress of one checkout.
#[derive(Debug, Default)]
struct SagaRun {
    state: SagaState,
    reservation: Option<Reservation>,
    quote: Option<ShippingQuote>,
    shipment: Option<ShippingCreated>,
    compensations: Vec<Compensation>,
}

impl SagaRun {
    fn transition(&mut self, to: SagaState) {
        if to.is_terminal() {
            tracing::info!(from = %self.state, %to, "saga finished");
        } else {
            tracing::debug!(from = %self.state, %to, "saga state changed");
        }
        self.state = to;
    }
}

/// Orchestrates checkout: reserve stock, create the shipment, clear the
/// cart. A failure after the reservation cancels it; the caller always gets
/// the error of the step that failed.
pub struct CheckoutCoordinator<C, U, O, St, Sh>
where
    C: CartStore,
    U: UserDirectory,
    O: OrderBook,
    St: StockClient,
    Sh: ShippingClient,
{
    carts: CartService<C>,
    users: U,
    orders: O,
    stock: St,
    shipping: Sh,
    call_timeout: Duration,
}

impl<C, U, O, St, Sh> CheckoutCoordinator<C, U, O, St, Sh>
where
    C: CartStore,
    U: UserDirectory,
    O: OrderBook,
    St: StockClient,
    Sh: ShippingClient,
{
    pub fn new(carts: C, users: U, orders: O, stock: St, shipping: Sh) -> Self {
        Self {
            carts: CartService::new(carts),
            users,
            orders,
            stock,
            shipping,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Sets the limit applied to every remote call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn carts(&self) -> &CartService<C> {
        &self.carts
    }

    pub fn users(&self) -> &U {
        &self.users
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    /// Runs the checkout saga for the caller's cart.
    #[tracing::instrument(skip_all, fields(transport = ?request.transport_type))]
    pub async fn checkout(&self, identity: &Identity, request: CheckoutRequest) -> Result<Receipt> {
        metrics::counter!("checkout_total").increment(1);
        let started = Instant::now();

        let result = self.run(identity, request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(receipt) => tracing::info!(
                reservation_id = %receipt.reservation_id,
                shipping_id = %receipt.shipping_id,
                total = %receipt.costs.total,
                "checkout completed"
            ),
            Err(failure) => {
                metrics::counter!("checkout_failed_total", "code" => failure.code()).increment(1);
                tracing::warn!(code = failure.code(), error = %failure.error, "checkout failed");
            }
        }
        result
    }

    async fn run(&self, identity: &Identity, request: CheckoutRequest) -> Result<Receipt> {
        let user = resolve_user(&self.users, identity)
            .await
            .map_err(SagaError::from)?;
        let cart = self.carts.items(user.id).await.map_err(SagaError::from)?;
        if cart.is_empty() {
            return Err(SagaError::EmptyCart.into());
        }

        let products_total = cart.subtotal();
        let fail = |error: SagaError| CheckoutFailure::with_total(error, products_total);

        let missing = request.delivery_address.missing_fields();
        if !missing.is_empty() {
            return Err(fail(SagaError::Validation(format!(
                "deliveryAddress is missing {}",
                missing.join(", ")
            ))));
        }
        let transport = request.transport_type.unwrap_or_default();
        let address = ShippingAddressPayload::from(&request.delivery_address);

        let mut saga = SagaRun::default();
        saga.transition(SagaState::Running);

        for step in CheckoutStep::ALL {
            tracing::info!(%step, "saga step started");
            let outcome = match step {
                CheckoutStep::ReserveStock => self.reserve_stock(&user, &cart, &mut saga).await,
                CheckoutStep::CreateShipment => {
                    self.create_shipment(&user, &cart, &address, transport, &mut saga)
                        .await
                }
                CheckoutStep::ClearCart => {
                    self.clear_cart(&user).await;
                    Ok(())
                }
            };

            if let Err(error) = outcome {
                tracing::warn!(%step, %error, "saga step failed");
                self.compensate(&mut saga).await;
                return Err(fail(error));
            }
        }
        saga.transition(SagaState::Completed);

        let (Some(reservation), Some(quote), Some(shipment)) =
            (saga.reservation, saga.quote, saga.shipment)
        else {
            return Err(fail(SagaError::Internal(
                "saga completed without reservation or shipment".to_string(),
            )));
        };

        let receipt = Receipt {
            reservation_id: reservation.reservation_id,
            shipping_id: shipment.shipping_id,
            transport_type: shipment.transport_type,
            costs: CostBreakdown {
                products_total,
                shipping_cost: quote.total_cost,
                total: products_total + quote.total_cost,
                currency: quote.currency,
            },
            estimated_delivery_at: shipment.estimated_delivery_at,
            delivery_address: request.delivery_address,
            items: order_lines(&cart),
            reservation_status: reservation.status,
            shipping_status: shipment.status,
        };
        self.record_order(&user, &receipt).await;
        Ok(receipt)
    }

    async fn reserve_stock(
        &self,
        user: &LocalUser,
        cart: &Cart,
        saga: &mut SagaRun,
    ) -> std::result::Result<(), SagaError> {
        let request = ReservationRequest {
            purchase_id: format!("PUR-{}", Uuid::new_v4().simple()),
            user_id: user.id,
            products: cart
                .items
                .iter()
                .map(|item| ReservationLine {
                    product_id: item.product_id,
                    quantity: item.quantity,
                })
                .collect(),
        };

        let reservation = self
            .timed(self.stock.reserve(&request))
            .await
            .map_err(SagaError::from_stock)?;

        tracing::info!(reservation_id = %reservation.reservation_id, "stock reserved");
        saga.compensations
            .push(Compensation::CancelReservation(reservation.reservation_id));
        saga.reservation = Some(reservation);
        Ok(())
    }

    async fn create_shipment(
        &self,
        user: &LocalUser,
        cart: &Cart,
        address: &ShippingAddressPayload,
        transport: TransportType,
        saga: &mut SagaRun,
    ) -> std::result::Result<(), SagaError> {
        let Some(reservation_id) = saga.reservation.as_ref().map(|r| r.reservation_id) else {
            return Err(SagaError::Internal(
                "shipment step reached without a reservation".to_string(),
            ));
        };
        let products = product_payloads(&cart.items);

        let quote = self
            .timed(self.shipping.quote(&CostRequestPayload {
                delivery_address: address.clone(),
                transport_type: transport,
                products: products.clone(),
            }))
            .await
            .map_err(SagaError::from_shipping)?;

        let shipment = self
            .timed(self.shipping.create_shipment(&CreateShippingPayload {
                order_id: reservation_id,
                user_id: user.id,
                delivery_address: address.clone(),
                transport_type: transport,
                products,
            }))
            .await
            .map_err(SagaError::from_shipping)?;

        tracing::info!(shipping_id = %shipment.shipping_id, "shipment created");
        saga.quote = Some(quote);
        saga.shipment = Some(shipment);
        Ok(())
    }

    /// Best effort: a cart that could not be cleared does not undo a
    /// placed order.
    async fn clear_cart(&self, user: &LocalUser) {
        if let Err(e) = self.carts.clear(user.id).await {
            tracing::error!(user_id = %user.id, error = %e, "failed to clear cart after checkout");
        }
    }

    /// Runs registered compensations newest first. Failures are logged and
    /// never replace the error that triggered the rollback.
    async fn compensate(&self, saga: &mut SagaRun) {
        if !saga.state.can_compensate() {
            return;
        }
        saga.transition(SagaState::Compensating);

        while let Some(compensation) = saga.compensations.pop() {
            let step = compensation.step();
            metrics::counter!("saga_compensations_total", "step" => step.as_str()).increment(1);

            let result = match compensation {
                Compensation::CancelReservation(id) => {
                    self.timed(self.stock.cancel_reservation(id, CANCELLATION_REASON))
                        .await
                }
            };
            match result {
                Ok(()) => tracing::info!(%step, "compensation completed"),
                Err(e) => tracing::error!(%step, error = %e, "compensation failed"),
            }
        }

        saga.transition(SagaState::Failed);
    }

    /// Cancels a pending order of `user_id`: releases its stock reservation,
    /// cancels its shipment and marks it cancelled. Remote failures are
    /// logged and do not keep the order from being cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        user_id: UserId,
        order_id: ReservationId,
    ) -> std::result::Result<OrderRecord, OrderError> {
        let order = self.orders.order(user_id, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(OrderError::NotCancellable {
                order_id,
                status: order.status,
            });
        }

        if let Err(e) = self
            .timed(self.stock.cancel_reservation(order.order_id, USER_CANCELLATION_REASON))
            .await
        {
            metrics::counter!("order_cancellation_step_failed_total", "step" => "release_stock")
                .increment(1);
            tracing::warn!(error = %e, "failed to cancel stock reservation");
        }
        if let Err(e) = self.timed(self.shipping.cancel_shipment(order.shipping_id)).await {
            metrics::counter!("order_cancellation_step_failed_total", "step" => "cancel_shipment")
                .increment(1);
            tracing::warn!(shipping_id = %order.shipping_id, error = %e, "failed to cancel shipment");
        }

        let cancelled = self.orders.cancel(user_id, order_id).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(shipping_id = %cancelled.shipping_id, "order cancelled by customer");
        Ok(cancelled)
    }

    async fn record_order(&self, user: &LocalUser, receipt: &Receipt) {
        let record = OrderRecord {
            order_id: receipt.reservation_id,
            shipping_id: receipt.shipping_id,
            user_id: user.id,
            status: OrderStatus::Pending,
            items: receipt.items.clone(),
            products_total: receipt.costs.products_total,
            shipping_cost: receipt.costs.shipping_cost,
            total: receipt.costs.total,
            currency: receipt.costs.currency.clone(),
            transport_type: receipt.transport_type,
            shipping_status: receipt.shipping_status,
            created_at: Utc::now(),
        };
        if let Err(e) = self.orders.record(record).await {
            tracing::error!(order_id = %receipt.reservation_id, error = %e, "failed to record order");
        }
    }

    async fn timed<T, F>(&self, call: F) -> std::result::Result<T, ClientError>
    where
        F: Future<Output = std::result::Result<T, ClientError>>,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .map_err(|_| ClientError::Timeout(self.call_timeout))?
    }
}

fn order_lines(cart: &Cart) -> Vec<OrderLine> {
    cart.items
        .iter()
        .map(|item| OrderLine {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total(),
        })
        .collect()
}
