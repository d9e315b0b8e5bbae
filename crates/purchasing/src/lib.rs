//! Purchasing side of the fulfillment pipeline.
//!
//! This crate provides:
//! - Per-user carts with version-checked updates
//! - Identity resolution to auto-provisioned local users
//! - Typed clients for the stock and logistics services
//! - The checkout saga: reserve stock, create the shipment, clear the cart,
//!   cancelling the reservation if the shipment cannot be created
//! - Order history, updated when logistics cancels a shipment; buyers may
//!   cancel pending orders, releasing stock and cancelling the shipment

pub mod cart;
pub mod checkout;
pub mod clients;
pub mod error;
pub mod identity;
pub mod orders;
pub mod state;

pub use cart::{Cart, CartItem, CartService, CartStore, InMemoryCartStore};
pub use checkout::{
    CANCELLATION_REASON, CheckoutCoordinator, CheckoutRequest, CostBreakdown,
    DEFAULT_CALL_TIMEOUT, Receipt, USER_CANCELLATION_REASON,
};
pub use clients::{
    DeliveryAddress, HttpShippingClient, HttpStockClient, InMemoryShippingClient,
    InMemoryStockClient, ShippingCancelled, ShippingClient, StockClient,
};
pub use error::{CartError, CheckoutFailure, ClientError, IdentityError, OrderError, SagaError};
pub use identity::{Identity, InMemoryUserDirectory, LocalUser, TokenClaims, UserDirectory};
pub use orders::{InMemoryOrderBook, OrderBook, OrderLine, OrderRecord, OrderStatus};
pub use state::{CheckoutStep, SagaState};
