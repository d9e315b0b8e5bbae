//! Typed HTTP boundaries to the stock and logistics services, with
//! in-memory implementations for testing.

pub mod shipping;
pub mod stock;

pub use shipping::{
    CostRequestPayload, CreateShippingPayload, DeliveryAddress, HttpShippingClient,
    InMemoryShippingClient, ShippingAddressPayload, ShippingCancelled, ShippingClient, ShippingCreated,
    ShippingProductPayload, ShippingQuote, product_payloads,
};
pub use stock::{
    HttpStockClient, InMemoryStockClient, Reservation, ReservationLine, ReservationRequest,
    ReservationStatus, StockClient,
};
