//! Route handlers, grouped by resource.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod localities;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod shipping;
