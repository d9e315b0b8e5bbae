//! Shared vocabulary for the purchasing and logistics services.
//!
//! Typed identifiers, money in cents, the optimistic concurrency token,
//! pagination and the shipment/transport enums that both sides of the
//! checkout protocol speak.

pub mod money;
pub mod page;
pub mod shipping;
pub mod types;

pub use money::Money;
pub use page::{PageRequest, Paginated, Pagination};
pub use shipping::{ShippingStatus, TransportType, UnknownVariant};
pub use types::{
    AddressId, DistributionCenterId, ProductId, ReservationId, ShippingId, TransportMethodId,
    TravelId, UserId, Version,
};
