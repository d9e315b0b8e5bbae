use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw identifier.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw identifier.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Local purchasing user.
    UserId
);
numeric_id!(
    /// Catalog product.
    ProductId
);
numeric_id!(
    /// Shipment created by logistics.
    ShippingId
);
numeric_id!(
    /// Stock reservation held by the stock service.
    ReservationId
);
numeric_id!(AddressId);
numeric_id!(DistributionCenterId);
numeric_id!(TravelId);
numeric_id!(TransportMethodId);

/// Optimistic concurrency token carried by mutable rows.
///
/// A row is written with the version it was read at; the store rejects the
/// write if someone else bumped the version in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub const fn new(version: i64) -> Self {
        Self(version)
    }

    /// Version of a row that has never been written.
    pub const fn initial() -> Self {
        Self(0)
    }

    /// Version of a freshly inserted row.
    pub const fn first() -> Self {
        Self(1)
    }

    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&ShippingId::new(42)).unwrap();
        assert_eq!(json, "42");

        let parsed: ProductId = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, ProductId::new(7));
    }

    #[test]
    fn ids_of_different_kinds_keep_their_value() {
        let travel = TravelId::from(3);
        assert_eq!(i64::from(travel), 3);
        assert_eq!(travel.to_string(), "3");
    }

    #[test]
    fn version_progression() {
        assert_eq!(Version::initial().as_i64(), 0);
        assert_eq!(Version::first().as_i64(), 1);
        assert_eq!(Version::first().next(), Version::new(2));
        assert!(Version::initial() < Version::first());
    }
}
