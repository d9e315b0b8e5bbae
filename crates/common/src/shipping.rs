//! Shipment status and transport mode vocabulary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a status or transport name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Transport mode of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Air,
    #[default]
    Road,
    Rail,
    Sea,
}

impl TransportType {
    pub const ALL: [TransportType; 4] = [
        TransportType::Air,
        TransportType::Road,
        TransportType::Rail,
        TransportType::Sea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportType::Air => "air",
            TransportType::Road => "road",
            TransportType::Rail => "rail",
            TransportType::Sea => "sea",
        }
    }
}

impl std::fmt::Display for TransportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransportType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownVariant {
                kind: "transport type",
                value: s.to_string(),
            })
    }
}

/// Lifecycle status of a shipment.
///
/// ```text
/// created ─► reserved ─► in_distribution ─► in_transit ─► arrived ─► delivered
///    │          │              │                │            │
///    └──────────┴──────────────┴────────────────┴────────────┴──► cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal. Once a shipment has left
/// `created` it never returns there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    #[default]
    Created,
    Reserved,
    InDistribution,
    InTransit,
    Arrived,
    Delivered,
    Cancelled,
}

impl ShippingStatus {
    pub const ALL: [ShippingStatus; 7] = [
        ShippingStatus::Created,
        ShippingStatus::Reserved,
        ShippingStatus::InDistribution,
        ShippingStatus::InTransit,
        ShippingStatus::Arrived,
        ShippingStatus::Delivered,
        ShippingStatus::Cancelled,
    ];

    /// Returns true if no further status change is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShippingStatus::Delivered | ShippingStatus::Cancelled)
    }

    /// Returns true if the shipment may still be cancelled.
    pub fn can_cancel(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingStatus::Created => "created",
            ShippingStatus::Reserved => "reserved",
            ShippingStatus::InDistribution => "in_distribution",
            ShippingStatus::InTransit => "in_transit",
            ShippingStatus::Arrived => "arrived",
            ShippingStatus::Delivered => "delivered",
            ShippingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ShippingStatus {
    type Err = UnknownVariant;

    /// Accepts `in_transit`, `in-transit`, `In Transit` and `InTransit`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed = |v: &str| -> String {
            v.chars()
                .filter(|c| !matches!(c, '_' | '-' | ' '))
                .map(|c| c.to_ascii_lowercase())
                .collect()
        };
        let wanted = squashed(s);
        ShippingStatus::ALL
            .into_iter()
            .find(|st| squashed(st.as_str()) == wanted && !wanted.is_empty())
            .ok_or_else(|| UnknownVariant {
                kind: "shipping status",
                value: s.to_string(),
            })
    }
}
