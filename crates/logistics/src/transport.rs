//! Transport method catalog and per-mode rates.

use common::{TransportMethodId, TransportType};
use serde::Serialize;

/// A transport method as offered to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransportMethod {
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    pub name: &'static str,
    pub estimated_days: &'static str,
}

/// All offered transport methods.
pub fn transport_methods() -> Vec<TransportMethod> {
    TransportType::ALL
        .into_iter()
        .map(|transport_type| TransportMethod {
            transport_type,
            name: display_name(transport_type),
            estimated_days: estimated_days(transport_type),
        })
        .collect()
}

fn display_name(transport: TransportType) -> &'static str {
    match transport {
        TransportType::Air => "Air Freight",
        TransportType::Road => "Road Transport",
        TransportType::Rail => "Rail Freight",
        TransportType::Sea => "Sea Freight",
    }
}

fn estimated_days(transport: TransportType) -> &'static str {
    match transport {
        TransportType::Air => "1-3",
        TransportType::Road => "3-7",
        TransportType::Rail => "5-10",
        TransportType::Sea => "15-30",
    }
}

/// Distance cost multiplier.
pub fn cost_multiplier(transport: TransportType) -> f64 {
    match transport {
        TransportType::Air => 2.0,
        TransportType::Road => 1.5,
        TransportType::Rail => 1.2,
        TransportType::Sea => 1.0,
    }
}

/// Upper bound of the delivery window, in days.
pub fn max_delivery_days(transport: TransportType) -> i64 {
    match transport {
        TransportType::Air => 3,
        TransportType::Road => 7,
        TransportType::Rail => 10,
        TransportType::Sea => 30,
    }
}

/// Transport method row id used by travels.
pub fn method_id(transport: TransportType) -> TransportMethodId {
    match transport {
        TransportType::Road => TransportMethodId::new(1),
        TransportType::Rail => TransportMethodId::new(3),
        TransportType::Sea => TransportMethodId::new(1001),
        TransportType::Air => TransportMethodId::new(2001),
    }
}

/// Reverse of [`method_id`].
pub fn transport_type_for(method: TransportMethodId) -> Option<TransportType> {
    TransportType::ALL
        .into_iter()
        .find(|t| method_id(*t) == method)
}
