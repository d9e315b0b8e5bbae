//! Distribution center selection.

use common::DistributionCenterId;
use store::{DistributionCenter, LocalityRepository};

use crate::geo::DistanceEstimator;

/// Center used when no candidate has an address.
pub const DEFAULT_CENTER_ID: DistributionCenterId = DistributionCenterId::new(1);

/// Picks the center closest to `delivery_postal_code`. Centers without an
/// address are skipped; ties keep the first center seen.
pub async fn nearest_center<L: LocalityRepository>(
    distance: &DistanceEstimator<L>,
    delivery_postal_code: &str,
    centers: &[DistributionCenter],
) -> DistributionCenterId {
    let mut best: Option<(DistributionCenterId, f64)> = None;

    for center in centers {
        let Some(address) = &center.address else {
            continue;
        };
        let km = distance
            .distance_km(&address.postal_code, delivery_postal_code)
            .await;
        if best.is_none_or(|(_, best_km)| km < best_km) {
            best = Some((center.id, km));
        }
    }

    match best {
        Some((id, km)) => {
            tracing::debug!(center = %id, km, "nearest distribution center");
            id
        }
        None => DEFAULT_CENTER_ID,
    }
}
