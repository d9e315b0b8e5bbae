//! Shipping cost estimation.

use chrono::{DateTime, Duration, Utc};
use common::{Money, ProductId, TransportType};
use futures_util::future::try_join_all;
use serde::Serialize;
use store::{LocalityRepository, ProductLine};

use crate::catalog::{CatalogClient, ProductDimensions};
use crate::error::CostError;
use crate::geo::DistanceEstimator;
use crate::transport::{cost_multiplier, max_delivery_days};

/// Currency every quote is expressed in.
pub const CURRENCY: &str = "ARS";

/// Origin assumed for products whose warehouse is unknown.
pub const DEFAULT_ORIGIN_POSTAL_CODE: &str = "H3500";

const WEIGHT_RATE: f64 = 1.2;
const VOLUME_RATE: f64 = 0.5;
const DISTANCE_RATE: f64 = 8.0;

/// Cost attributed to one product line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductCost {
    #[serde(rename = "id")]
    pub product_id: ProductId,
    pub cost: Money,
}

/// Result of pricing a set of product lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub currency: String,
    pub total_cost: Money,
    pub transport_type: TransportType,
    pub products: Vec<ProductCost>,
    pub estimated_delivery_at: DateTime<Utc>,
}

/// Cost of one line, before rounding.
///
/// The per-line result is divided by the number of lines so the distance
/// component is shared across the shipment instead of charged per line.
pub fn line_cost(
    dims: &ProductDimensions,
    quantity: u32,
    distance_km: f64,
    transport: TransportType,
    line_count: usize,
) -> f64 {
    let qty = f64::from(quantity);
    let total_weight = dims.weight * qty;
    let total_volume = dims.volume() * qty;
    let cost = total_weight * WEIGHT_RATE
        + total_volume * VOLUME_RATE
        + distance_km * DISTANCE_RATE * cost_multiplier(transport);
    cost / line_count.max(1) as f64
}

/// Prices shipments from catalog dimensions and geodesic distance.
///
/// Pure: nothing is persisted. Catalog failures are returned to the caller.
pub struct CostCalculator<L, C> {
    distance: DistanceEstimator<L>,
    catalog: C,
}

impl<L, C> CostCalculator<L, C>
where
    L: LocalityRepository,
    C: CatalogClient,
{
    pub fn new(distance: DistanceEstimator<L>, catalog: C) -> Self {
        Self { distance, catalog }
    }

    pub fn distance(&self) -> &DistanceEstimator<L> {
        &self.distance
    }

    /// Prices `lines` for delivery to `delivery_postal_code`. Transport
    /// defaults to road.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn quote(
        &self,
        delivery_postal_code: &str,
        transport: Option<TransportType>,
        lines: &[ProductLine],
    ) -> Result<Quote, CostError> {
        if lines.is_empty() {
            return Err(CostError::NoProducts);
        }
        if let Some(bad) = lines.iter().find(|l| l.quantity == 0) {
            return Err(CostError::InvalidQuantity(bad.product_id));
        }

        let transport = transport.unwrap_or_default();
        let line_count = lines.len();

        let products = try_join_all(lines.iter().map(|line| async move {
            let dims = self.catalog.product(line.product_id).await?;
            let origin = dims
                .warehouse_postal_code
                .as_deref()
                .unwrap_or(DEFAULT_ORIGIN_POSTAL_CODE);
            let km = self.distance.distance_km(origin, delivery_postal_code).await;
            let cost = line_cost(&dims, line.quantity, km, transport, line_count);
            Ok::<_, CostError>(ProductCost {
                product_id: line.product_id,
                cost: Money::from_decimal(cost),
            })
        }))
        .await?;

        let total_cost = products.iter().map(|p| p.cost).sum();
        let estimated_delivery_at = Utc::now() + Duration::days(max_delivery_days(transport));

        tracing::debug!(%total_cost, %transport, "shipment quoted");

        Ok(Quote {
            currency: CURRENCY.to_string(),
            total_cost,
            transport_type: transport,
            products,
            estimated_delivery_at,
        })
    }
}
