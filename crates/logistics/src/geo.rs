//! Geodesic distance between postal codes.

use std::sync::LazyLock;

use regex::Regex;
use store::{Locality, LocalityRepository};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance assumed when either postal code cannot be located.
pub const FALLBACK_DISTANCE_KM: f64 = 300.0;

static POSTAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]\d+").expect("postal prefix pattern is valid"));

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl From<&Locality> for GeoPoint {
    fn from(locality: &Locality) -> Self {
        Self {
            lat: locality.lat,
            lon: locality.lon,
        }
    }
}

/// Reduces a postal code to its leading letter+digits run, upper-cased
/// (`"h3500abc"` becomes `"H3500"`). Codes without such a run are returned
/// without whitespace, upper-cased.
pub fn normalize_postal_code(raw: &str) -> String {
    let trimmed = raw.trim();
    match POSTAL_PREFIX.find(trimmed) {
        Some(m) => m.as_str().to_uppercase(),
        None => trimmed
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Spherical centroid of a set of points, computed as the normalised
/// average of their unit vectors.
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }

    let (mut x, mut y, mut z) = (0.0_f64, 0.0_f64, 0.0_f64);
    for p in points {
        let lat = p.lat.to_radians();
        let lon = p.lon.to_radians();
        x += lat.cos() * lon.cos();
        y += lat.cos() * lon.sin();
        z += lat.sin();
    }
    let n = points.len() as f64;
    let (x, y, z) = (x / n, y / n, z / n);

    let lon = y.atan2(x);
    let hyp = (x * x + y * y).sqrt();
    let lat = z.atan2(hyp);

    Some(GeoPoint {
        lat: lat.to_degrees(),
        lon: lon.to_degrees(),
    })
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Distance between the centroids of two point sets, if both are non-empty.
pub fn distance_between(origin: &[GeoPoint], destination: &[GeoPoint]) -> Option<f64> {
    Some(haversine_km(centroid(origin)?, centroid(destination)?))
}

/// Resolves postal codes through the locality table and measures the
/// distance between them. Never fails: anything it cannot resolve is
/// treated as [`FALLBACK_DISTANCE_KM`] away.
#[derive(Debug, Clone)]
pub struct DistanceEstimator<L> {
    localities: L,
}

impl<L: LocalityRepository> DistanceEstimator<L> {
    pub fn new(localities: L) -> Self {
        Self { localities }
    }

    /// Distance in km between two postal codes.
    #[tracing::instrument(skip(self))]
    pub async fn distance_km(&self, origin_postal: &str, destination_postal: &str) -> f64 {
        let origin = self.locate(origin_postal).await;
        let destination = self.locate(destination_postal).await;

        match distance_between(&origin, &destination) {
            Some(km) => km,
            None => {
                tracing::warn!(
                    origin = origin_postal,
                    destination = destination_postal,
                    fallback_km = FALLBACK_DISTANCE_KM,
                    "postal code not located, using fallback distance"
                );
                metrics::counter!("distance_fallback_total").increment(1);
                FALLBACK_DISTANCE_KM
            }
        }
    }

    /// All coordinates registered for a postal code: normalized form first,
    /// then the code exactly as given.
    async fn locate(&self, raw: &str) -> Vec<GeoPoint> {
        let normalized = normalize_postal_code(raw);
        let mut found = self.lookup(&normalized).await;

        let trimmed = raw.trim();
        if found.is_empty() && trimmed != normalized {
            found = self.lookup(trimmed).await;
        }
        found
    }

    async fn lookup(&self, postal_code: &str) -> Vec<GeoPoint> {
        match self.localities.localities_by_postal_code(postal_code).await {
            Ok(rows) => rows.iter().map(GeoPoint::from).collect(),
            Err(e) => {
                tracing::warn!(postal_code, error = %e, "locality lookup failed");
                Vec::new()
            }
        }
    }
}
