//! Static reference data: localities and distribution centers.

use std::path::Path;

use common::DistributionCenterId;
use serde::{Deserialize, Serialize};

use crate::{Locality, NewAddress, Result};

/// A distribution center as described in a seed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionCenterSeed {
    pub id: DistributionCenterId,
    pub name: String,
    #[serde(default)]
    pub address: Option<NewAddress>,
}

/// Seed content loaded into a store at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    pub localities: Vec<Locality>,
    pub distribution_centers: Vec<DistributionCenterSeed>,
}

impl ReferenceData {
    /// Reads reference data from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// A small built-in data set, enough to quote and route shipments
    /// between the main Argentine hubs.
    pub fn builtin() -> Self {
        fn locality(postal_code: &str, name: &str, lat: f64, lon: f64, state: &str) -> Locality {
            Locality {
                postal_code: postal_code.to_string(),
                locality_name: name.to_string(),
                lat,
                lon,
                state: state.to_string(),
                country: "AR".to_string(),
            }
        }

        fn center(
            id: i64,
            name: &str,
            street: &str,
            number: i32,
            postal_code: &str,
            locality: &str,
        ) -> DistributionCenterSeed {
            DistributionCenterSeed {
                id: DistributionCenterId::new(id),
                name: name.to_string(),
                address: Some(NewAddress {
                    street: street.to_string(),
                    number,
                    postal_code: postal_code.to_string(),
                    locality_name: locality.to_string(),
                }),
            }
        }

        Self {
            localities: vec![
                locality("H3500", "Resistencia", -27.4606, -58.9839, "Chaco"),
                locality("C1000", "Ciudad Autonoma de Buenos Aires", -34.6037, -58.3816, "CABA"),
                locality("X5000", "Cordoba", -31.4201, -64.1888, "Cordoba"),
                locality("N3300", "Posadas", -27.3671, -55.8961, "Misiones"),
                locality("B1708", "Moron", -34.6534, -58.6198, "Buenos Aires"),
                locality("B1708", "Haedo", -34.6446, -58.5944, "Buenos Aires"),
            ],
            distribution_centers: vec![
                center(
                    1,
                    "CABA Hub",
                    "Av. Corrientes",
                    1000,
                    "C1000",
                    "Ciudad Autonoma de Buenos Aires",
                ),
                center(2, "Cordoba Hub", "Bv. San Juan", 500, "X5000", "Cordoba"),
                center(3, "Resistencia Hub", "Av. Alberdi", 300, "H3500", "Resistencia"),
            ],
        }
    }
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_ambiguous_postal_code() {
        let data = ReferenceData::builtin();
        let b1708 = data
            .localities
            .iter()
            .filter(|l| l.postal_code == "B1708")
            .count();
        assert_eq!(b1708, 2);
    }

    #[test]
    fn builtin_centers_have_addresses() {
        let data = ReferenceData::builtin();
        assert_eq!(data.distribution_centers.len(), 3);
        assert!(data.distribution_centers.iter().all(|c| c.address.is_some()));
    }

    #[test]
    fn reads_json_file() {
        let dir = std::env::temp_dir().join(format!("refdata-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reference.json");
        let json = serde_json::json!({
            "localities": [{
                "postal_code": "A4400",
                "locality_name": "Salta",
                "lat": -24.78,
                "lon": -65.41,
                "state": "Salta",
                "country": "AR"
            }],
            "distribution_centers": [{ "id": 9, "name": "Bare" }]
        });
        std::fs::write(&path, json.to_string()).unwrap();

        let data = ReferenceData::from_json_file(&path).unwrap();
        assert_eq!(data.localities[0].locality_name, "Salta");
        assert_eq!(data.distribution_centers[0].id, DistributionCenterId::new(9));
        assert!(data.distribution_centers[0].address.is_none());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ReferenceData::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, crate::StoreError::ReferenceData(_)));
    }
}
