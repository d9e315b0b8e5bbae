//! Product catalog collaborator: physical dimensions and warehouse location.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::ProductId;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Shipping-relevant attributes of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDimensions {
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub warehouse_postal_code: Option<String>,
}

impl ProductDimensions {
    pub fn new(weight: f64, length: f64, width: f64, height: f64) -> Self {
        Self {
            weight,
            length,
            width,
            height,
            warehouse_postal_code: None,
        }
    }

    pub fn from_warehouse(mut self, postal_code: impl Into<String>) -> Self {
        self.warehouse_postal_code = Some(postal_code.into());
        self
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }
}

/// Source of product dimensions.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    async fn product(&self, id: ProductId) -> Result<ProductDimensions, CatalogError>;
}

#[async_trait]
impl<T: CatalogClient + ?Sized> CatalogClient for Arc<T> {
    async fn product(&self, id: ProductId) -> Result<ProductDimensions, CatalogError> {
        (**self).product(id).await
    }
}

/// HTTP client for the catalog service (`GET /products/{id}`).
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    #[tracing::instrument(skip(self))]
    async fn product(&self, id: ProductId) -> Result<ProductDimensions, CatalogError> {
        let response = self
            .client
            .get(format!("{}/products/{}", self.base_url, id))
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CatalogError::ProductNotFound(id)),
            status if !status.is_success() => Err(CatalogError::Unavailable(format!(
                "catalog returned {status} for product {id}"
            ))),
            _ => response
                .json::<ProductDimensions>()
                .await
                .map_err(|e| CatalogError::InvalidResponse(e.to_string())),
        }
    }
}

/// Fixed catalog used when no catalog service is configured.
///
/// Unknown products get [`StaticCatalog::fallback`] dimensions instead of
/// an error, so quotes work for any product id.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    products: HashMap<ProductId, ProductDimensions>,
    fallback: ProductDimensions,
}

impl StaticCatalog {
    /// A catalog with the five sample products.
    pub fn new() -> Self {
        let products = [
            (1, ProductDimensions::new(10.0, 10.0, 5.0, 2.0).from_warehouse("H3500AAA")),
            (2, ProductDimensions::new(50.0, 20.0, 10.0, 5.0).from_warehouse("C1000AAA")),
            (3, ProductDimensions::new(5.0, 5.0, 5.0, 5.0).from_warehouse("X5000AAA")),
            (4, ProductDimensions::new(30.0, 15.0, 10.0, 4.0).from_warehouse("B1708AAA")),
            (5, ProductDimensions::new(15.0, 12.0, 8.0, 6.0).from_warehouse("N3300AAA")),
        ]
        .into_iter()
        .map(|(id, dims)| (ProductId::new(id), dims))
        .collect();

        Self {
            products,
            fallback: ProductDimensions::new(20.0, 10.0, 5.0, 2.0).from_warehouse("H3500AAA"),
        }
    }

    /// Registers or replaces a product.
    pub fn with_product(mut self, id: ProductId, dims: ProductDimensions) -> Self {
        self.products.insert(id, dims);
        self
    }

    pub fn fallback(&self) -> &ProductDimensions {
        &self.fallback
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn product(&self, id: ProductId) -> Result<ProductDimensions, CatalogError> {
        Ok(self
            .products
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_catalog_known_product() {
        let catalog = StaticCatalog::new();
        let dims = catalog.product(ProductId::new(2)).await.unwrap();
        assert_eq!(dims.weight, 50.0);
        assert_eq!(dims.volume(), 1000.0);
        assert_eq!(dims.warehouse_postal_code.as_deref(), Some("C1000AAA"));
    }

    #[tokio::test]
    async fn static_catalog_unknown_product_uses_fallback() {
        let catalog = StaticCatalog::new();
        let dims = catalog.product(ProductId::new(999)).await.unwrap();
        assert_eq!(&dims, catalog.fallback());
    }

    #[tokio::test]
    async fn static_catalog_override() {
        let catalog = StaticCatalog::new().with_product(
            ProductId::new(1),
            ProductDimensions::new(1.0, 1.0, 1.0, 1.0),
        );
        let dims = catalog.product(ProductId::new(1)).await.unwrap();
        assert_eq!(dims.warehouse_postal_code, None);
    }

    #[test]
    fn dimensions_deserialize_without_warehouse() {
        let dims: ProductDimensions =
            serde_json::from_str(r#"{"weight":1.5,"length":2,"width":3,"height":4}"#).unwrap();
        assert_eq!(dims.volume(), 24.0);
        assert!(dims.warehouse_postal_code.is_none());
    }

    #[tokio::test]
    async fn http_catalog_unreachable_is_unavailable() {
        let client = HttpCatalogClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = client.product(ProductId::new(1)).await.unwrap_err();
        assert!(matches!(err, CatalogError::Unavailable(_)));
    }
}
