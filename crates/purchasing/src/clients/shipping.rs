//! Logistics client: shipping quotes, shipment creation and cancellation.
//!
//! Purchasing speaks camelCase to its own callers while logistics expects
//! snake_case. The payload types here are the logistics contract; the
//! mapping from purchasing types is done by plain functions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, ProductId, ReservationId, ShippingId, ShippingStatus, TransportType, UserId};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::error::ClientError;

/// Delivery address as purchasing callers send it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    pub street: String,
    pub number: i32,
    pub postal_code: String,
    pub locality_name: String,
}

impl DeliveryAddress {
    /// Names of the required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.street.trim().is_empty() {
            missing.push("street");
        }
        if self.postal_code.trim().is_empty() {
            missing.push("postalCode");
        }
        if self.locality_name.trim().is_empty() {
            missing.push("localityName");
        }
        missing
    }
}

/// Delivery address in the logistics contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddressPayload {
    pub street: String,
    pub number: i32,
    pub postal_code: String,
    pub locality_name: String,
}

impl From<&DeliveryAddress> for ShippingAddressPayload {
    fn from(address: &DeliveryAddress) -> Self {
        Self {
            street: address.street.trim().to_string(),
            number: address.number,
            postal_code: address.postal_code.trim().to_string(),
            locality_name: address.locality_name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingProductPayload {
    pub id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /shipping/cost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRequestPayload {
    pub delivery_address: ShippingAddressPayload,
    pub transport_type: TransportType,
    pub products: Vec<ShippingProductPayload>,
}

/// Body of `POST /shipping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateShippingPayload {
    pub order_id: ReservationId,
    pub user_id: UserId,
    pub delivery_address: ShippingAddressPayload,
    pub transport_type: TransportType,
    pub products: Vec<ShippingProductPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingQuote {
    pub currency: String,
    pub total_cost: Money,
    pub transport_type: TransportType,
    pub estimated_delivery_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCreated {
    pub shipping_id: ShippingId,
    pub status: ShippingStatus,
    pub transport_type: TransportType,
    pub estimated_delivery_at: DateTime<Utc>,
}

/// Answer of `POST /shipping/{id}/cancel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingCancelled {
    pub shipping_id: ShippingId,
    pub status: ShippingStatus,
    pub cancelled_at: DateTime<Utc>,
}

/// Maps cart lines to logistics product lines.
pub fn product_payloads(items: &[CartItem]) -> Vec<ShippingProductPayload> {
    items
        .iter()
        .map(|item| ShippingProductPayload {
            id: item.product_id,
            quantity: item.quantity,
        })
        .collect()
}

/// Quotes, creates and cancels shipments at logistics.
#[async_trait]
pub trait ShippingClient: Send + Sync {
    async fn quote(&self, request: &CostRequestPayload) -> Result<ShippingQuote, ClientError>;

    async fn create_shipment(
        &self,
        request: &CreateShippingPayload,
    ) -> Result<ShippingCreated, ClientError>;

    async fn cancel_shipment(&self, id: ShippingId) -> Result<ShippingCancelled, ClientError>;
}

#[async_trait]
impl<T: ShippingClient + ?Sized> ShippingClient for Arc<T> {
    async fn quote(&self, request: &CostRequestPayload) -> Result<ShippingQuote, ClientError> {
        (**self).quote(request).await
    }

    async fn create_shipment(
        &self,
        request: &CreateShippingPayload,
    ) -> Result<ShippingCreated, ClientError> {
        (**self).create_shipment(request).await
    }

    async fn cancel_shipment(&self, id: ShippingId) -> Result<ShippingCancelled, ClientError> {
        (**self).cancel_shipment(id).await
    }
}

/// HTTP client for the logistics service.
#[derive(Debug, Clone)]
pub struct HttpShippingClient {
    client: Client,
    base_url: String,
}

impl HttpShippingClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    async fn send<R>(&self, request: RequestBuilder) -> Result<R, ClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl ShippingClient for HttpShippingClient {
    #[tracing::instrument(skip(self, request), fields(transport = %request.transport_type))]
    async fn quote(&self, request: &CostRequestPayload) -> Result<ShippingQuote, ClientError> {
        self.post("/shipping/cost", request).await
    }

    #[tracing::instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_shipment(
        &self,
        request: &CreateShippingPayload,
    ) -> Result<ShippingCreated, ClientError> {
        self.post("/shipping", request).await
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_shipment(&self, id: ShippingId) -> Result<ShippingCancelled, ClientError> {
        let path = format!("/shipping/{id}/cancel");
        self.send(self.client.post(self.url(&path))).await
    }
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<ShippingId, CreateShippingPayload>,
    cancelled: HashSet<ShippingId>,
    next_id: i64,
    fail_on_quote: bool,
    fail_on_create: Option<u16>,
    create_delay: Option<Duration>,
    fail_on_cancel: bool,
}

/// In-memory logistics for testing. Every quote costs a flat amount.
#[derive(Debug, Clone)]
pub struct InMemoryShippingClient {
    state: Arc<RwLock<InMemoryShippingState>>,
    flat_cost: Money,
}

impl Default for InMemoryShippingClient {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            flat_cost: Money::from_cents(50_000),
        }
    }
}

impl InMemoryShippingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flat_cost(mut self, cost: Money) -> Self {
        self.flat_cost = cost;
        self
    }

    pub fn set_fail_on_quote(&self, fail: bool) {
        self.state.write().unwrap().fail_on_quote = fail;
    }

    /// Makes shipment creation fail with the given HTTP status; `None`
    /// restores success. 5xx statuses behave like an unreachable service.
    pub fn set_fail_on_create(&self, status: Option<u16>) {
        self.state.write().unwrap().fail_on_create = status;
    }

    /// Delays shipment creation, to exercise caller timeouts.
    pub fn set_create_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().create_delay = delay;
    }

    /// Makes cancellation fail as if logistics were unreachable.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    pub fn is_cancelled(&self, id: ShippingId) -> bool {
        self.state.read().unwrap().cancelled.contains(&id)
    }

    pub fn shipment_count(&self) -> usize {
        self.state.read().unwrap().shipments.len()
    }

    pub fn shipment(&self, id: ShippingId) -> Option<CreateShippingPayload> {
        self.state.read().unwrap().shipments.get(&id).cloned()
    }
}

#[async_trait]
impl ShippingClient for InMemoryShippingClient {
    async fn quote(&self, request: &CostRequestPayload) -> Result<ShippingQuote, ClientError> {
        if self.state.read().unwrap().fail_on_quote {
            return Err(ClientError::Unavailable("connection refused".to_string()));
        }
        Ok(ShippingQuote {
            currency: "ARS".to_string(),
            total_cost: self.flat_cost,
            transport_type: request.transport_type,
            estimated_delivery_at: Utc::now() + chrono::Duration::days(7),
        })
    }

    async fn create_shipment(
        &self,
        request: &CreateShippingPayload,
    ) -> Result<ShippingCreated, ClientError> {
        let delay = self.state.read().unwrap().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap();
        if let Some(status) = state.fail_on_create {
            return Err(ClientError::from_status(status, "shipment creation failed"));
        }

        state.next_id += 1;
        let shipping_id = ShippingId::new(state.next_id);
        state.shipments.insert(shipping_id, request.clone());
        Ok(ShippingCreated {
            shipping_id,
            status: ShippingStatus::Created,
            transport_type: request.transport_type,
            estimated_delivery_at: Utc::now() + chrono::Duration::days(7),
        })
    }

    async fn cancel_shipment(&self, id: ShippingId) -> Result<ShippingCancelled, ClientError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_cancel {
            return Err(ClientError::Unavailable("connection refused".to_string()));
        }
        if !state.shipments.contains_key(&id) {
            return Err(ClientError::from_status(404, format!("shipment {id} not found")));
        }
        if !state.cancelled.insert(id) {
            return Err(ClientError::from_status(409, "shipment already cancelled"));
        }
        Ok(ShippingCancelled {
            shipping_id: id,
            status: ShippingStatus::Cancelled,
            cancelled_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> DeliveryAddress {
        DeliveryAddress {
            street: " Av. Siempre Viva ".to_string(),
            number: 742,
            postal_code: "H3500".to_string(),
            locality_name: "Resistencia".to_string(),
        }
    }

    #[test]
    fn delivery_address_reads_camel_case() {
        let json = serde_json::json!({
            "street": "Av. Siempre Viva",
            "number": 742,
            "postalCode": "H3500",
            "localityName": "Resistencia"
        });
        let parsed: DeliveryAddress = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.postal_code, "H3500");
    }

    #[test]
    fn payload_is_snake_case_and_trimmed() {
        let payload = ShippingAddressPayload::from(&address());
        assert_eq!(payload.street, "Av. Siempre Viva");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["postal_code"], "H3500");
        assert_eq!(json["locality_name"], "Resistencia");
        assert!(json.get("postalCode").is_none());
    }

    #[test]
    fn blank_fields_are_reported() {
        let mut addr = address();
        addr.postal_code = String::new();
        addr.locality_name = " ".to_string();
        assert_eq!(addr.missing_fields(), vec!["postalCode", "localityName"]);
    }

    #[test]
    fn cart_items_map_to_product_ids() {
        let items = [CartItem {
            product_id: ProductId::new(3),
            quantity: 4,
            unit_price: Money::from_cents(100),
        }];
        let json = serde_json::to_value(product_payloads(&items)).unwrap();
        assert_eq!(json, serde_json::json!([{"id": 3, "quantity": 4}]));
    }

    #[tokio::test]
    async fn in_memory_create_can_fail_with_status() {
        let shipping = InMemoryShippingClient::new();
        shipping.set_fail_on_create(Some(422));

        let request = CreateShippingPayload {
            order_id: ReservationId::new(1),
            user_id: UserId::new(1),
            delivery_address: ShippingAddressPayload::from(&address()),
            transport_type: TransportType::Road,
            products: vec![],
        };
        assert!(matches!(
            shipping.create_shipment(&request).await,
            Err(ClientError::Rejected { status: 422, .. })
        ));

        shipping.set_fail_on_create(Some(503));
        assert!(
            shipping
                .create_shipment(&request)
                .await
                .unwrap_err()
                .is_unavailable()
        );
    }

    #[tokio::test]
    async fn in_memory_cancel_rejects_unknown_and_repeated() {
        let shipping = InMemoryShippingClient::new();
        let request = CreateShippingPayload {
            order_id: ReservationId::new(1),
            user_id: UserId::new(1),
            delivery_address: ShippingAddressPayload::from(&address()),
            transport_type: TransportType::Road,
            products: vec![],
        };
        let created = shipping.create_shipment(&request).await.unwrap();

        let cancelled = shipping.cancel_shipment(created.shipping_id).await.unwrap();
        assert_eq!(cancelled.status, ShippingStatus::Cancelled);
        assert!(shipping.is_cancelled(created.shipping_id));

        assert!(matches!(
            shipping.cancel_shipment(created.shipping_id).await,
            Err(ClientError::Rejected { status: 409, .. })
        ));
        assert!(matches!(
            shipping.cancel_shipment(ShippingId::new(99)).await,
            Err(ClientError::Rejected { status: 404, .. })
        ));
    }
}
