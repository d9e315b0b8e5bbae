//! Stock reservation client.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ProductId, ReservationId, UserId};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// Lifecycle state of a reservation as reported by stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /reservas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub purchase_id: String,
    pub user_id: UserId,
    pub products: Vec<ReservationLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub purchase_id: String,
    pub user_id: UserId,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CancelBody<'a> {
    reason: &'a str,
}

/// Reserves and releases stock for a purchase.
#[async_trait]
pub trait StockClient: Send + Sync {
    async fn reserve(&self, request: &ReservationRequest) -> Result<Reservation, ClientError>;

    async fn cancel_reservation(&self, id: ReservationId, reason: &str) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: StockClient + ?Sized> StockClient for Arc<T> {
    async fn reserve(&self, request: &ReservationRequest) -> Result<Reservation, ClientError> {
        (**self).reserve(request).await
    }

    async fn cancel_reservation(&self, id: ReservationId, reason: &str) -> Result<(), ClientError> {
        (**self).cancel_reservation(id, reason).await
    }
}

/// HTTP client for the stock service.
#[derive(Debug, Clone)]
pub struct HttpStockClient {
    client: Client,
    base_url: String,
}

impl HttpStockClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl StockClient for HttpStockClient {
    #[tracing::instrument(skip(self, request), fields(purchase_id = %request.purchase_id))]
    async fn reserve(&self, request: &ReservationRequest) -> Result<Reservation, ClientError> {
        let response = self
            .client
            .post(format!("{}/reservas", self.base_url))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(response.json::<Reservation>().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_reservation(&self, id: ReservationId, reason: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(format!("{}/reservas/{}", self.base_url, id))
            .json(&CancelBody { reason })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), body));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FailMode {
    #[default]
    None,
    Rejected,
    Unavailable,
}

#[derive(Debug, Default)]
struct InMemoryStockState {
    reservations: HashMap<ReservationId, Reservation>,
    cancellations: Vec<(ReservationId, String)>,
    next_id: i64,
    fail_on_reserve: FailMode,
    fail_on_cancel: bool,
}

/// In-memory stock service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStockClient {
    state: Arc<RwLock<InMemoryStockState>>,
}

impl InMemoryStockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next reservations fail as if stock were insufficient.
    pub fn set_insufficient_stock(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve =
            if fail { FailMode::Rejected } else { FailMode::None };
    }

    /// Makes the next reservations fail as if stock were unreachable.
    pub fn set_unavailable(&self, fail: bool) {
        self.state.write().unwrap().fail_on_reserve =
            if fail { FailMode::Unavailable } else { FailMode::None };
    }

    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    pub fn reservation(&self, id: ReservationId) -> Option<Reservation> {
        self.state.read().unwrap().reservations.get(&id).cloned()
    }

    /// Cancellation requests received, with their reasons.
    pub fn cancellations(&self) -> Vec<(ReservationId, String)> {
        self.state.read().unwrap().cancellations.clone()
    }
}

#[async_trait]
impl StockClient for InMemoryStockClient {
    async fn reserve(&self, request: &ReservationRequest) -> Result<Reservation, ClientError> {
        let mut state = self.state.write().unwrap();

        match state.fail_on_reserve {
            FailMode::Rejected => {
                return Err(ClientError::from_status(409, "Insufficient stock"));
            }
            FailMode::Unavailable => {
                return Err(ClientError::Unavailable("connection refused".to_string()));
            }
            FailMode::None => {}
        }

        state.next_id += 1;
        let now = Utc::now();
        let reservation = Reservation {
            reservation_id: ReservationId::new(state.next_id),
            purchase_id: request.purchase_id.clone(),
            user_id: request.user_id,
            status: ReservationStatus::Pending,
            expires_at: now + chrono::Duration::minutes(15),
            created_at: now,
        };
        state
            .reservations
            .insert(reservation.reservation_id, reservation.clone());
        Ok(reservation)
    }

    async fn cancel_reservation(&self, id: ReservationId, reason: &str) -> Result<(), ClientError> {
        let mut state = self.state.write().unwrap();
        state.cancellations.push((id, reason.to_string()));

        if state.fail_on_cancel {
            return Err(ClientError::Unavailable("connection refused".to_string()));
        }
        match state.reservations.get_mut(&id) {
            Some(reservation) => {
                reservation.status = ReservationStatus::Cancelled;
                Ok(())
            }
            None => Err(ClientError::from_status(404, "Reservation not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReservationRequest {
        ReservationRequest {
            purchase_id: "PUR-1".to_string(),
            user_id: UserId::new(4),
            products: vec![ReservationLine {
                product_id: ProductId::new(1),
                quantity: 2,
            }],
        }
    }

    #[test]
    fn request_wire_format_is_camel_case() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["purchaseId"], "PUR-1");
        assert_eq!(json["userId"], 4);
        assert_eq!(json["products"][0]["productId"], 1);
    }

    #[test]
    fn reservation_parses_unknown_status() {
        let json = serde_json::json!({
            "reservationId": 12,
            "purchaseId": "PUR-1",
            "userId": 4,
            "status": "expired",
            "expiresAt": "2026-01-01T00:00:00Z",
            "createdAt": "2026-01-01T00:00:00Z"
        });
        let reservation: Reservation = serde_json::from_value(json).unwrap();
        assert_eq!(reservation.reservation_id, ReservationId::new(12));
        assert_eq!(reservation.status, ReservationStatus::Unknown);
    }

    #[tokio::test]
    async fn test_reserve_and_cancel() {
        let stock = InMemoryStockClient::new();
        let reservation = stock.reserve(&request()).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);

        stock
            .cancel_reservation(reservation.reservation_id, "checkout failed")
            .await
            .unwrap();
        assert_eq!(
            stock.reservation(reservation.reservation_id).unwrap().status,
            ReservationStatus::Cancelled
        );
        assert_eq!(stock.cancellations().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_modes() {
        let stock = InMemoryStockClient::new();
        stock.set_insufficient_stock(true);
        assert!(matches!(
            stock.reserve(&request()).await,
            Err(ClientError::Rejected { status: 409, .. })
        ));

        stock.set_unavailable(true);
        assert!(stock.reserve(&request()).await.unwrap_err().is_unavailable());
        assert_eq!(stock.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_http_client_unreachable() {
        let stock = HttpStockClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = stock.reserve(&request()).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
