//! Notifications sent from logistics back to purchasing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ReservationId, ShippingId};
use reqwest::Client;
use serde::Serialize;

use crate::error::NotifyError;

/// Body of the cancellation notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShipmentCancelledNotice {
    pub shipping_id: ShippingId,
    pub order_id: ReservationId,
    pub cancelled_at: DateTime<Utc>,
}

/// Tells purchasing about shipment changes it has to reflect.
#[async_trait]
pub trait PurchasingNotifier: Send + Sync {
    async fn shipment_cancelled(&self, notice: ShipmentCancelledNotice) -> Result<(), NotifyError>;
}

#[async_trait]
impl<T: PurchasingNotifier + ?Sized> PurchasingNotifier for Arc<T> {
    async fn shipment_cancelled(&self, notice: ShipmentCancelledNotice) -> Result<(), NotifyError> {
        (**self).shipment_cancelled(notice).await
    }
}

/// Posts notices to `{base_url}/shipping-notifications/{id}/cancelled`.
#[derive(Debug, Clone)]
pub struct HttpPurchasingNotifier {
    client: Client,
    base_url: String,
}

impl HttpPurchasingNotifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PurchasingNotifier for HttpPurchasingNotifier {
    #[tracing::instrument(skip(self), fields(shipping_id = %notice.shipping_id))]
    async fn shipment_cancelled(&self, notice: ShipmentCancelledNotice) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(format!(
                "{}/shipping-notifications/{}/cancelled",
                self.base_url, notice.shipping_id
            ))
            .json(&notice)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(format!(
                "purchasing returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Notifier for deployments without a purchasing endpoint: logs and drops.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl PurchasingNotifier for LoggingNotifier {
    async fn shipment_cancelled(&self, notice: ShipmentCancelledNotice) -> Result<(), NotifyError> {
        tracing::info!(
            shipping_id = %notice.shipping_id,
            order_id = %notice.order_id,
            "no purchasing endpoint configured, cancellation notice dropped"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    sent: Vec<ShipmentCancelledNotice>,
    fail: bool,
}

/// In-memory notifier for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPurchasingNotifier {
    state: Arc<Mutex<RecorderState>>,
}

impl InMemoryPurchasingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail every call.
    pub fn set_fail(&self, fail: bool) {
        self.state.lock().unwrap().fail = fail;
    }

    /// Notices delivered so far.
    pub fn sent(&self) -> Vec<ShipmentCancelledNotice> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Waits until at least `count` notices were delivered or `timeout`
    /// elapsed. Returns true if the count was reached.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state.lock().unwrap().sent.len() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl PurchasingNotifier for InMemoryPurchasingNotifier {
    async fn shipment_cancelled(&self, notice: ShipmentCancelledNotice) -> Result<(), NotifyError> {
        let mut state = self.state.lock().unwrap();
        if state.fail {
            return Err(NotifyError::Network("purchasing unreachable".to_string()));
        }
        state.sent.push(notice);
        Ok(())
    }
}
