//! Checkout saga state machine and step list.

use serde::{Deserialize, Serialize};

/// Where a checkout saga is in its lifecycle.
///
/// State transitions:
/// ```text
/// NotStarted ──► Running ──┬──► Completed
///                          └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    #[default]
    NotStarted,

    /// Steps are being executed.
    Running,

    /// A step failed and compensations are in progress.
    Compensating,

    /// All steps completed (terminal state).
    Completed,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl SagaState {
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaState::Completed | SagaState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::NotStarted => "not_started",
            SagaState::Running => "running",
            SagaState::Compensating => "compensating",
            SagaState::Completed => "completed",
            SagaState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One forward step of the checkout saga, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStep {
    /// Reserve stock. Compensated by cancelling the reservation.
    ReserveStock,
    /// Quote and create the shipment at logistics. Last step that can fail.
    CreateShipment,
    /// Empty the cart. Failures are logged, never compensated.
    ClearCart,
}

impl CheckoutStep {
    /// Steps in the order they run.
    pub const ALL: [CheckoutStep; 3] = [
        CheckoutStep::ReserveStock,
        CheckoutStep::CreateShipment,
        CheckoutStep::ClearCart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::ReserveStock => "reserve_stock",
            CheckoutStep::CreateShipment => "create_shipment",
            CheckoutStep::ClearCart => "clear_cart",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
