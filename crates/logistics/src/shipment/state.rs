//! Shipment status state machine.
//!
//! Pure decision logic: given the current status and a requested one, say
//! what should happen. Persistence and side effects live in the service.

use common::ShippingStatus;
use thiserror::Error;

/// Why a requested status change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The shipment already reached `delivered` or `cancelled`.
    #[error("cannot change status of a {0} shipment")]
    Terminal(ShippingStatus),

    /// Shipments never go back to `created`.
    #[error("cannot move a {0} shipment back to created")]
    BackToCreated(ShippingStatus),
}

/// What a requested status change resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Already in the requested status; nothing to record.
    NoOp,
    /// Move to the given non-terminal or `delivered` status.
    Advance(ShippingStatus),
    /// Move to `cancelled`; purchasing must be told.
    Cancel,
}

/// Decides how to move from `current` to `target`.
pub fn plan(current: ShippingStatus, target: ShippingStatus) -> Result<Transition, TransitionError> {
    if current.is_terminal() {
        return Err(TransitionError::Terminal(current));
    }
    if target == current {
        return Ok(Transition::NoOp);
    }
    match target {
        ShippingStatus::Created => Err(TransitionError::BackToCreated(current)),
        ShippingStatus::Cancelled => Ok(Transition::Cancel),
        other => Ok(Transition::Advance(other)),
    }
}

/// Checks that a shipment in `current` may be cancelled.
pub fn plan_cancel(current: ShippingStatus) -> Result<(), TransitionError> {
    if current.can_cancel() {
        Ok(())
    } else {
        Err(TransitionError::Terminal(current))
    }
}
