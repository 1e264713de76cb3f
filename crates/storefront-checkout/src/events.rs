//! # Checkout Events
//!
//! Side-channel notifications from the orchestrator, for UI glue and logs.
//! The state cell (`CheckoutHandle::subscribe`) is the source of truth; the
//! emitter only reports what changed.

use tracing::{info, warn};

use crate::handoff::HandoffPayload;
use crate::orchestrator::{CheckoutPhase, Notice};

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Trait for emitting checkout events (implemented by the UI integration).
pub trait CheckoutEventEmitter: Send + Sync {
    /// Emits a phase transition.
    fn emit_phase(&self, from: CheckoutPhase, to: CheckoutPhase);

    /// Emits a notice shown to the customer.
    fn emit_notice(&self, notice: &Notice);

    /// Emits the payload once the order has been handed to payment.
    fn emit_handoff(&self, payload: &HandoffPayload);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl CheckoutEventEmitter for NoOpEmitter {
    fn emit_phase(&self, _from: CheckoutPhase, _to: CheckoutPhase) {}
    fn emit_notice(&self, _notice: &Notice) {}
    fn emit_handoff(&self, _payload: &HandoffPayload) {}
}

/// Logs every event through `tracing`.
pub struct TracingEmitter;

impl CheckoutEventEmitter for TracingEmitter {
    fn emit_phase(&self, from: CheckoutPhase, to: CheckoutPhase) {
        info!(?from, ?to, "Checkout phase changed");
    }

    fn emit_notice(&self, notice: &Notice) {
        warn!(kind = ?notice.kind, retryable = notice.retryable, message = %notice.message, "Checkout notice");
    }

    fn emit_handoff(&self, payload: &HandoffPayload) {
        info!(order_id = %payload.order_id, amount = %payload.amount, "Order handed off to payment");
    }
}
