//! # Checkout Orchestrator
//!
//! The checkout state machine. Consumes form edits and "continue", drives
//! the live estimator and the authoritative quote, prices the order and hands
//! it to payment.
//!
//! ## Phases
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──edit──► EditingAddress ◄──────────────────────────────┐        │
//! │                       │                                        │        │
//! │                   continue                                     │        │
//! │                       ▼                                        │        │
//! │                  Validating ──zone / network / server──► ValidationFailed│
//! │                       │ in zone                                ▲        │
//! │                       ▼                                        │        │
//! │         ValidatingCostAfterSuccess ──out of zone───────────────┘        │
//! │               │                │                                        │
//! │           quoted          transient failure                             │
//! │               ▼                ▼                                        │
//! │        ReadyForHandoff   CostCalculationDegraded                        │
//! │               └───────┬────────┘                                        │
//! │                       ▼                                                 │
//! │                  Submitting ──write failed──► SubmissionFailed ──┐      │
//! │                       │                       (draft retained)   │      │
//! │                       ▼                                          │      │
//! │                HandoffComplete (terminal)        back to EditingAddress │
//! │                                                                         │
//! │   dispose() from anywhere ──► Disposed                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//! One actor task owns the state and is its only writer. Remote calls run in
//! a `JoinSet` whose results come back into the same `select!` loop. Every
//! authoritative request is tagged with the form revision it was issued for;
//! an edit bumps the revision, so a result that lands afterwards is stale and
//! is dropped.

use std::sync::Arc;

use serde::Serialize;
use storefront_core::pricing::{DeliveryPolicy, PricingAggregator};
use storefront_core::types::{
    Address, AddressField, CheckoutForm, CustomerField, DeliveryCostResult, DeliveryEstimate,
    DeliveryValidationResult, LineItem, OrderDraft, PricingBreakdown, ServiceArea,
};
use storefront_core::validation::validate_checkout_form;
use storefront_core::{Money, ValidationError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cart::CartProvider;
use crate::client::DeliveryCostClient;
use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};
use crate::estimator::{DebouncedEstimator, EstimatorConfig, EstimatorHandle};
use crate::events::{CheckoutEventEmitter, NoOpEmitter};
use crate::handoff::{HandoffPayload, OrderHandoff};

// =============================================================================
// Observable State
// =============================================================================

/// Where the checkout is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPhase {
    Idle,
    EditingAddress,
    Validating,
    ValidationFailed,
    ValidatingCostAfterSuccess,
    ReadyForHandoff,
    CostCalculationDegraded,
    Submitting,
    HandoffComplete,
    SubmissionFailed,
    Disposed,
}

impl CheckoutPhase {
    /// True while an authoritative request or handoff is running.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CheckoutPhase::Validating
                | CheckoutPhase::ValidatingCostAfterSuccess
                | CheckoutPhase::ReadyForHandoff
                | CheckoutPhase::CostCalculationDegraded
                | CheckoutPhase::Submitting
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutPhase::HandoffComplete | CheckoutPhase::Disposed)
    }
}

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    FormInvalid,
    EmptyCart,
    OutOfZone,
    /// Network or service trouble; continuing again may work.
    Transient,
    /// The final delivery cost is the nominal fallback.
    CostDegraded,
    /// The form changed while a quote was running.
    Stale,
    HandoffFailed,
    Internal,
}

/// Message for the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub retryable: bool,
}

impl Notice {
    pub fn from_error(err: &CheckoutError) -> Self {
        let kind = match err {
            CheckoutError::FormInvalid(_) => NoticeKind::FormInvalid,
            CheckoutError::EmptyCart => NoticeKind::EmptyCart,
            CheckoutError::OutOfZone(_) => NoticeKind::OutOfZone,
            CheckoutError::Network(_) | CheckoutError::Server { .. } => NoticeKind::Transient,
            CheckoutError::Handoff(_) => NoticeKind::HandoffFailed,
            _ => NoticeKind::Internal,
        };

        Notice {
            kind,
            message: err.user_message(),
            retryable: err.is_retryable(),
        }
    }

    fn degraded(shipping: Money) -> Self {
        let message = if shipping.is_zero() {
            "We couldn't confirm the delivery cost, but your order qualifies for free delivery."
                .to_string()
        } else {
            format!(
                "We couldn't confirm the exact delivery cost, so the standard {shipping} delivery fee applies."
            )
        };

        Notice {
            kind: NoticeKind::CostDegraded,
            message,
            retryable: false,
        }
    }

    fn stale() -> Self {
        Notice {
            kind: NoticeKind::Stale,
            message: "Your details changed while we were checking them. Please continue again."
                .to_string(),
            retryable: true,
        }
    }
}

/// A validation failure attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldError {
    fn from(err: &ValidationError) -> Self {
        FieldError {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// Everything the checkout page renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutState {
    pub phase: CheckoutPhase,
    pub form: CheckoutForm,
    pub field_errors: Vec<FieldError>,
    /// Live estimate; display only, never used for the order.
    pub estimate: Option<DeliveryEstimate>,
    /// Approximate pricing next to the live estimate.
    pub estimated_pricing: Option<PricingBreakdown>,
    /// Authoritative pricing; replaces the estimate once computed.
    pub pricing: Option<PricingBreakdown>,
    pub draft: Option<OrderDraft>,
    pub notice: Option<Notice>,
}

impl Default for CheckoutState {
    fn default() -> Self {
        CheckoutState {
            phase: CheckoutPhase::Idle,
            form: CheckoutForm::default(),
            field_errors: Vec::new(),
            estimate: None,
            estimated_pricing: None,
            pricing: None,
            draft: None,
            notice: None,
        }
    }
}

impl CheckoutState {
    /// Shipping currently displayed: authoritative if known, else estimated.
    pub fn shipping(&self) -> Money {
        self.pricing
            .or(self.estimated_pricing)
            .map(|p| p.shipping())
            .unwrap_or_default()
    }

    /// True when the last attempt failed because of the delivery zone.
    pub fn has_zone_error(&self) -> bool {
        matches!(&self.notice, Some(n) if n.kind == NoticeKind::OutOfZone)
    }
}

// =============================================================================
// Handle & Commands
// =============================================================================

/// A single form edit.
#[derive(Debug, Clone)]
enum FormEdit {
    Shipping(AddressField, String),
    Billing(AddressField, String),
    BillingSameAsShipping(bool),
    Customer(CustomerField, String),
}

impl FormEdit {
    fn apply(&self, form: &mut CheckoutForm) {
        match self {
            FormEdit::Shipping(field, value) => form.shipping_address.set(*field, value),
            FormEdit::Billing(field, value) => form.billing_address.set(*field, value),
            FormEdit::BillingSameAsShipping(same) => form.billing_same_as_shipping = *same,
            FormEdit::Customer(field, value) => form.customer.set(*field, value),
        }
    }

    /// Name the validator uses for the edited field.
    fn field_name(&self) -> String {
        match self {
            FormEdit::Shipping(field, _) => format!("shipping_address.{}", field.name()),
            FormEdit::Billing(field, _) => format!("billing_address.{}", field.name()),
            FormEdit::BillingSameAsShipping(_) => "billing_same_as_shipping".to_string(),
            FormEdit::Customer(field, _) => field.name().to_string(),
        }
    }
}

#[derive(Debug)]
enum CheckoutCommand {
    Edit(FormEdit),
    Continue,
    Dispose(oneshot::Sender<()>),
}

/// Handle for driving a checkout.
#[derive(Clone)]
pub struct CheckoutHandle {
    cmd_tx: mpsc::Sender<CheckoutCommand>,
    state_rx: watch::Receiver<CheckoutState>,
}

impl CheckoutHandle {
    pub async fn edit_shipping(&self, field: AddressField, value: impl Into<String>) -> CheckoutResult<()> {
        self.send(CheckoutCommand::Edit(FormEdit::Shipping(field, value.into())))
            .await
    }

    pub async fn edit_billing(&self, field: AddressField, value: impl Into<String>) -> CheckoutResult<()> {
        self.send(CheckoutCommand::Edit(FormEdit::Billing(field, value.into())))
            .await
    }

    pub async fn set_billing_same_as_shipping(&self, same: bool) -> CheckoutResult<()> {
        self.send(CheckoutCommand::Edit(FormEdit::BillingSameAsShipping(same)))
            .await
    }

    pub async fn edit_customer(&self, field: CustomerField, value: impl Into<String>) -> CheckoutResult<()> {
        self.send(CheckoutCommand::Edit(FormEdit::Customer(field, value.into())))
            .await
    }

    /// "Continue to payment". Ignored while a request is already running.
    pub async fn continue_to_payment(&self) -> CheckoutResult<()> {
        self.send(CheckoutCommand::Continue).await
    }

    /// Stops the checkout. No state changes after this returns.
    pub async fn dispose(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(CheckoutCommand::Dispose(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> CheckoutState {
        self.state_rx.borrow().clone()
    }

    /// Watches state changes.
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state_rx.clone()
    }

    async fn send(&self, cmd: CheckoutCommand) -> CheckoutResult<()> {
        self.cmd_tx.send(cmd).await.map_err(|_| CheckoutError::Disposed)
    }
}

// =============================================================================
// Checkout Orchestrator
// =============================================================================

/// Builds and starts a checkout.
pub struct CheckoutOrchestrator {
    client: Arc<dyn DeliveryCostClient>,
    cart: Arc<dyn CartProvider>,
    handoff: Arc<OrderHandoff>,
    emitter: Arc<dyn CheckoutEventEmitter>,
    estimator_config: EstimatorConfig,
    service_area: ServiceArea,
    pricing: PricingAggregator,
    policy: DeliveryPolicy,
}

impl CheckoutOrchestrator {
    pub fn new(
        config: &CheckoutConfig,
        client: Arc<dyn DeliveryCostClient>,
        cart: Arc<dyn CartProvider>,
        handoff: Arc<OrderHandoff>,
    ) -> Self {
        CheckoutOrchestrator {
            client,
            cart,
            handoff,
            emitter: Arc::new(NoOpEmitter),
            estimator_config: EstimatorConfig::from(config),
            service_area: config.service_area(),
            pricing: PricingAggregator::default(),
            policy: DeliveryPolicy::default(),
        }
    }

    /// Replaces the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn CheckoutEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Starts the estimator and the orchestrator, returning a handle.
    pub fn start(self) -> CheckoutHandle {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let (state_tx, state_rx) = watch::channel(CheckoutState::default());

        let estimator =
            DebouncedEstimator::new(self.estimator_config.clone(), Arc::clone(&self.client)).start();
        let estimate_rx = estimator.subscribe();

        let session = Session {
            deps: self,
            estimator,
            estimate_rx,
            estimator_alive: true,
            state: CheckoutState::default(),
            state_tx,
            revision: 0,
            auth: None,
            in_flight: JoinSet::new(),
            retained: None,
            zone_pinned: false,
            disposed: false,
        };

        tokio::spawn(session.run(cmd_rx));

        CheckoutHandle { cmd_tx, state_rx }
    }
}

// =============================================================================
// Session (actor state)
// =============================================================================

/// The authoritative request currently running.
struct AuthContext {
    /// Form revision the request was issued for.
    revision: u64,
    items: Vec<LineItem>,
    subtotal: Money,
    address: Address,
    validation: Option<DeliveryValidationResult>,
    draft: Option<OrderDraft>,
}

/// A priced draft whose handoff failed, kept for a retry.
struct RetainedDraft {
    revision: u64,
    draft: OrderDraft,
}

enum AuthEvent {
    Validated(CheckoutResult<DeliveryValidationResult>),
    Costed(CheckoutResult<DeliveryCostResult>),
    HandedOff(CheckoutResult<HandoffPayload>),
}

struct Session {
    deps: CheckoutOrchestrator,
    estimator: EstimatorHandle,
    estimate_rx: watch::Receiver<Option<DeliveryEstimate>>,
    estimator_alive: bool,
    state: CheckoutState,
    state_tx: watch::Sender<CheckoutState>,
    /// Bumped on every form edit.
    revision: u64,
    auth: Option<AuthContext>,
    in_flight: JoinSet<AuthEvent>,
    retained: Option<RetainedDraft>,
    /// Set by a zone failure; the out-of-zone estimate stays until the
    /// shipping address is edited.
    zone_pinned: bool,
    disposed: bool,
}

impl Session {
    /// Main orchestrator loop.
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<CheckoutCommand>) {
        info!("Checkout started");

        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(CheckoutCommand::Edit(edit)) => self.handle_edit(edit).await,
                        Some(CheckoutCommand::Continue) => self.handle_continue(),
                        Some(CheckoutCommand::Dispose(ack)) => {
                            self.dispose().await;
                            let _ = ack.send(());
                            break;
                        }
                        None => {
                            self.dispose().await;
                            break;
                        }
                    }
                }
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    match joined {
                        Ok(event) => self.handle_auth_event(event).await,
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => {
                            error!(error = %e, "Authoritative request task failed");
                            self.auth = None;
                            self.fail_attempt(CheckoutError::Server {
                                status: None,
                                message: e.to_string(),
                            });
                        }
                    }
                }
                changed = self.estimate_rx.changed(), if self.estimator_alive => {
                    match changed {
                        Ok(()) => {
                            let estimate = self.estimate_rx.borrow_and_update().clone();
                            self.handle_estimate(estimate);
                        }
                        Err(_) => self.estimator_alive = false,
                    }
                }
            }
        }

        info!("Checkout stopped");
    }

    // =========================================================================
    // Edits
    // =========================================================================

    async fn handle_edit(&mut self, edit: FormEdit) {
        if self.state.phase == CheckoutPhase::HandoffComplete {
            debug!("Edit ignored: order already handed off");
            return;
        }

        edit.apply(&mut self.state.form);
        self.revision += 1;

        let field = edit.field_name();
        self.state.field_errors.retain(|e| e.field != field);
        self.state.notice = None;
        self.invalidate_quote();
        self.transition(CheckoutPhase::EditingAddress);

        if let FormEdit::Shipping(..) = edit {
            self.zone_pinned = false;
            let address = self.state.form.shipping_address.clone();
            let subtotal = self.deps.cart.subtotal();
            if let Err(e) = self.estimator.submit(address, subtotal).await {
                warn!(error = %e, "Could not forward address to estimator");
            }
        }

        self.publish();
    }

    /// Drops authoritative pricing and any retained draft.
    ///
    /// A request still in flight is left running; its result will be stale.
    fn invalidate_quote(&mut self) {
        self.state.pricing = None;
        self.state.draft = None;
        self.retained = None;
        self.refresh_estimated_pricing();
    }

    fn handle_estimate(&mut self, estimate: Option<DeliveryEstimate>) {
        if self.state.pricing.is_some() {
            debug!("Live estimate ignored: authoritative price is set");
            return;
        }
        if self.zone_pinned {
            debug!("Live estimate ignored: address is outside the delivery zone");
            return;
        }

        self.state.estimate = estimate;
        self.refresh_estimated_pricing();
        self.publish();
    }

    fn refresh_estimated_pricing(&mut self) {
        let subtotal = self.deps.cart.subtotal();
        self.state.estimated_pricing = self
            .state
            .estimate
            .as_ref()
            .and_then(|estimate| self.deps.pricing.price_estimate(subtotal, estimate).ok());
    }

    // =========================================================================
    // Continue
    // =========================================================================

    fn handle_continue(&mut self) {
        if self.auth.is_some() {
            debug!(phase = ?self.state.phase, "Continue ignored: request already in flight");
            return;
        }
        if self.state.phase == CheckoutPhase::HandoffComplete {
            debug!("Continue ignored: order already handed off");
            return;
        }

        if let Some(retained) = self.retained.take() {
            if retained.revision == self.revision {
                info!(order_id = %retained.draft.id(), "Retrying handoff");
                self.state.notice = None;
                self.submit(retained.draft, retained.revision);
                self.publish();
                return;
            }
        }

        if let Err(errors) = validate_checkout_form(&self.state.form) {
            debug!(count = errors.len(), "Checkout form invalid");
            self.state.field_errors = errors.iter().map(FieldError::from).collect();
            self.reject(CheckoutError::FormInvalid(errors));
            return;
        }
        self.state.field_errors.clear();

        let items = self.deps.cart.items();
        if items.is_empty() {
            self.reject(CheckoutError::EmptyCart);
            return;
        }

        let subtotal = self.deps.cart.subtotal();
        let address = self
            .state
            .form
            .shipping_address
            .with_zone_defaults(&self.deps.service_area);

        info!(zip = %address.zip_code, subtotal = %subtotal, revision = self.revision, "Validating delivery address");

        self.state.notice = None;
        self.auth = Some(AuthContext {
            revision: self.revision,
            items,
            subtotal,
            address: address.clone(),
            validation: None,
            draft: None,
        });
        self.transition(CheckoutPhase::Validating);

        let client = Arc::clone(&self.deps.client);
        self.in_flight.spawn(async move {
            AuthEvent::Validated(client.validate_address(&address).await)
        });
        self.publish();
    }

    /// Rejects a continue before any network call.
    fn reject(&mut self, err: CheckoutError) {
        self.set_notice(Notice::from_error(&err));
        self.transition(CheckoutPhase::EditingAddress);
        self.publish();
    }

    // =========================================================================
    // Authoritative Results
    // =========================================================================

    async fn handle_auth_event(&mut self, event: AuthEvent) {
        let Some(mut ctx) = self.auth.take() else {
            return;
        };

        if ctx.revision != self.revision {
            info!(
                issued_for = ctx.revision,
                current = self.revision,
                "Dropping stale authoritative result"
            );
            if let AuthEvent::HandedOff(Ok(payload)) = &event {
                if let Err(e) = self.deps.handoff.withdraw(&payload.order_id).await {
                    warn!(error = %e, "Could not withdraw stale pending order");
                }
            }
            self.set_notice(Notice::stale());
            self.publish();
            return;
        }

        match event {
            AuthEvent::Validated(Ok(validation)) if validation.within_delivery_zone => {
                debug!(distance = validation.distance_miles, "Address inside delivery zone");
                ctx.validation = Some(validation);
                self.transition(CheckoutPhase::ValidatingCostAfterSuccess);

                let client = Arc::clone(&self.deps.client);
                let address = ctx.address.clone();
                let subtotal = ctx.subtotal;
                self.in_flight.spawn(async move {
                    AuthEvent::Costed(client.calculate_delivery_cost(&address, subtotal).await)
                });
                self.auth = Some(ctx);
            }
            AuthEvent::Validated(Ok(_)) => {
                self.zone_failure(CheckoutError::OutOfZone(
                    "address is outside the delivery zone".into(),
                ));
            }
            AuthEvent::Validated(Err(e)) if e.is_zone_error() => self.zone_failure(e),
            AuthEvent::Validated(Err(e)) => {
                warn!(error = %e, "Address validation failed");
                self.fail_attempt(e);
            }
            AuthEvent::Costed(Ok(quote)) => self.price_order(ctx, Some(quote)),
            AuthEvent::Costed(Err(e)) if e.is_zone_error() => self.zone_failure(e),
            AuthEvent::Costed(Err(e)) => {
                warn!(error = %e, "Delivery cost failed after validation, using fallback");
                self.price_order(ctx, None);
            }
            AuthEvent::HandedOff(Ok(payload)) => {
                info!(order_id = %payload.order_id, total = %payload.total, "Checkout complete");
                self.state.draft = ctx.draft;
                self.transition(CheckoutPhase::HandoffComplete);
                self.deps.emitter.emit_handoff(&payload);
            }
            AuthEvent::HandedOff(Err(e)) => {
                error!(error = %e, "Handoff failed");
                if let Some(draft) = ctx.draft {
                    self.retained = Some(RetainedDraft {
                        revision: ctx.revision,
                        draft,
                    });
                }
                self.transition(CheckoutPhase::SubmissionFailed);
                self.set_notice(Notice::from_error(&e));
                self.transition(CheckoutPhase::EditingAddress);
            }
        }

        self.publish();
    }

    /// Final shipping, tax and total, then the draft, then the handoff.
    fn price_order(&mut self, ctx: AuthContext, quote: Option<DeliveryCostResult>) {
        let Some(validation) = ctx.validation else {
            error!("Cost result without a validation result");
            self.fail_attempt(CheckoutError::Server {
                status: None,
                message: "cost received before validation".into(),
            });
            return;
        };

        let priced = self
            .deps
            .policy
            .finalize(ctx.subtotal, &validation, quote.as_ref())
            .and_then(|resolved| {
                self.deps
                    .pricing
                    .price(ctx.subtotal, resolved.shipping)
                    .map(|pricing| (resolved, pricing))
            });

        let (resolved, pricing) = match priced {
            Ok(priced) => priced,
            Err(e) => {
                error!(error = %e, "Pricing rejected the quote");
                self.fail_attempt(CheckoutError::Pricing(e));
                return;
            }
        };

        // The authoritative price replaces the live estimate outright
        self.state.estimate = None;
        self.state.estimated_pricing = None;
        self.state.pricing = Some(pricing);

        // The order carries the address that was quoted, city and state filled in
        let mut form = self.state.form.clone();
        form.shipping_address = ctx.address;
        let draft = OrderDraft::new(ctx.items, &form, pricing, resolved.facts());
        self.state.draft = Some(draft.clone());

        if resolved.degraded {
            self.transition(CheckoutPhase::CostCalculationDegraded);
            self.set_notice(Notice::degraded(resolved.shipping));
        } else {
            self.transition(CheckoutPhase::ReadyForHandoff);
        }

        info!(
            order_id = %draft.id(),
            shipping = %pricing.shipping(),
            tax = %pricing.tax(),
            total = %pricing.total(),
            free = resolved.is_free,
            degraded = resolved.degraded,
            "Order priced"
        );

        self.submit(draft, ctx.revision);
    }

    fn submit(&mut self, draft: OrderDraft, revision: u64) {
        self.transition(CheckoutPhase::Submitting);

        let handoff = Arc::clone(&self.deps.handoff);
        let to_write = draft.clone();
        self.in_flight.spawn(async move {
            AuthEvent::HandedOff(handoff.handoff(&to_write).await)
        });

        self.auth = Some(AuthContext {
            revision,
            items: draft.items().to_vec(),
            subtotal: draft.pricing().subtotal(),
            address: draft.shipping_address().clone(),
            validation: None,
            draft: Some(draft),
        });
    }

    /// Zone ineligibility: shipping is forced to zero and the customer has to
    /// change the address.
    fn zone_failure(&mut self, err: CheckoutError) {
        info!("Address outside delivery zone");
        self.transition(CheckoutPhase::ValidationFailed);

        self.state.pricing = None;
        self.state.draft = None;
        self.state.estimate = Some(DeliveryEstimate::out_of_zone());
        self.zone_pinned = true;
        self.refresh_estimated_pricing();

        self.set_notice(Notice::from_error(&err));
        self.transition(CheckoutPhase::EditingAddress);
    }

    /// Transient or internal failure of the authoritative path.
    fn fail_attempt(&mut self, err: CheckoutError) {
        self.transition(CheckoutPhase::ValidationFailed);
        self.set_notice(Notice::from_error(&err));
        self.transition(CheckoutPhase::EditingAddress);
        self.publish();
    }

    // =========================================================================
    // Publishing
    // =========================================================================

    fn transition(&mut self, to: CheckoutPhase) {
        let from = self.state.phase;
        if from == to {
            return;
        }

        debug!(?from, ?to, "Checkout phase transition");
        self.state.phase = to;
        self.deps.emitter.emit_phase(from, to);
        self.publish();
    }

    fn set_notice(&mut self, notice: Notice) {
        self.deps.emitter.emit_notice(&notice);
        self.state.notice = Some(notice);
    }

    fn publish(&self) {
        if self.disposed {
            return;
        }

        let next = &self.state;
        self.state_tx.send_if_modified(|current| {
            if current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }

    async fn dispose(&mut self) {
        info!("Disposing checkout");
        self.estimator.dispose().await;
        self.in_flight.abort_all();
        while self.in_flight.join_next().await.is_some() {}

        // A handoff cancelled after its write leaves the slot filled.
        if let Some(draft) = self.auth.take().and_then(|ctx| ctx.draft) {
            match self.deps.handoff.withdraw(draft.id()).await {
                Ok(true) => info!(order_id = draft.id(), "Withdrew order of disposed checkout"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "Could not withdraw order of disposed checkout"),
            }
        }

        self.transition(CheckoutPhase::Disposed);
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_phases() {
        assert!(CheckoutPhase::Validating.is_busy());
        assert!(CheckoutPhase::Submitting.is_busy());
        assert!(!CheckoutPhase::EditingAddress.is_busy());
        assert!(!CheckoutPhase::HandoffComplete.is_busy());
        assert!(CheckoutPhase::HandoffComplete.is_terminal());
    }

    #[test]
    fn test_notice_from_error() {
        let zone = Notice::from_error(&CheckoutError::OutOfZone("far".into()));
        assert_eq!(zone.kind, NoticeKind::OutOfZone);
        assert!(!zone.retryable);

        let network = Notice::from_error(&CheckoutError::Network("down".into()));
        assert_eq!(network.kind, NoticeKind::Transient);
        assert!(network.retryable);
    }

    #[test]
    fn test_degraded_notice_wording() {
        let paid = Notice::degraded(Money::from_cents(5_000));
        assert_eq!(paid.kind, NoticeKind::CostDegraded);
        assert!(paid.message.contains("$50.00"));

        let free = Notice::degraded(Money::zero());
        assert!(free.message.contains("free delivery"));
        assert!(!free.message.contains("$0.00"));
    }

    #[test]
    fn test_edit_field_names_match_validation() {
        let edit = FormEdit::Shipping(AddressField::ZipCode, "90001".into());
        assert_eq!(edit.field_name(), "shipping_address.zip_code");

        let edit = FormEdit::Customer(CustomerField::Email, "a@b.co".into());
        assert_eq!(edit.field_name(), "email");
    }

    #[test]
    fn test_shipping_prefers_authoritative_pricing() {
        let mut state = CheckoutState::default();
        assert!(state.shipping().is_zero());

        let estimate = PricingAggregator::default()
            .price(Money::from_cents(10_000), Money::from_cents(5_000))
            .unwrap();
        let authoritative = PricingAggregator::default()
            .price(Money::from_cents(10_000), Money::from_cents(2_000))
            .unwrap();

        state.estimated_pricing = Some(estimate);
        assert_eq!(state.shipping().cents(), 5_000);

        state.pricing = Some(authoritative);
        assert_eq!(state.shipping().cents(), 2_000);
    }
}
