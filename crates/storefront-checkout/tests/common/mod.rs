#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use storefront_checkout::{
    CartProvider, CheckoutConfig, CheckoutError, CheckoutEventEmitter, CheckoutHandle,
    CheckoutOrchestrator, CheckoutPhase, CheckoutResult, CheckoutState, DeliveryCostClient,
    HandoffPayload, InMemoryTransferStore, Notice, OrderHandoff, SharedCart, TransferStore,
};
use storefront_checkout::handoff::TransferEntry;
use storefront_core::types::{
    Address, AddressField, CustomerField, DeliveryCostResult, DeliveryValidationResult,
};
use storefront_core::{Cart, Money};

// =============================================================================
// Scripted Delivery Service
// =============================================================================

/// What a scripted call answers.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Ok(T),
    OutOfZone,
    Network,
    Server(u16),
}

impl<T> Outcome<T> {
    fn into_result(self) -> CheckoutResult<T> {
        match self {
            Outcome::Ok(value) => Ok(value),
            Outcome::OutOfZone => Err(CheckoutError::OutOfZone("outside service area".into())),
            Outcome::Network => Err(CheckoutError::Network("connection refused".into())),
            Outcome::Server(status) => Err(CheckoutError::Server {
                status: Some(status),
                message: "internal error".into(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct Scripted<T> {
    delay: Duration,
    outcome: Outcome<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Validate { zip: String, city: String },
    Cost {
        zip: String,
        city: String,
        order_total: Money,
    },
}

/// Delivery service double. Answers per zip code, after a delay.
///
/// Zips without a script are inside the zone, 5 miles away, and cost $25,
/// answered after 50ms.
pub struct ScriptedClient {
    validations: Mutex<HashMap<String, Scripted<DeliveryValidationResult>>>,
    costs: Mutex<HashMap<String, Scripted<DeliveryCostResult>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(ScriptedClient {
            validations: Mutex::new(HashMap::new()),
            costs: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn script_validation(
        &self,
        zip: &str,
        delay_ms: u64,
        outcome: Outcome<DeliveryValidationResult>,
    ) {
        self.validations.lock().unwrap().insert(
            zip.to_string(),
            Scripted {
                delay: Duration::from_millis(delay_ms),
                outcome,
            },
        );
    }

    pub fn script_cost(&self, zip: &str, delay_ms: u64, outcome: Outcome<DeliveryCostResult>) {
        self.costs.lock().unwrap().insert(
            zip.to_string(),
            Scripted {
                delay: Duration::from_millis(delay_ms),
                outcome,
            },
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn validate_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Validate { .. }))
            .count()
    }

    pub fn cost_zips(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Cost { zip, .. } => Some(zip),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DeliveryCostClient for ScriptedClient {
    async fn validate_address(&self, address: &Address) -> CheckoutResult<DeliveryValidationResult> {
        self.calls.lock().unwrap().push(Call::Validate {
            zip: address.zip_code.clone(),
            city: address.city.clone(),
        });

        let script = self
            .validations
            .lock()
            .unwrap()
            .get(&address.zip_code)
            .cloned()
            .unwrap_or(Scripted {
                delay: Duration::from_millis(50),
                outcome: Outcome::Ok(within_zone(5.0)),
            });

        tokio::time::sleep(script.delay).await;
        script.outcome.into_result()
    }

    async fn calculate_delivery_cost(
        &self,
        address: &Address,
        order_total: Money,
    ) -> CheckoutResult<DeliveryCostResult> {
        self.calls.lock().unwrap().push(Call::Cost {
            zip: address.zip_code.clone(),
            city: address.city.clone(),
            order_total,
        });

        let script = self
            .costs
            .lock()
            .unwrap()
            .get(&address.zip_code)
            .cloned()
            .unwrap_or(Scripted {
                delay: Duration::from_millis(50),
                outcome: Outcome::Ok(quote(2_500, false)),
            });

        tokio::time::sleep(script.delay).await;
        script.outcome.into_result()
    }
}

pub fn within_zone(distance_miles: f64) -> DeliveryValidationResult {
    DeliveryValidationResult {
        within_delivery_zone: true,
        distance_miles,
    }
}

pub fn outside_zone(distance_miles: f64) -> DeliveryValidationResult {
    DeliveryValidationResult {
        within_delivery_zone: false,
        distance_miles,
    }
}

pub fn quote(cents: i64, is_free: bool) -> DeliveryCostResult {
    DeliveryCostResult {
        delivery_cost: Money::from_cents(cents),
        is_free_delivery: is_free,
        distance_miles: 5.0,
    }
}

// =============================================================================
// Recording Emitter
// =============================================================================

#[derive(Default)]
pub struct RecordingEmitter {
    phases: Mutex<Vec<CheckoutPhase>>,
    notices: Mutex<Vec<Notice>>,
    handoffs: Mutex<Vec<HandoffPayload>>,
}

impl RecordingEmitter {
    /// Every phase entered, in order.
    pub fn phases(&self) -> Vec<CheckoutPhase> {
        self.phases.lock().unwrap().clone()
    }

    pub fn entered(&self, phase: CheckoutPhase) -> bool {
        self.phases().contains(&phase)
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn handoffs(&self) -> Vec<HandoffPayload> {
        self.handoffs.lock().unwrap().clone()
    }
}

impl CheckoutEventEmitter for RecordingEmitter {
    fn emit_phase(&self, _from: CheckoutPhase, to: CheckoutPhase) {
        self.phases.lock().unwrap().push(to);
    }

    fn emit_notice(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }

    fn emit_handoff(&self, payload: &HandoffPayload) {
        self.handoffs.lock().unwrap().push(payload.clone());
    }
}

// =============================================================================
// Failing Transfer Store
// =============================================================================

/// In-memory store whose first `failures` writes fail.
pub struct FailingStore {
    inner: InMemoryTransferStore,
    failures: AtomicUsize,
}

impl FailingStore {
    pub fn new(failures: usize) -> Arc<Self> {
        Arc::new(FailingStore {
            inner: InMemoryTransferStore::new(),
            failures: AtomicUsize::new(failures),
        })
    }
}

#[async_trait]
impl TransferStore for FailingStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> CheckoutResult<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CheckoutError::Network("storage unavailable".into()));
        }
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> CheckoutResult<Option<TransferEntry>> {
        self.inner.get(key).await
    }

    async fn take(&self, key: &str) -> CheckoutResult<Option<TransferEntry>> {
        self.inner.take(key).await
    }
}

/// In-memory store that writes immediately but acknowledges after `delay`.
pub struct SlowAckStore {
    inner: InMemoryTransferStore,
    delay: Duration,
}

impl SlowAckStore {
    pub fn new(delay_ms: u64) -> Arc<Self> {
        Arc::new(SlowAckStore {
            inner: InMemoryTransferStore::new(),
            delay: Duration::from_millis(delay_ms),
        })
    }
}

#[async_trait]
impl TransferStore for SlowAckStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> CheckoutResult<()> {
        self.inner.put(key, value, ttl).await?;
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> CheckoutResult<Option<TransferEntry>> {
        self.inner.get(key).await
    }

    async fn take(&self, key: &str) -> CheckoutResult<Option<TransferEntry>> {
        self.inner.take(key).await
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub checkout: CheckoutHandle,
    pub client: Arc<ScriptedClient>,
    pub events: Arc<RecordingEmitter>,
    pub handoff: Arc<OrderHandoff>,
}

/// Cart holding a single line worth `cents`.
pub fn cart_worth(cents: i64) -> SharedCart {
    let mut cart = Cart::new();
    if cents > 0 {
        cart.add_item("sofa", "Linen Sofa", Money::from_cents(cents), 1)
            .unwrap();
    }
    SharedCart::new(cart)
}

pub fn start_checkout(
    client: Arc<ScriptedClient>,
    cart: SharedCart,
    store: Arc<dyn TransferStore>,
) -> Harness {
    let config = CheckoutConfig::default();
    let handoff = Arc::new(OrderHandoff::from_config(store, &config));
    let events = Arc::new(RecordingEmitter::default());

    let cart: Arc<dyn CartProvider> = Arc::new(cart);
    let checkout = CheckoutOrchestrator::new(
        &config,
        Arc::clone(&client) as Arc<dyn DeliveryCostClient>,
        cart,
        Arc::clone(&handoff),
    )
    .with_emitter(Arc::clone(&events) as Arc<dyn CheckoutEventEmitter>)
    .start();

    Harness {
        checkout,
        client,
        events,
        handoff,
    }
}

/// Fills in a complete, valid form.
pub async fn fill_form(checkout: &CheckoutHandle, zip: &str) {
    checkout
        .edit_customer(CustomerField::FirstName, "Ada")
        .await
        .unwrap();
    checkout
        .edit_customer(CustomerField::LastName, "Lovelace")
        .await
        .unwrap();
    checkout
        .edit_customer(CustomerField::Email, "ada@example.com")
        .await
        .unwrap();
    checkout
        .edit_customer(CustomerField::Phone, "(213) 555-0199")
        .await
        .unwrap();
    checkout
        .edit_shipping(AddressField::Street, "200 N Spring St")
        .await
        .unwrap();
    checkout
        .edit_shipping(AddressField::ZipCode, zip)
        .await
        .unwrap();
}

/// Waits (in virtual time) until the state satisfies `pred`.
pub async fn wait_until<F>(checkout: &CheckoutHandle, pred: F) -> CheckoutState
where
    F: Fn(&CheckoutState) -> bool,
{
    let mut rx = checkout.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(60), rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for checkout state")
        .expect("checkout stopped")
        .clone();
    state
}

/// Lets every pending timer and request run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(5)).await;
}
