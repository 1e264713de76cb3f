//! # Order Handoff
//!
//! Passes a priced [`OrderDraft`] to the payment step.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Orchestrator                    TransferStore            Payment step  │
//! │  ────────────                    ─────────────            ────────────  │
//! │                                                                         │
//! │  handoff(&draft) ──► JSON ──► put("pendingOrder", ttl)                  │
//! │                                        │                                │
//! │                     Notify ────────────┼───────────────► ready()        │
//! │                                        │                                │
//! │                                        └──────────────► claim()         │
//! │                                          (take + expiry check)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::money::{major_units, Money};
use storefront_core::types::{Address, OrderDraft};
use storefront_core::PENDING_ORDER_KEY;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Payload
// =============================================================================

/// One line of the handed-off order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffItem {
    pub product_id: String,
    pub quantity: i64,
    #[serde(with = "major_units")]
    pub price: Money,
    pub name: String,
}

/// What the payment step reads from the `pendingOrder` slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub order_id: String,
    pub items: Vec<HandoffItem>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_name: String,
    #[serde(with = "major_units")]
    pub delivery_cost: Money,
    pub is_free_delivery: bool,
    pub distance_miles: f64,
    pub delivery_zone_validated: bool,
    #[serde(with = "major_units")]
    pub subtotal: Money,
    #[serde(with = "major_units")]
    pub tax: Money,
    #[serde(with = "major_units")]
    pub total: Money,
    /// Amount to charge; always equal to `total`.
    #[serde(with = "major_units")]
    pub amount: Money,
    pub created_at: String,
}

impl From<&OrderDraft> for HandoffPayload {
    fn from(draft: &OrderDraft) -> Self {
        let pricing = draft.pricing();
        let customer = draft.customer();

        HandoffPayload {
            order_id: draft.id().to_string(),
            items: draft
                .items()
                .iter()
                .map(|item| HandoffItem {
                    product_id: item.product_id.clone(),
                    quantity: item.quantity,
                    price: item.unit_price,
                    name: item.name.clone(),
                })
                .collect(),
            shipping_address: draft.shipping_address().clone(),
            billing_address: draft.billing_address().clone(),
            customer_email: customer.email.clone(),
            customer_phone: customer.phone.clone(),
            customer_name: customer.full_name(),
            delivery_cost: pricing.shipping(),
            is_free_delivery: draft.is_free_delivery(),
            distance_miles: draft.distance_miles(),
            delivery_zone_validated: draft.zone_validated(),
            subtotal: pricing.subtotal(),
            tax: pricing.tax(),
            total: pricing.total(),
            amount: pricing.total(),
            created_at: draft.created_at().to_rfc3339(),
        }
    }
}

// =============================================================================
// Transfer Store
// =============================================================================

/// A stored slot value with its expiry.
#[derive(Debug, Clone)]
pub struct TransferEntry {
    pub value: String,
    pub expires_at: Instant,
}

impl TransferEntry {
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Short-lived keyed storage shared with the payment step.
#[async_trait]
pub trait TransferStore: Send + Sync {
    /// Writes a value, replacing whatever the slot held.
    async fn put(&self, key: &str, value: String, ttl: Duration) -> CheckoutResult<()>;

    /// Reads a value without removing it.
    async fn get(&self, key: &str) -> CheckoutResult<Option<TransferEntry>>;

    /// Removes and returns a value.
    async fn take(&self, key: &str) -> CheckoutResult<Option<TransferEntry>>;
}

/// In-process [`TransferStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransferStore {
    slots: Arc<RwLock<HashMap<String, TransferEntry>>>,
}

impl InMemoryTransferStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferStore for InMemoryTransferStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> CheckoutResult<()> {
        let entry = TransferEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.slots.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> CheckoutResult<Option<TransferEntry>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn take(&self, key: &str) -> CheckoutResult<Option<TransferEntry>> {
        Ok(self.slots.write().await.remove(key))
    }
}

// =============================================================================
// Order Handoff
// =============================================================================

/// Writes priced orders to the `pendingOrder` slot and signals payment.
pub struct OrderHandoff {
    store: Arc<dyn TransferStore>,
    ttl: Duration,
    ready: Notify,
}

impl OrderHandoff {
    pub fn new(store: Arc<dyn TransferStore>, ttl: Duration) -> Self {
        OrderHandoff {
            store,
            ttl,
            ready: Notify::new(),
        }
    }

    pub fn from_config(store: Arc<dyn TransferStore>, config: &CheckoutConfig) -> Self {
        Self::new(store, config.handoff_ttl())
    }

    /// Serializes the draft into the slot and signals readiness.
    pub async fn handoff(&self, draft: &OrderDraft) -> CheckoutResult<HandoffPayload> {
        let payload = HandoffPayload::from(draft);
        let json = serde_json::to_string(&payload)?;

        self.store
            .put(PENDING_ORDER_KEY, json, self.ttl)
            .await
            .map_err(|e| match e {
                CheckoutError::Handoff(_) => e,
                other => CheckoutError::Handoff(other.to_string()),
            })?;

        info!(order_id = %payload.order_id, total = %payload.total, "Pending order written");
        self.ready.notify_one();
        Ok(payload)
    }

    /// Waits until an order has been handed off.
    ///
    /// A handoff that happened before the call is not missed.
    pub async fn ready(&self) {
        self.ready.notified().await;
    }

    /// Takes the pending order out of the slot (payment side).
    pub async fn claim(&self) -> CheckoutResult<HandoffPayload> {
        let entry = self
            .store
            .take(PENDING_ORDER_KEY)
            .await?
            .ok_or_else(|| CheckoutError::Handoff("no pending order".into()))?;

        if entry.is_expired() {
            warn!("Pending order expired before it was claimed");
            return Err(CheckoutError::Handoff("pending order expired".into()));
        }

        serde_json::from_str(&entry.value)
            .map_err(|e| CheckoutError::Handoff(format!("unreadable pending order: {e}")))
    }

    /// Removes the pending order if it is still `order_id`.
    ///
    /// Returns true when something was removed.
    pub async fn withdraw(&self, order_id: &str) -> CheckoutResult<bool> {
        let Some(entry) = self.store.get(PENDING_ORDER_KEY).await? else {
            return Ok(false);
        };

        let matches = serde_json::from_str::<HandoffPayload>(&entry.value)
            .map(|payload| payload.order_id == order_id)
            .unwrap_or(false);

        if matches {
            self.store.take(PENDING_ORDER_KEY).await?;
            debug!(order_id, "Withdrew pending order");
        }
        Ok(matches)
    }
}
