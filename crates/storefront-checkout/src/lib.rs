//! # storefront-checkout: Checkout Orchestration
//!
//! The async layer of the storefront checkout. It drives the live delivery
//! estimate while the customer types, confirms the address against the
//! delivery service, prices the order and hands it to the payment step.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Checkout Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                CheckoutOrchestrator (session actor)              │  │
//! │  │                                                                  │  │
//! │  │  Owns CheckoutState, publishes it on a watch channel             │  │
//! │  │  Form edits, continue, dispose arrive as commands                │  │
//! │  └──────┬─────────────────────────┬─────────────────────────┬───────┘  │
//! │         ▼                         ▼                         ▼          │
//! │  ┌────────────────┐  ┌────────────────────────┐  ┌──────────────────┐  │
//! │  │DebouncedEstim. │  │  DeliveryCostClient    │  │  OrderHandoff    │  │
//! │  │                │  │                        │  │                  │  │
//! │  │ 800ms debounce │  │ POST /validate-address │  │ "pendingOrder"   │  │
//! │  │ latest wins    │  │ POST /calculate-cost   │  │ slot with TTL    │  │
//! │  └───────┬────────┘  └────────────────────────┘  └──────────────────┘  │
//! │          └──────────────► (same client) ◄───────────────┘              │
//! │                                                                         │
//! │  storefront-core: Money, pricing, delivery policy, form validation     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`orchestrator`] - Checkout state machine and its handle
//! - [`estimator`] - Debounced live delivery estimate
//! - [`client`] - Delivery service client (trait + HTTP)
//! - [`handoff`] - Pending-order slot read by the payment step
//! - [`cart`] - Read access to the storefront cart
//! - [`config`] - Service URL, debounce window, delivery zone
//! - [`events`] - Side-channel event emitter
//! - [`timer`] - Restartable debounce deadline
//! - [`error`] - Checkout error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use storefront_checkout::{
//!     CheckoutConfig, CheckoutOrchestrator, HttpDeliveryClient, InMemoryTransferStore,
//!     OrderHandoff, SharedCart,
//! };
//! use storefront_core::AddressField;
//!
//! let config = CheckoutConfig::load_or_default(None);
//! let client = Arc::new(HttpDeliveryClient::from_config(&config)?);
//! let handoff = Arc::new(OrderHandoff::from_config(Arc::new(InMemoryTransferStore::new()), &config));
//!
//! let checkout = CheckoutOrchestrator::new(&config, client, Arc::new(cart), handoff).start();
//! checkout.edit_shipping(AddressField::ZipCode, "90001").await?;
//! checkout.continue_to_payment().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod client;
pub mod config;
pub mod error;
pub mod estimator;
pub mod events;
pub mod handoff;
pub mod orchestrator;
pub mod timer;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart::{CartProvider, SharedCart};
pub use client::{DeliveryCostClient, HttpDeliveryClient};
pub use config::CheckoutConfig;
pub use error::{CheckoutError, CheckoutResult};
pub use estimator::{DebouncedEstimator, EstimatorConfig, EstimatorHandle};
pub use events::{CheckoutEventEmitter, NoOpEmitter, TracingEmitter};
pub use handoff::{HandoffPayload, InMemoryTransferStore, OrderHandoff, TransferStore};
pub use orchestrator::{
    CheckoutHandle, CheckoutOrchestrator, CheckoutPhase, CheckoutState, FieldError, Notice,
    NoticeKind,
};
pub use timer::DebounceTimer;
