//! # storefront-core: Pure Checkout Logic
//!
//! Money, cart, pricing and form rules for the storefront checkout, as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Storefront Checkout Architecture                    │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Storefront UI                                │   │
//! │  │    Cart page ──► Checkout form ──► Payment page                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ watch::Receiver<CheckoutState>         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              storefront-checkout (async actors)                 │   │
//! │  │    DebouncedEstimator, CheckoutOrchestrator, OrderHandoff       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ storefront-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │ validation│  │   │
//! │  │   │  Address  │  │   Money   │  │ Aggregator│  │ form rules│  │   │
//! │  │   │ OrderDraft│  │  TaxRate  │  │  Policy   │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO TIMERS • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Address, DeliveryEstimate, OrderDraft, etc.)
//! - [`money`] - Money type with integer arithmetic
//! - [`pricing`] - Tax/total computation and delivery policy
//! - [`cart`] - Line items and subtotal
//! - [`validation`] - Checkout form validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use storefront_core::money::Money;
//! use storefront_core::pricing::PricingAggregator;
//!
//! let pricing = PricingAggregator::default()
//!     .price(Money::from_cents(120_000), Money::zero())
//!     .unwrap();
//!
//! assert_eq!(pricing.tax().cents(), 11_700);
//! assert_eq!(pricing.total().cents(), 131_700);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::Cart;
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{DeliveryPolicy, PricingAggregator};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Combined sales tax of the serviced metro, in basis points (9.75%).
pub const TAX_RATE_BPS: u32 = 975;

/// Subtotal at or above which delivery is free ($1000.00).
pub const FREE_DELIVERY_THRESHOLD: Money = Money::from_cents(100_000);

/// Delivery cost shown when the delivery service cannot be reached ($50.00).
pub const FALLBACK_DELIVERY_COST: Money = Money::from_cents(5_000);

/// Quiet period after the last address edit before an estimate is requested.
pub const DEBOUNCE_WINDOW_MS: u64 = 800;

/// Key of the transfer slot the payment step reads the order from.
pub const PENDING_ORDER_KEY: &str = "pendingOrder";

/// Maximum lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single item in cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;
