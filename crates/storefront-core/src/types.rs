//! # Domain Types
//!
//! Core domain types used throughout the checkout.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CheckoutForm   │   │ DeliveryEstimate│   │   OrderDraft    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  customer       │   │  cost           │   │  items          │       │
//! │  │  shipping addr  │   │  is_free        │   │  addresses      │       │
//! │  │  billing addr   │   │  kind / loading │   │  pricing        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │         live path ──────────┘                        ▲                  │
//! │                                                      │                  │
//! │  ┌───────────────────────────┐   ┌─────────────────────────────┐       │
//! │  │ DeliveryValidationResult  │──►│ DeliveryCostResult          │       │
//! │  │ within_delivery_zone      │   │ delivery_cost, is_free      │       │
//! │  └───────────────────────────┘   └─────────────────────────────┘       │
//! │         authoritative path (only on "continue")                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::{major_units, Money};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 975 bps = 9.75% (the serviced metro's combined sales tax)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::TAX_RATE_BPS)
    }
}

// =============================================================================
// Address
// =============================================================================

/// A postal address as typed into the checkout form.
///
/// Empty strings mean "not filled in yet". City, state and country are fixed
/// to the serviced metro; see [`Address::with_zone_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Individual address fields, addressed by form edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    Street,
    City,
    State,
    ZipCode,
    Country,
}

impl AddressField {
    /// Field name as used in validation messages.
    pub const fn name(&self) -> &'static str {
        match self {
            AddressField::Street => "street",
            AddressField::City => "city",
            AddressField::State => "state",
            AddressField::ZipCode => "zip_code",
            AddressField::Country => "country",
        }
    }
}

impl Address {
    /// Sets one field, trimming surrounding whitespace.
    pub fn set(&mut self, field: AddressField, value: &str) {
        let value = value.trim().to_string();
        match field {
            AddressField::Street => self.street = value,
            AddressField::City => self.city = value,
            AddressField::State => self.state = value,
            AddressField::ZipCode => self.zip_code = value,
            AddressField::Country => self.country = value,
        }
    }

    /// Returns true once a zip code has been entered.
    #[inline]
    pub fn has_zip(&self) -> bool {
        !self.zip_code.trim().is_empty()
    }

    /// Fills unset city/state/country from the serviced metro.
    ///
    /// ```rust
    /// use storefront_core::types::{Address, ServiceArea};
    ///
    /// let partial = Address { zip_code: "90001".into(), ..Default::default() };
    /// let full = partial.with_zone_defaults(&ServiceArea::default());
    /// assert_eq!(full.city, "Los Angeles");
    /// assert_eq!(full.zip_code, "90001");
    /// ```
    pub fn with_zone_defaults(&self, area: &ServiceArea) -> Address {
        fn or_default(value: &str, default: &str) -> String {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        }

        Address {
            street: self.street.clone(),
            city: or_default(&self.city, &area.city),
            state: or_default(&self.state, &area.state),
            zip_code: self.zip_code.clone(),
            country: or_default(&self.country, &area.country),
        }
    }
}

/// The single metro area the store delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Default for ServiceArea {
    fn default() -> Self {
        ServiceArea {
            city: "Los Angeles".to_string(),
            state: "CA".to_string(),
            country: "US".to_string(),
        }
    }
}

// =============================================================================
// Cart Line Item
// =============================================================================

/// A line in the customer's cart, frozen at the price it was added with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
}

impl LineItem {
    /// Line total before tax (unit price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Customer & Form
// =============================================================================

/// Contact details collected on the checkout page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Individual customer fields, addressed by form edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CustomerField {
    FirstName,
    LastName,
    Email,
    Phone,
}

impl CustomerField {
    /// Field name as used in validation messages.
    pub const fn name(&self) -> &'static str {
        match self {
            CustomerField::FirstName => "first_name",
            CustomerField::LastName => "last_name",
            CustomerField::Email => "email",
            CustomerField::Phone => "phone",
        }
    }
}

impl CustomerInfo {
    /// Sets one field, trimming surrounding whitespace.
    pub fn set(&mut self, field: CustomerField, value: &str) {
        let value = value.trim().to_string();
        match field {
            CustomerField::FirstName => self.first_name = value,
            CustomerField::LastName => self.last_name = value,
            CustomerField::Email => self.email = value,
            CustomerField::Phone => self.phone = value,
        }
    }

    /// "First Last", skipping blank parts.
    pub fn full_name(&self) -> String {
        [self.first_name.as_str(), self.last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything the customer typed on the checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutForm {
    pub customer: CustomerInfo,
    pub shipping_address: Address,
    pub billing_address: Address,
    /// When set, the billing address mirrors the shipping address.
    pub billing_same_as_shipping: bool,
}

impl Default for CheckoutForm {
    fn default() -> Self {
        CheckoutForm {
            customer: CustomerInfo::default(),
            shipping_address: Address::default(),
            billing_address: Address::default(),
            billing_same_as_shipping: true,
        }
    }
}

impl CheckoutForm {
    /// The billing address that will actually be used for the order.
    pub fn effective_billing_address(&self) -> &Address {
        if self.billing_same_as_shipping {
            &self.shipping_address
        } else {
            &self.billing_address
        }
    }
}

// =============================================================================
// Delivery: Live Estimate
// =============================================================================

/// What produced a live estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EstimateKind {
    /// Request issued, no answer yet.
    Pending,
    /// Answered by the delivery service.
    Quoted,
    /// Service unreachable; nominal cost shown instead.
    Fallback,
    /// The service says the address cannot be delivered to.
    OutOfZone,
}

/// Best-effort delivery cost shown while the customer is still typing.
///
/// Never used to price a real order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryEstimate {
    pub cost: Money,
    pub is_free: bool,
    pub distance_miles: f64,
    pub is_estimate: bool,
    pub loading: bool,
    pub kind: EstimateKind,
}

impl DeliveryEstimate {
    /// Placeholder published while the first request is in flight.
    pub fn pending() -> Self {
        DeliveryEstimate {
            cost: Money::zero(),
            is_free: false,
            distance_miles: 0.0,
            is_estimate: true,
            loading: true,
            kind: EstimateKind::Pending,
        }
    }

    /// Estimate built from a successful service answer. `is_free` is decided
    /// by the caller's delivery policy, never by the service.
    pub fn quoted(result: &DeliveryCostResult, is_free: bool) -> Self {
        let cost = if is_free {
            Money::zero()
        } else {
            result.delivery_cost
        };

        DeliveryEstimate {
            cost,
            is_free,
            distance_miles: result.distance_miles,
            is_estimate: true,
            loading: false,
            kind: EstimateKind::Quoted,
        }
    }

    /// Non-retryable "cannot deliver here" state. Shipping is forced to zero.
    pub fn out_of_zone() -> Self {
        DeliveryEstimate {
            cost: Money::zero(),
            is_free: false,
            distance_miles: 0.0,
            is_estimate: false,
            loading: false,
            kind: EstimateKind::OutOfZone,
        }
    }

    /// Degraded estimate used when the service could not be reached.
    pub fn fallback(cost: Money, is_free: bool) -> Self {
        DeliveryEstimate {
            cost: if is_free { Money::zero() } else { cost },
            is_free,
            distance_miles: 0.0,
            is_estimate: true,
            loading: false,
            kind: EstimateKind::Fallback,
        }
    }

    /// Same estimate, flagged as refreshing.
    pub fn refreshing(&self) -> Self {
        DeliveryEstimate {
            loading: true,
            ..self.clone()
        }
    }
}

// =============================================================================
// Delivery: Authoritative Results
// =============================================================================

/// Answer of `POST validate-address`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryValidationResult {
    pub within_delivery_zone: bool,
    pub distance_miles: f64,
}

/// Answer of `POST calculate-delivery-cost`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeliveryCostResult {
    #[serde(with = "major_units")]
    #[ts(type = "number")]
    pub delivery_cost: Money,
    pub is_free_delivery: bool,
    pub distance_miles: f64,
}

// =============================================================================
// Pricing
// =============================================================================

/// Subtotal, shipping, tax and total of an order.
///
/// Fields are private: the only way to obtain one is
/// [`PricingAggregator::price`](crate::pricing::PricingAggregator::price), so
/// `total == subtotal + shipping + tax` cannot be broken by assignment.
/// Deserializing recomputes the total and rejects input that disagrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, TS)]
#[ts(export)]
pub struct PricingBreakdown {
    subtotal: Money,
    shipping: Money,
    tax: Money,
    total: Money,
}

impl PricingBreakdown {
    pub(crate) const fn from_parts(subtotal: Money, shipping: Money, tax: Money) -> Self {
        PricingBreakdown {
            subtotal,
            shipping,
            tax,
            total: Money::from_cents(subtotal.cents() + shipping.cents() + tax.cents()),
        }
    }

    #[inline]
    pub const fn subtotal(&self) -> Money {
        self.subtotal
    }

    #[inline]
    pub const fn shipping(&self) -> Money {
        self.shipping
    }

    #[inline]
    pub const fn tax(&self) -> Money {
        self.tax
    }

    #[inline]
    pub const fn total(&self) -> Money {
        self.total
    }
}

impl<'de> Deserialize<'de> for PricingBreakdown {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Parts {
            subtotal: Money,
            shipping: Money,
            tax: Money,
            total: Money,
        }

        let parts = Parts::deserialize(deserializer)?;
        let breakdown = PricingBreakdown::from_parts(parts.subtotal, parts.shipping, parts.tax);
        if breakdown.total != parts.total {
            return Err(de::Error::custom(format!(
                "total {} does not equal subtotal + shipping + tax ({})",
                parts.total, breakdown.total
            )));
        }
        Ok(breakdown)
    }
}

// =============================================================================
// Order Draft
// =============================================================================

/// A fully priced order, created once when "continue" succeeds.
///
/// Immutable after construction; it is handed off, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderDraft {
    id: String,
    items: Vec<LineItem>,
    customer: CustomerInfo,
    shipping_address: Address,
    billing_address: Address,
    pricing: PricingBreakdown,
    is_free_delivery: bool,
    distance_miles: f64,
    zone_validated: bool,
    cost_degraded: bool,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
}

/// Delivery facts the draft records alongside the pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeliveryFacts {
    pub is_free_delivery: bool,
    pub distance_miles: f64,
    pub zone_validated: bool,
    pub cost_degraded: bool,
}

impl OrderDraft {
    /// Assembles a draft from the cart, the form and an authoritative price.
    pub fn new(
        items: Vec<LineItem>,
        form: &CheckoutForm,
        pricing: PricingBreakdown,
        delivery: DeliveryFacts,
    ) -> Self {
        OrderDraft {
            id: Uuid::new_v4().to_string(),
            items,
            customer: form.customer.clone(),
            shipping_address: form.shipping_address.clone(),
            billing_address: form.effective_billing_address().clone(),
            pricing,
            is_free_delivery: delivery.is_free_delivery,
            distance_miles: delivery.distance_miles,
            zone_validated: delivery.zone_validated,
            cost_degraded: delivery.cost_degraded,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn pricing(&self) -> &PricingBreakdown {
        &self.pricing
    }

    pub fn is_free_delivery(&self) -> bool {
        self.is_free_delivery
    }

    pub fn distance_miles(&self) -> f64 {
        self.distance_miles
    }

    pub fn zone_validated(&self) -> bool {
        self.zone_validated
    }

    /// True when the final cost came from the fallback rather than the service.
    pub fn cost_degraded(&self) -> bool {
        self.cost_degraded
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
