//! # Pricing Module
//!
//! Tax/total computation and the delivery rules that feed it.
//!
//! ## Pricing Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Cart.subtotal ──────────────┐                                          │
//! │                              │                                          │
//! │  DeliveryValidationResult ─┐ │                                          │
//! │  DeliveryCostResult ───────┼─┼─► DeliveryPolicy::finalize               │
//! │  (or degraded: None) ──────┘ │        │                                 │
//! │                              │        ▼ shipping                        │
//! │                              └──► PricingAggregator::price              │
//! │                                       │                                 │
//! │                                       ▼                                 │
//! │                       PricingBreakdown { subtotal, shipping,            │
//! │                                          tax, total }                   │
//! │                                                                         │
//! │  tax   = round_half_up((subtotal + shipping) × 9.75%)  (whole dollars)  │
//! │  total = subtotal + shipping + tax                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{
    DeliveryCostResult, DeliveryEstimate, DeliveryFacts, DeliveryValidationResult,
    PricingBreakdown, TaxRate,
};
use crate::{FALLBACK_DELIVERY_COST, FREE_DELIVERY_THRESHOLD};

// =============================================================================
// Pricing Aggregator
// =============================================================================

/// Computes tax and total from a subtotal and a shipping cost.
///
/// Deterministic and side-effect free; the same aggregator prices both the
/// live estimate display and the authoritative order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingAggregator {
    tax_rate: TaxRate,
}

impl Default for PricingAggregator {
    fn default() -> Self {
        PricingAggregator {
            tax_rate: TaxRate::default(),
        }
    }
}

impl PricingAggregator {
    pub const fn new(tax_rate: TaxRate) -> Self {
        PricingAggregator { tax_rate }
    }

    pub const fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Prices an order.
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::money::Money;
    /// use storefront_core::pricing::PricingAggregator;
    ///
    /// let pricing = PricingAggregator::default()
    ///     .price(Money::from_cents(50_000), Money::from_cents(5_000))
    ///     .unwrap();
    /// assert_eq!(pricing.tax().cents(), 5_400);
    /// assert_eq!(pricing.total().cents(), 60_400);
    /// ```
    pub fn price(&self, subtotal: Money, shipping: Money) -> CoreResult<PricingBreakdown> {
        if subtotal.is_negative() {
            return Err(CoreError::NegativeAmount {
                field: "subtotal",
                cents: subtotal.cents(),
            });
        }
        if shipping.is_negative() {
            return Err(CoreError::NegativeAmount {
                field: "shipping",
                cents: shipping.cents(),
            });
        }

        let tax = (subtotal + shipping).calculate_tax(self.tax_rate);
        Ok(PricingBreakdown::from_parts(subtotal, shipping, tax))
    }

    /// Approximate pricing for display next to a live estimate.
    ///
    /// While the estimate is loading its last known cost is used.
    pub fn price_estimate(
        &self,
        subtotal: Money,
        estimate: &DeliveryEstimate,
    ) -> CoreResult<PricingBreakdown> {
        let shipping = if estimate.is_free {
            Money::zero()
        } else {
            estimate.cost
        };
        self.price(subtotal, shipping)
    }
}

// =============================================================================
// Delivery Policy
// =============================================================================

/// Free-delivery and fallback rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    free_threshold: Money,
    fallback_cost: Money,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        DeliveryPolicy {
            free_threshold: FREE_DELIVERY_THRESHOLD,
            fallback_cost: FALLBACK_DELIVERY_COST,
        }
    }
}

/// Shipping settled by [`DeliveryPolicy::finalize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedShipping {
    pub shipping: Money,
    pub is_free: bool,
    pub distance_miles: f64,
    pub zone_validated: bool,
    /// The cost came from the fallback, not from the service.
    pub degraded: bool,
}

impl ResolvedShipping {
    pub fn facts(&self) -> DeliveryFacts {
        DeliveryFacts {
            is_free_delivery: self.is_free,
            distance_miles: self.distance_miles,
            zone_validated: self.zone_validated,
            cost_degraded: self.degraded,
        }
    }
}

impl DeliveryPolicy {
    pub const fn new(free_threshold: Money, fallback_cost: Money) -> Self {
        DeliveryPolicy {
            free_threshold,
            fallback_cost,
        }
    }

    pub const fn free_threshold(&self) -> Money {
        self.free_threshold
    }

    /// True when the subtotal alone earns free delivery.
    #[inline]
    pub fn qualifies_for_free(&self, subtotal: Money) -> bool {
        subtotal >= self.free_threshold
    }

    /// Nominal cost used when the service is unreachable.
    pub fn fallback_cost(&self, subtotal: Money) -> Money {
        if self.qualifies_for_free(subtotal) {
            Money::zero()
        } else {
            self.fallback_cost
        }
    }

    /// Live estimate for a successful service answer. Free delivery follows
    /// the subtotal; the service's own flag is not consulted.
    pub fn quoted_estimate(
        &self,
        subtotal: Money,
        result: &DeliveryCostResult,
    ) -> DeliveryEstimate {
        DeliveryEstimate::quoted(result, self.qualifies_for_free(subtotal))
    }

    /// Live estimate shown when the service could not be reached.
    pub fn fallback_estimate(&self, subtotal: Money) -> DeliveryEstimate {
        DeliveryEstimate::fallback(
            self.fallback_cost(subtotal),
            self.qualifies_for_free(subtotal),
        )
    }

    /// Settles the authoritative shipping cost.
    ///
    /// `cost` is `None` when the cost call failed transiently after a
    /// successful zone validation; the fallback cost is used instead.
    ///
    /// ## Rules
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  outside zone          → shipping 0, not free, not validated        │
    /// │  subtotal ≥ threshold  → shipping 0, free                           │
    /// │  service flag alone    → ignored; its cost figure is used           │
    /// │  cost call degraded    → fallback cost                              │
    /// │  otherwise             → service cost                               │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    pub fn finalize(
        &self,
        subtotal: Money,
        validation: &DeliveryValidationResult,
        cost: Option<&DeliveryCostResult>,
    ) -> CoreResult<ResolvedShipping> {
        if !validation.within_delivery_zone {
            return Ok(ResolvedShipping {
                shipping: Money::zero(),
                is_free: false,
                distance_miles: validation.distance_miles,
                zone_validated: false,
                degraded: false,
            });
        }

        let free_by_subtotal = self.qualifies_for_free(subtotal);

        let resolved = match cost {
            Some(result) => {
                if result.delivery_cost.is_negative() {
                    return Err(CoreError::NegativeAmount {
                        field: "delivery_cost",
                        cents: result.delivery_cost.cents(),
                    });
                }
                ResolvedShipping {
                    shipping: if free_by_subtotal {
                        Money::zero()
                    } else {
                        result.delivery_cost
                    },
                    is_free: free_by_subtotal,
                    distance_miles: result.distance_miles,
                    zone_validated: true,
                    degraded: false,
                }
            }
            None => ResolvedShipping {
                shipping: self.fallback_cost(subtotal),
                is_free: free_by_subtotal,
                distance_miles: validation.distance_miles,
                zone_validated: true,
                degraded: true,
            },
        };

        Ok(resolved)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EstimateKind;

    fn in_zone(distance: f64) -> DeliveryValidationResult {
        DeliveryValidationResult {
            within_delivery_zone: true,
            distance_miles: distance,
        }
    }

    fn quote(cents: i64, free: bool) -> DeliveryCostResult {
        DeliveryCostResult {
            delivery_cost: Money::from_cents(cents),
            is_free_delivery: free,
            distance_miles: 6.5,
        }
    }

    #[test]
    fn test_price_total_is_sum_of_parts() {
        let aggregator = PricingAggregator::default();
        let pricing = aggregator
            .price(Money::from_cents(120_000), Money::zero())
            .unwrap();

        assert_eq!(pricing.subtotal().cents(), 120_000);
        assert_eq!(pricing.shipping().cents(), 0);
        assert_eq!(pricing.tax().cents(), 11_700);
        assert_eq!(pricing.total().cents(), 131_700);
    }

    #[test]
    fn test_price_with_shipping() {
        let pricing = PricingAggregator::default()
            .price(Money::from_cents(50_000), Money::from_cents(5_000))
            .unwrap();

        assert_eq!(pricing.tax().cents(), 5_400);
        assert_eq!(pricing.total().cents(), 60_400);
    }

    #[test]
    fn test_price_rejects_negative_inputs() {
        let aggregator = PricingAggregator::default();
        assert!(matches!(
            aggregator.price(Money::from_cents(-1), Money::zero()),
            Err(CoreError::NegativeAmount { field: "subtotal", .. })
        ));
        assert!(matches!(
            aggregator.price(Money::zero(), Money::from_cents(-1)),
            Err(CoreError::NegativeAmount { field: "shipping", .. })
        ));
    }

    #[test]
    fn test_price_is_deterministic() {
        let aggregator = PricingAggregator::default();
        let a = aggregator.price(Money::from_cents(33_333), Money::from_cents(1_234));
        let b = aggregator.price(Money::from_cents(33_333), Money::from_cents(1_234));
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn test_price_estimate_ignores_cost_when_free() {
        let estimate = DeliveryEstimate {
            cost: Money::from_cents(5_000),
            is_free: true,
            distance_miles: 0.0,
            is_estimate: true,
            loading: false,
            kind: EstimateKind::Fallback,
        };
        let pricing = PricingAggregator::default()
            .price_estimate(Money::from_cents(120_000), &estimate)
            .unwrap();
        assert!(pricing.shipping().is_zero());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = DeliveryPolicy::default();
        assert!(policy.qualifies_for_free(Money::from_cents(100_000)));
        assert!(!policy.qualifies_for_free(Money::from_cents(99_999)));
    }

    #[test]
    fn test_fallback_cost() {
        let policy = DeliveryPolicy::default();
        assert_eq!(policy.fallback_cost(Money::from_cents(50_000)).cents(), 5_000);
        assert!(policy.fallback_cost(Money::from_cents(150_000)).is_zero());

        let estimate = policy.fallback_estimate(Money::from_cents(150_000));
        assert!(estimate.is_free);
        assert!(estimate.cost.is_zero());
        assert!(estimate.is_estimate);
    }

    #[test]
    fn test_finalize_free_over_threshold_overrides_service_cost() {
        let policy = DeliveryPolicy::default();
        let resolved = policy
            .finalize(Money::from_cents(120_000), &in_zone(3.0), Some(&quote(4_500, false)))
            .unwrap();

        assert!(resolved.is_free);
        assert!(resolved.shipping.is_zero());
        assert!(resolved.zone_validated);
        assert!(!resolved.degraded);
    }

    #[test]
    fn test_finalize_uses_service_cost_below_threshold() {
        let policy = DeliveryPolicy::default();
        let resolved = policy
            .finalize(Money::from_cents(50_000), &in_zone(3.0), Some(&quote(4_500, false)))
            .unwrap();

        assert!(!resolved.is_free);
        assert_eq!(resolved.shipping.cents(), 4_500);
        assert_eq!(resolved.distance_miles, 6.5);
    }

    #[test]
    fn test_finalize_out_of_zone_forces_zero_shipping() {
        let policy = DeliveryPolicy::default();
        let outside = DeliveryValidationResult {
            within_delivery_zone: false,
            distance_miles: 80.0,
        };
        let resolved = policy
            .finalize(Money::from_cents(120_000), &outside, Some(&quote(4_500, true)))
            .unwrap();

        assert!(resolved.shipping.is_zero());
        assert!(!resolved.is_free);
        assert!(!resolved.zone_validated);
    }

    #[test]
    fn test_finalize_degraded_uses_fallback() {
        let policy = DeliveryPolicy::default();
        let resolved = policy
            .finalize(Money::from_cents(50_000), &in_zone(4.0), None)
            .unwrap();

        assert!(resolved.degraded);
        assert_eq!(resolved.shipping.cents(), 5_000);
        assert_eq!(resolved.distance_miles, 4.0);

        let free = policy
            .finalize(Money::from_cents(100_000), &in_zone(4.0), None)
            .unwrap();
        assert!(free.is_free);
        assert!(free.shipping.is_zero());
    }

    #[test]
    fn test_finalize_free_flag_comes_from_subtotal_only() {
        let policy = DeliveryPolicy::default();
        let resolved = policy
            .finalize(Money::from_cents(50_000), &in_zone(2.0), Some(&quote(0, true)))
            .unwrap();

        assert!(!resolved.is_free);
        assert!(resolved.shipping.is_zero());
    }

    #[test]
    fn test_quoted_estimate_free_flag_follows_subtotal() {
        let policy = DeliveryPolicy::default();

        let below = policy.quoted_estimate(Money::from_cents(50_000), &quote(0, true));
        assert!(!below.is_free);
        assert!(below.cost.is_zero());

        let below = policy.quoted_estimate(Money::from_cents(50_000), &quote(2_500, true));
        assert!(!below.is_free);
        assert_eq!(below.cost.cents(), 2_500);

        let above = policy.quoted_estimate(Money::from_cents(100_000), &quote(2_500, false));
        assert!(above.is_free);
        assert!(above.cost.is_zero());
        assert_eq!(above.kind, EstimateKind::Quoted);
    }

    #[test]
    fn test_finalize_rejects_negative_service_cost() {
        let policy = DeliveryPolicy::default();
        let result = policy.finalize(Money::from_cents(50_000), &in_zone(1.0), Some(&quote(-10, false)));
        assert!(matches!(result, Err(CoreError::NegativeAmount { .. })));
    }
}
