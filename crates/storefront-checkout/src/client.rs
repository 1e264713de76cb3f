//! # Delivery Cost Client
//!
//! Talks to the delivery-cost service.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST {base}/validate-address                                           │
//! │    { address }                                                          │
//! │    ──► { within_delivery_zone, distance_miles }                         │
//! │                                                                         │
//! │  POST {base}/calculate-delivery-cost                                    │
//! │    { address, order_total }                                             │
//! │    ──► { delivery_cost, is_free_delivery, distance_miles }              │
//! │                                                                         │
//! │  Errors: non-2xx with { error, code? }                                  │
//! │    code = OUT_OF_DELIVERY_ZONE ──► CheckoutError::OutOfZone             │
//! │    anything else               ──► CheckoutError::Server                │
//! │    connect / timeout           ──► CheckoutError::Network               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No retries and no caching happen here; callers decide what a failure means.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use storefront_core::money::{major_units, Money};
use storefront_core::types::{Address, DeliveryCostResult, DeliveryValidationResult};
use tracing::debug;
use url::Url;

use crate::config::CheckoutConfig;
use crate::error::{CheckoutError, CheckoutResult};

/// Error code the service uses for addresses it cannot deliver to.
pub const OUT_OF_ZONE_CODE: &str = "OUT_OF_DELIVERY_ZONE";

// =============================================================================
// Client Trait
// =============================================================================

/// Delivery-cost service operations.
#[async_trait]
pub trait DeliveryCostClient: Send + Sync {
    /// Checks whether an address is inside the delivery zone.
    ///
    /// An address outside the zone is a normal answer
    /// (`within_delivery_zone == false`), not an error.
    async fn validate_address(&self, address: &Address) -> CheckoutResult<DeliveryValidationResult>;

    /// Quotes the delivery cost of an order.
    async fn calculate_delivery_cost(
        &self,
        address: &Address,
        order_total: Money,
    ) -> CheckoutResult<DeliveryCostResult>;
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Serialize)]
struct ValidateAddressRequest<'a> {
    address: &'a Address,
}

#[derive(Serialize)]
struct CalculateCostRequest<'a> {
    address: &'a Address,
    #[serde(with = "major_units")]
    order_total: Money,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

// =============================================================================
// HTTP Client
// =============================================================================

/// reqwest-backed [`DeliveryCostClient`].
#[derive(Debug, Clone)]
pub struct HttpDeliveryClient {
    client: Client,
    base_url: String,
}

impl HttpDeliveryClient {
    pub fn new(base_url: &str, timeout: Duration) -> CheckoutResult<Self> {
        // Reject garbage early instead of on the first keystroke
        Url::parse(base_url)?;

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &CheckoutConfig) -> CheckoutResult<Self> {
        Self::new(&config.service.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> CheckoutResult<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "POST delivery service");
        let response = self.client.post(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> CheckoutResult<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) if body.code.as_deref() == Some(OUT_OF_ZONE_CODE) => {
                    CheckoutError::OutOfZone(body.error)
                }
                Ok(body) => CheckoutError::Server {
                    status: Some(status.as_u16()),
                    message: body.error,
                },
                Err(_) => CheckoutError::Server {
                    status: Some(status.as_u16()),
                    message: text,
                },
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DeliveryCostClient for HttpDeliveryClient {
    async fn validate_address(&self, address: &Address) -> CheckoutResult<DeliveryValidationResult> {
        self.post("validate-address", &ValidateAddressRequest { address })
            .await
    }

    async fn calculate_delivery_cost(
        &self,
        address: &Address,
        order_total: Money,
    ) -> CheckoutResult<DeliveryCostResult> {
        self.post(
            "calculate-delivery-cost",
            &CalculateCostRequest {
                address,
                order_total,
            },
        )
        .await
    }
}
