//! # Checkout Configuration
//!
//! Configuration management for the checkout orchestrator.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     STOREFRONT_SERVICE_URL=https://delivery.example.com/api             │
//! │     STOREFRONT_DEBOUNCE_MS=800                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/storefront-checkout/checkout.toml (Linux)                 │
//! │     ~/Library/Application Support/com.storefront.checkout/... (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     localhost service, 800ms debounce, Los Angeles zone                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax rate, free-delivery threshold and fallback cost are business constants
//! in storefront-core and are deliberately absent here.
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [service]
//! base_url = "https://delivery.example.com/api"
//! timeout_secs = 10
//!
//! [estimator]
//! debounce_ms = 800
//!
//! [zone]
//! city = "Los Angeles"
//! state = "CA"
//! country = "US"
//!
//! [handoff]
//! ttl_secs = 1800
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use storefront_core::types::ServiceArea;
use storefront_core::DEBOUNCE_WINDOW_MS;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CheckoutError, CheckoutResult};

// =============================================================================
// Service Settings
// =============================================================================

/// Where and how to reach the delivery-cost service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL; `validate-address` and `calculate-delivery-cost` are
    /// resolved relative to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:3000/api/delivery".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Estimator Settings
// =============================================================================

/// Live estimate behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorSettings {
    /// Quiet period after the last edit before a request fires (milliseconds).
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
}

fn default_debounce() -> u64 {
    DEBOUNCE_WINDOW_MS
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        EstimatorSettings {
            debounce_ms: default_debounce(),
        }
    }
}

// =============================================================================
// Zone Settings
// =============================================================================

/// The serviced metro. Unset address fields default to these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSettings {
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_city() -> String {
    ServiceArea::default().city
}

fn default_state() -> String {
    ServiceArea::default().state
}

fn default_country() -> String {
    ServiceArea::default().country
}

impl Default for ZoneSettings {
    fn default() -> Self {
        ZoneSettings {
            city: default_city(),
            state: default_state(),
            country: default_country(),
        }
    }
}

// =============================================================================
// Handoff Settings
// =============================================================================

/// Lifetime of the `pendingOrder` slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffSettings {
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_ttl() -> u64 {
    30 * 60
}

impl Default for HandoffSettings {
    fn default() -> Self {
        HandoffSettings {
            ttl_secs: default_ttl(),
        }
    }
}

// =============================================================================
// Checkout Config
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub estimator: EstimatorSettings,

    #[serde(default)]
    pub zone: ZoneSettings,

    #[serde(default)]
    pub handoff: HandoffSettings,
}

impl CheckoutConfig {
    /// Loads configuration from file and environment.
    ///
    /// Falls back to the platform config directory when no path is given.
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CheckoutError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| CheckoutError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CheckoutResult<()> {
        let url = Url::parse(&self.service.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CheckoutError::InvalidUrl(format!(
                "Service URL must use http or https, got: {}",
                self.service.base_url
            )));
        }

        if self.service.timeout_secs == 0 {
            return Err(CheckoutError::InvalidConfig(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.estimator.debounce_ms == 0 {
            return Err(CheckoutError::InvalidConfig(
                "debounce_ms must be greater than 0".into(),
            ));
        }

        if self.zone.city.trim().is_empty() || self.zone.state.trim().is_empty() {
            return Err(CheckoutError::InvalidConfig(
                "zone city and state must be set".into(),
            ));
        }

        if self.handoff.ttl_secs == 0 {
            return Err(CheckoutError::InvalidConfig(
                "handoff ttl_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup (the process environment in
    /// production).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STOREFRONT_SERVICE_URL") {
            debug!(url = %url, "Overriding service URL from environment");
            self.service.base_url = url;
        }

        if let Some(timeout) = lookup("STOREFRONT_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.service.timeout_secs = secs,
                Err(_) => warn!(value = %timeout, "Ignoring invalid STOREFRONT_TIMEOUT_SECS"),
            }
        }

        if let Some(debounce) = lookup("STOREFRONT_DEBOUNCE_MS") {
            match debounce.parse::<u64>() {
                Ok(ms) => {
                    debug!(debounce_ms = ms, "Overriding debounce window from environment");
                    self.estimator.debounce_ms = ms;
                }
                Err(_) => warn!(value = %debounce, "Ignoring invalid STOREFRONT_DEBOUNCE_MS"),
            }
        }

        if let Some(city) = lookup("STOREFRONT_ZONE_CITY") {
            self.zone.city = city;
        }

        if let Some(state) = lookup("STOREFRONT_ZONE_STATE") {
            self.zone.state = state;
        }

        if let Some(ttl) = lookup("STOREFRONT_HANDOFF_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => self.handoff.ttl_secs = secs,
                Err(_) => warn!(value = %ttl, "Ignoring invalid STOREFRONT_HANDOFF_TTL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "checkout")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.service.timeout_secs)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.estimator.debounce_ms)
    }

    pub fn handoff_ttl(&self) -> Duration {
        Duration::from_secs(self.handoff.ttl_secs)
    }

    /// The serviced metro as a core type.
    pub fn service_area(&self) -> ServiceArea {
        ServiceArea {
            city: self.zone.city.clone(),
            state: self.zone.state.clone(),
            country: self.zone.country.clone(),
        }
    }
}
