//! # Checkout Error Types
//!
//! Error types for checkout operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Checkout Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  User Action    │  │   Transient     │  │     Configuration       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  FormInvalid    │  │  Network        │  │  InvalidConfig          │ │
//! │  │  EmptyCart      │  │  Server         │  │  InvalidUrl             │ │
//! │  │  OutOfZone      │  │  Handoff        │  │  ConfigLoad/SaveFailed  │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │    Pricing      │  │    Internal     │                              │
//! │  │                 │  │                 │                              │
//! │  │  Pricing(Core)  │  │  ChannelError   │                              │
//! │  │                 │  │  Disposed       │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The live estimate path never surfaces these to the customer: a transient
//! failure there just yields the fallback estimate.

use storefront_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Checkout error type covering every failure the orchestrator can observe.
#[derive(Debug, Error)]
pub enum CheckoutError {
    // =========================================================================
    // User Action Errors
    // =========================================================================
    /// One or more form fields failed synchronous validation.
    #[error("{} form field(s) need attention", .0.len())]
    FormInvalid(Vec<ValidationError>),

    /// Continue was pressed with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// The address is outside the delivery zone.
    #[error("Address is outside the delivery zone: {0}")]
    OutOfZone(String),

    // =========================================================================
    // Transient Errors
    // =========================================================================
    /// Connectivity problem or timeout talking to the delivery service.
    #[error("Network error: {0}")]
    Network(String),

    /// The delivery service answered with an error or an unreadable body.
    #[error("Delivery service error{}: {message}", status_suffix(.status))]
    Server { status: Option<u16>, message: String },

    /// Writing the order to the handoff slot failed.
    #[error("Handoff failed: {0}")]
    Handoff(String),

    // =========================================================================
    // Pricing Errors
    // =========================================================================
    /// Pricing rejected its inputs.
    #[error("Pricing error: {0}")]
    Pricing(#[from] CoreError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid checkout configuration.
    #[error("Invalid checkout configuration: {0}")]
    InvalidConfig(String),

    /// Invalid delivery service URL.
    #[error("Invalid service URL: {0}")]
    InvalidUrl(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Channel send/receive failed.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// The checkout was disposed.
    #[error("Checkout has been disposed")]
    Disposed,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for CheckoutError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CheckoutError::Server {
                status: err.status().map(|s| s.as_u16()),
                message: format!("unreadable response: {err}"),
            }
        } else if err.is_status() {
            CheckoutError::Server {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        } else {
            // Connect failures, timeouts and broken bodies
            CheckoutError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Handoff(format!("payload serialization failed: {err}"))
    }
}

impl From<url::ParseError> for CheckoutError {
    fn from(err: url::ParseError) -> Self {
        CheckoutError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for CheckoutError {
    fn from(err: std::io::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(err: toml::de::Error) -> Self {
        CheckoutError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CheckoutError {
    fn from(err: toml::ser::Error) -> Self {
        CheckoutError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl CheckoutError {
    /// Returns true if pressing "continue" again may succeed without edits.
    ///
    /// ## Retryable Errors
    /// - Network failures and timeouts
    /// - Delivery service errors
    /// - Handoff write failures
    ///
    /// ## Non-Retryable Errors
    /// - Form and zone errors (the customer must change something)
    /// - Configuration errors
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::Network(_) | CheckoutError::Server { .. } | CheckoutError::Handoff(_)
        )
    }

    /// Returns true if the address cannot be delivered to.
    pub fn is_zone_error(&self) -> bool {
        matches!(self, CheckoutError::OutOfZone(_))
    }

    /// Returns true if the customer has to change the form or cart.
    pub fn requires_user_action(&self) -> bool {
        matches!(
            self,
            CheckoutError::FormInvalid(_) | CheckoutError::EmptyCart | CheckoutError::OutOfZone(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::InvalidConfig(_)
                | CheckoutError::InvalidUrl(_)
                | CheckoutError::ConfigLoadFailed(_)
                | CheckoutError::ConfigSaveFailed(_)
        )
    }

    /// Message shown to the customer.
    ///
    /// Zone ineligibility and transient failures read differently so the
    /// customer knows whether retrying can help.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::FormInvalid(errors) => match errors.as_slice() {
                [only] => format!("Please check your details: {only}."),
                _ => format!("Please check your details: {} fields need attention.", errors.len()),
            },
            CheckoutError::EmptyCart => "Your cart is empty.".to_string(),
            CheckoutError::OutOfZone(_) => {
                "Sorry, we don't deliver to this address. Please use an address in our delivery area."
                    .to_string()
            }
            CheckoutError::Network(_) | CheckoutError::Server { .. } => {
                "We couldn't confirm delivery right now. Please try again.".to_string()
            }
            CheckoutError::Handoff(_) => {
                "We couldn't start payment. Please try again.".to_string()
            }
            _ => "Something went wrong with checkout. Please reload the page.".to_string(),
        }
    }
}
