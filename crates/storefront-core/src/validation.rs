//! # Validation Module
//!
//! Synchronous checkout form validation.
//!
//! ## When It Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Customer clicks "Continue to payment"                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_checkout_form(form) ← THIS MODULE                             │
//! │       │                                                                 │
//! │       ├── errors? → field errors on the form, NO network call           │
//! │       │                                                                 │
//! │       └── OK → zone validation → delivery cost → pricing → handoff      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use storefront_core::validation::{validate_email, validate_zip_code};
//!
//! assert!(validate_email("ada@example.com").is_ok());
//! assert!(validate_zip_code("90001-1234").is_ok());
//! assert!(validate_zip_code("9000").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{Address, CheckoutForm};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 100;
const MAX_STREET_LEN: usize = 200;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates that a field is present and not longer than `max`.
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot, not at either end
/// - No whitespace
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required("email", email, MAX_EMAIL_LEN)?;

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return Err(invalid("must contain @")),
    };

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must be of the form name@domain"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must contain a dot"));
    }

    Ok(())
}

/// Validates a US zip code: `12345` or `12345-6789`.
pub fn validate_zip_code(zip: &str) -> ValidationResult<()> {
    let zip = zip.trim();
    validate_required("zip_code", zip, 10)?;

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    let valid = match zip.split_once('-') {
        None => zip.len() == 5 && all_digits(zip),
        Some((head, tail)) => {
            head.len() == 5 && tail.len() == 4 && all_digits(head) && all_digits(tail)
        }
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "zip_code".to_string(),
            reason: "must be 5 digits or ZIP+4".to_string(),
        })
    }
}

/// Validates a phone number.
///
/// ## Rules
/// - Digits plus the separators `+ - ( ) .` and spaces
/// - 10 to 15 digits in total
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();
    validate_required("phone", phone, 32)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "may contain only digits, spaces and + - ( ) .".to_string(),
        });
    }

    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !(MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        return Err(ValidationError::OutOfRange {
            field: "phone digits".to_string(),
            min: MIN_PHONE_DIGITS as i64,
            max: MAX_PHONE_DIGITS as i64,
        });
    }

    Ok(())
}

/// Validates a quantity value.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Form Validation
// =============================================================================

/// Validates an address, prefixing field names (`shipping_address.street`).
///
/// City/state/country are not checked: they default to the serviced metro.
pub fn validate_address(prefix: &str, address: &Address) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Err(err) = validate_required("street", &address.street, MAX_STREET_LEN) {
        errors.push(err);
    }
    if let Err(err) = validate_zip_code(&address.zip_code) {
        errors.push(err);
    }

    errors
        .into_iter()
        .map(|err| prefix_field(prefix, err))
        .collect()
}

/// Validates the whole checkout form, collecting every field error.
///
/// ## Example
/// ```rust
/// use storefront_core::types::CheckoutForm;
/// use storefront_core::validation::validate_checkout_form;
///
/// let errors = validate_checkout_form(&CheckoutForm::default()).unwrap_err();
/// assert!(errors.iter().any(|e| e.field() == "shipping_address.zip_code"));
/// ```
pub fn validate_checkout_form(form: &CheckoutForm) -> Result<(), Vec<ValidationError>> {
    let customer = &form.customer;
    let mut errors: Vec<ValidationError> = [
        validate_required("first_name", &customer.first_name, MAX_NAME_LEN),
        validate_required("last_name", &customer.last_name, MAX_NAME_LEN),
        validate_email(&customer.email),
        validate_phone(&customer.phone),
    ]
    .into_iter()
    .filter_map(Result::err)
    .collect();

    errors.extend(validate_address("shipping_address", &form.shipping_address));
    if !form.billing_same_as_shipping {
        errors.extend(validate_address("billing_address", &form.billing_address));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn prefix_field(prefix: &str, err: ValidationError) -> ValidationError {
    let qualify = |field: String| format!("{prefix}.{field}");
    match err {
        ValidationError::Required { field } => ValidationError::Required {
            field: qualify(field),
        },
        ValidationError::TooShort { field, min } => ValidationError::TooShort {
            field: qualify(field),
            min,
        },
        ValidationError::TooLong { field, max } => ValidationError::TooLong {
            field: qualify(field),
            max,
        },
        ValidationError::OutOfRange { field, min, max } => ValidationError::OutOfRange {
            field: qualify(field),
            min,
            max,
        },
        ValidationError::MustBePositive { field } => ValidationError::MustBePositive {
            field: qualify(field),
        },
        ValidationError::InvalidFormat { field, reason } => ValidationError::InvalidFormat {
            field: qualify(field),
            reason,
        },
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
