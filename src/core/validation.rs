//! Input checks shared by the core operations. All of them run before any state is read.

use crate::{
    core::amount::Amount,
    errors::{Error, Result},
};

/// Longest accepted note on a deposit or withdrawal request.
pub const MAX_NOTE_CHARS: usize = 500;

/// Trims `value` and checks that it holds between 1 and `max_chars` characters.
pub fn text(field: &str, value: &str, max_chars: usize) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            message: format!("{field} is required"),
        });
    }
    if trimmed.chars().count() > max_chars {
        return Err(Error::Validation {
            message: format!("{field} must be at most {max_chars} characters"),
        });
    }
    Ok(trimmed.to_string())
}

/// Normalizes an e-mail address (trimmed, lowercased) and checks its basic shape.
pub fn email(value: &str) -> Result<String> {
    let normalized = text("E-mail", value, 255)?.to_lowercase();
    let valid = normalized
        .split_once('@')
        .is_some_and(|(local, domain)| {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        });
    if !valid || normalized.contains(char::is_whitespace) {
        return Err(Error::Validation {
            message: format!("Invalid e-mail address: {normalized}"),
        });
    }
    Ok(normalized)
}

/// Checks that `amount` is positive and within `[min, max]` (`max` optional).
pub fn amount(label: &str, amount: Amount, min: Amount, max: Option<Amount>) -> Result<()> {
    if !amount.is_positive() {
        return Err(Error::InvalidAmount {
            amount: amount.to_string(),
        });
    }
    if amount < min {
        return Err(Error::Validation {
            message: format!("{label} must be at least {min}"),
        });
    }
    if let Some(max) = max.filter(|max| amount > *max) {
        return Err(Error::Validation {
            message: format!("{label} must not exceed {max}"),
        });
    }
    Ok(())
}
