//! Money Conversion Module
//!
//! Conversion between the internal minor-unit representation (`u64` cents)
//! and the client-facing string / `Decimal` representation. Wallet amounts
//! are Kenyan shillings with two decimal places.
//!
//! ## Internal Representation
//! - All amounts handled by the wizard and dispatcher are `u64` minor units
//! - The backend speaks major units (`1500` means KES 1,500.00)
//! - `WalletSnapshot::balance` is a `Decimal` straight from the backend
//!
//! ## Usage
//! ```rust
//! use pesasoft_core::money::{format_amount, parse_amount};
//!
//! let minor = parse_amount("1500.5").unwrap();
//! assert_eq!(minor, 150_050);
//! assert_eq!(format_amount(minor), "KES 1,500.50");
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Currency code used for display.
pub const CURRENCY: &str = "KES";

/// Decimal places of the wallet currency.
pub const CURRENCY_DECIMALS: u32 = 2;

const MINOR_PER_MAJOR: u64 = 100;

// ============================================================================
// Error Types
// ============================================================================

/// Money conversion errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Parse: Client → Internal (String/Decimal → u64)
// ============================================================================

/// Convert a user-typed amount string to minor units.
///
/// # Errors
/// * `PrecisionOverflow` - more than two decimal places
/// * `InvalidAmount` - zero, negative or explicitly signed
/// * `Overflow` - result would overflow `u64`
/// * `InvalidFormat` - anything that is not `digits[.digits]`
pub fn parse_amount(amount_str: &str) -> Result<u64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }

    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let (whole, frac) = match amount_str.split_once('.') {
        None => (amount_str, ""),
        Some((whole, frac)) => {
            // Require both sides of the dot: ".5" and "5." are ambiguous
            if whole.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing leading zero (e.g., use 0.5 instead of .5)".into(),
                ));
            }
            if frac.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            if frac.contains('.') {
                return Err(MoneyError::InvalidFormat("multiple decimal points".into()));
            }
            (whole, frac)
        }
    };

    if !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in whole part: {}",
            whole
        )));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MoneyError::InvalidFormat(format!(
            "invalid character in fractional part: {}",
            frac
        )));
    }

    // No silent truncation
    if frac.len() > CURRENCY_DECIMALS as usize {
        return Err(MoneyError::PrecisionOverflow {
            provided: frac.len() as u32,
            max: CURRENCY_DECIMALS,
        });
    }

    let whole_num: u64 = whole.parse().map_err(|_| MoneyError::Overflow)?;
    let frac_num: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = CURRENCY_DECIMALS as usize);
        padded
            .parse()
            .map_err(|_| MoneyError::InvalidFormat("invalid fractional part".into()))?
    };

    let amount = whole_num
        .checked_mul(MINOR_PER_MAJOR)
        .and_then(|v| v.checked_add(frac_num))
        .ok_or(MoneyError::Overflow)?;

    if amount == 0 {
        return Err(MoneyError::InvalidAmount);
    }

    Ok(amount)
}

/// Convert a positive `Decimal` (major units) to minor units.
///
/// Used for amounts that arrive already typed, such as the suggested amount
/// of a scanned payment code.
pub fn decimal_to_minor(decimal: Decimal) -> Result<u64, MoneyError> {
    if decimal.is_sign_negative() || decimal.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }

    let scaled = decimal
        .checked_mul(Decimal::from(MINOR_PER_MAJOR))
        .ok_or(MoneyError::Overflow)?;
    if !scaled.fract().is_zero() {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimal.scale(),
            max: CURRENCY_DECIMALS,
        });
    }

    scaled.to_u64().ok_or(MoneyError::Overflow)
}

/// Convert a cached balance (major units, possibly sub-cent) to minor units.
///
/// Negative balances clamp to zero and fractions of a cent are truncated,
/// so the result never overstates what the wallet holds.
pub fn balance_to_minor(balance: Decimal) -> u64 {
    if balance.is_sign_negative() {
        return 0;
    }
    (balance * Decimal::from(MINOR_PER_MAJOR))
        .trunc()
        .to_u64()
        .unwrap_or(u64::MAX)
}

/// Convert minor units back to a major-unit `Decimal` for the wire.
pub fn minor_to_decimal(minor: u64) -> Decimal {
    Decimal::from_i128_with_scale(minor as i128, CURRENCY_DECIMALS)
}

// ============================================================================
// Format: Internal → Client (u64 → String)
// ============================================================================

/// Render minor units as `KES 1,234.50`.
pub fn format_amount(minor: u64) -> String {
    let whole = minor / MINOR_PER_MAJOR;
    let cents = minor % MINOR_PER_MAJOR;
    format!("{} {}.{:02}", CURRENCY, group_thousands(whole), cents)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ============================================================================
// Unit Tests
// ============================================================================
