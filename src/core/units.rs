//! Conversions between the major display unit (ether) and the minor unit
//! (wei) used on the wire.
//!
//! Value-bearing paths stay in 256-bit integers end to end. The float
//! conversion exists for display only and must never feed back into a
//! transaction.

use ethers::types::U256;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::core::errors::WalletError;
use crate::utils::hex_quantity_digits;

/// Fixed exponent between the major and minor unit.
pub const MINOR_UNIT_DECIMALS: usize = 18;

static MAJOR_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9]+\.?[0-9]*|\.[0-9]+)$").expect("Hardcoded regex should always compile")
});

/// Converts a decimal major-unit amount (e.g. `"1.5"`) to a `0x`-prefixed
/// minor-unit hex quantity.
pub fn major_to_minor_hex(major: &str) -> Result<String, WalletError> {
    let minor = major_to_minor(major)?;
    Ok(format!("0x{:x}", minor))
}

/// Scales a decimal major-unit amount to minor units.
pub fn major_to_minor(major: &str) -> Result<U256, WalletError> {
    let amount = major.trim();
    if !MAJOR_AMOUNT_RE.is_match(amount) {
        return Err(WalletError::InvalidAmount(format!(
            "'{}' is not a non-negative decimal number",
            major
        )));
    }

    let (whole, fraction) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    if fraction.len() > MINOR_UNIT_DECIMALS {
        return Err(WalletError::InvalidAmount(format!(
            "'{}' has more than {} decimal places",
            major, MINOR_UNIT_DECIMALS
        )));
    }

    let overflow = || WalletError::InvalidAmount(format!("'{}' exceeds 256 bits in minor units", major));

    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).map_err(|_| overflow())?
    };
    let padded = format!("{:0<width$}", fraction, width = MINOR_UNIT_DECIMALS);
    let fraction = U256::from_dec_str(&padded).map_err(|_| overflow())?;

    whole
        .checked_mul(U256::exp10(MINOR_UNIT_DECIMALS))
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(overflow)
}

/// Decodes a `0x`-prefixed minor-unit quantity.
pub fn parse_minor_hex(hex: &str) -> Result<U256, WalletError> {
    let digits = hex_quantity_digits(hex).map_err(|e| WalletError::InvalidAmount(e.to_string()))?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| WalletError::InvalidAmount(format!("'{}': {:?}", hex, e)))
}

/// Display-only conversion of a minor-unit quantity to a float in major
/// units. Absent, empty or malformed input yields `0.0`.
pub fn minor_hex_to_major(hex: Option<&str>) -> f64 {
    minor_hex_to_major_string(hex)
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Exact decimal rendering of a minor-unit quantity in major units.
pub fn minor_hex_to_major_string(hex: Option<&str>) -> Option<String> {
    let hex = hex.map(str::trim).filter(|h| !h.is_empty())?;
    match parse_minor_hex(hex) {
        Ok(value) => Some(ethers::utils::format_ether(value)),
        Err(e) => {
            warn!(balance = %hex, error = %e, "Unparseable balance quantity, displaying 0");
            None
        }
    }
}
