// src/utils.rs
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum UtilsError {
    #[error("Invalid hex quantity: {0}")]
    InvalidHexQuantity(String),
}

/// Strips a leading `0x`/`0X` and validates the remaining hex digits.
///
/// JSON-RPC quantities always carry the prefix and at least one digit.
pub fn hex_quantity_digits(quantity: &str) -> Result<&str, UtilsError> {
    let digits = quantity
        .strip_prefix("0x")
        .or_else(|| quantity.strip_prefix("0X"))
        .ok_or_else(|| UtilsError::InvalidHexQuantity(format!("missing 0x prefix: {}", quantity)))?;

    if digits.is_empty() {
        return Err(UtilsError::InvalidHexQuantity("no digits after 0x".to_string()));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(UtilsError::InvalidHexQuantity(format!("non-hex digits: {}", quantity)));
    }
    Ok(digits)
}

/// Returns true if `quantity` is a `0x`-prefixed base-16 integer.
pub fn is_hex_quantity(quantity: &str) -> bool {
    hex_quantity_digits(quantity).is_ok()
}

/// Encode raw bytes as a `0x`-prefixed hex string.
pub fn bytes_to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
