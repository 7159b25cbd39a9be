use std::fmt;

use crate::provider::ProviderRpcError;

/// Error type for wallet session operations.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletError {
    /// No provider object was found at the injection point.
    ProviderAbsent,
    /// The account query succeeded but returned no accounts.
    NoAuthorizedAccount,
    /// The user declined the request in the wallet (EIP-1193 code 4001).
    UserRejected,
    /// Malformed major-unit amount or minor-unit quantity.
    InvalidAmount(String),
    /// A transfer was attempted with no known account address.
    NotConnected,
    /// Missing or empty caller input.
    InvalidInput(String),
    /// Any other provider failure.
    ProviderRequestFailed { method: String, code: i64, message: String },
    /// Configuration-related errors.
    ConfigError(String),
    /// Transport errors talking to a JSON-RPC node.
    NetworkError(String),
    /// Serialization/deserialization errors.
    SerializationError(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletError::ProviderAbsent => write!(f, "No wallet provider found"),
            WalletError::NoAuthorizedAccount => write!(f, "No authorized account found"),
            WalletError::UserRejected => write!(f, "User rejected the request"),
            WalletError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            WalletError::NotConnected => write!(f, "Not connected: no account address available"),
            WalletError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            WalletError::ProviderRequestFailed { method, code, message } => {
                write!(f, "Provider request {} failed ({}): {}", method, code, message)
            }
            WalletError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            WalletError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            WalletError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

impl WalletError {
    /// Wraps a provider error raised by `method`. Rejections (4001) and
    /// unauthorized accounts (4100) get their own variants.
    pub fn provider(method: &str, err: ProviderRpcError) -> Self {
        if err.is_user_rejection() {
            return WalletError::UserRejected;
        }
        if err.code == ProviderRpcError::UNAUTHORIZED {
            return WalletError::NoAuthorizedAccount;
        }
        WalletError::ProviderRequestFailed {
            method: method.to_string(),
            code: err.code,
            message: err.message,
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        WalletError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for WalletError {
    fn from(err: toml::de::Error) -> Self {
        WalletError::ConfigError(err.to_string())
    }
}
