use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::core::errors::WalletError;

/// JSON-RPC provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Node endpoint backing the provider
    #[serde(default = "ProviderConfig::default_rpc_url")]
    pub rpc_url: String,

    /// HTTP request timeout (seconds)
    #[serde(default = "ProviderConfig::default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interval between account/chain change polls (milliseconds)
    #[serde(default = "ProviderConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Capability flag announced by the provider
    #[serde(default = "ProviderConfig::default_is_metamask")]
    pub is_metamask: bool,

    /// Capability flag announced by the provider
    #[serde(default)]
    pub is_abc: bool,
}

impl ProviderConfig {
    fn default_rpc_url() -> String { "http://127.0.0.1:8545".to_string() }
    fn default_request_timeout_secs() -> u64 { 10 }
    fn default_poll_interval_ms() -> u64 { 2_000 }
    fn default_is_metamask() -> bool { true }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            rpc_url: Self::default_rpc_url(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            is_metamask: Self::default_is_metamask(),
            is_abc: false,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    /// `tracing` filter used when RUST_LOG is unset
    #[serde(default = "ClientConfig::default_log_filter")]
    pub log_filter: String,
}

impl ClientConfig {
    fn default_log_filter() -> String { "info,hyper=warn,reqwest=warn".to_string() }

    /// Parses a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, WalletError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads `path`, or the defaults when the file does not exist, then
    /// applies environment overrides.
    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                WalletError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            info!("Loaded client config from {}", path.display());
            Self::from_toml_str(&content)?
        } else {
            info!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the provider cannot run with.
    pub fn validate(&self) -> Result<(), WalletError> {
        if self.provider.poll_interval_ms == 0 {
            return Err(WalletError::ConfigError(
                "provider.poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.provider.request_timeout_secs == 0 {
            return Err(WalletError::ConfigError(
                "provider.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// `WALLET_RPC_URL` and `WALLET_LOG` take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("WALLET_RPC_URL") {
            if !url.trim().is_empty() {
                self.provider.rpc_url = url.trim().to_string();
            }
        }
        if let Ok(filter) = std::env::var("WALLET_LOG") {
            if !filter.trim().is_empty() {
                self.log_filter = filter;
            }
        }
    }

    /// Config file location: `CONFIG_PATH` or `./wallet.toml`.
    pub fn default_path() -> std::path::PathBuf {
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "wallet.toml".to_string()).into()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { provider: ProviderConfig::default(), log_filter: Self::default_log_filter() }
    }
}
