use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// JSON-RPC methods issued against the provider.
pub mod methods {
    pub const ETH_ACCOUNTS: &str = "eth_accounts";
    pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
    pub const ETH_GET_BALANCE: &str = "eth_getBalance";
    pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
    pub const ETH_CHAIN_ID: &str = "eth_chainId";
}

/// Event names a provider can push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProviderEventKind {
    Connect,
    AccountsChanged,
    ChainChanged,
}

impl ProviderEventKind {
    pub const ALL: [ProviderEventKind; 3] =
        [ProviderEventKind::Connect, ProviderEventKind::AccountsChanged, ProviderEventKind::ChainChanged];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEventKind::Connect => "connect",
            ProviderEventKind::AccountsChanged => "accountsChanged",
            ProviderEventKind::ChainChanged => "chainChanged",
        }
    }
}

/// Payload of the `connect` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectInfo {
    #[serde(rename = "chainId", default)]
    pub chain_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect(ConnectInfo),
    /// Ordered account list as pushed by the provider. Not authoritative.
    AccountsChanged(Vec<String>),
    ChainChanged(String),
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::Connect(_) => ProviderEventKind::Connect,
            ProviderEvent::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            ProviderEvent::ChainChanged(_) => ProviderEventKind::ChainChanged,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(ProviderEvent) + Send + Sync>;

/// Identifies a registered listener for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: &str) -> Self {
        Self { method: method.to_string(), params: Vec::new() }
    }

    pub fn with_params(method: &str, params: Vec<Value>) -> Self {
        Self { method: method.to_string(), params }
    }
}

/// Error object returned by a provider request (EIP-1193 / JSON-RPC shape).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    pub const USER_REJECTED_REQUEST: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const DISCONNECTED: i64 = 4900;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED_REQUEST, "User rejected the request.")
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED_REQUEST
    }
}

/// Injected wallet provider: capability probes, request/response and an
/// event stream.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    fn is_meta_mask(&self) -> bool;

    fn is_abc(&self) -> bool {
        false
    }

    fn is_connected(&self) -> bool;

    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderRpcError>;

    /// Registers `handler` for `kind`. Every call adds a new listener.
    fn on(&self, kind: ProviderEventKind, handler: EventHandler) -> ListenerId;

    /// Returns false if `id` was not registered for `kind`.
    fn remove_listener(&self, kind: ProviderEventKind, id: ListenerId) -> bool;

    fn listener_count(&self, kind: ProviderEventKind) -> usize;
}
