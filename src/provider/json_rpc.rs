use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::listeners::ListenerRegistry;
use super::traits::{
    methods, ConnectInfo, EventHandler, Eip1193Provider, ListenerId, ProviderEvent,
    ProviderEventKind, ProviderRpcError, RpcRequest,
};
use crate::core::config::ProviderConfig;
use crate::core::errors::WalletError;

/// Lower bound for the change-polling period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct PollState {
    accounts: Option<Vec<String>>,
    chain_id: Option<String>,
    connect_announced: bool,
}

/// Provider backed by an HTTP JSON-RPC node.
///
/// Nodes never push events, so account and chain changes are detected by
/// [`JsonRpcProvider::poll_changes`] and re-emitted as provider events.
#[derive(Debug)]
pub struct JsonRpcProvider {
    client: reqwest::Client,
    rpc_url: reqwest::Url,
    is_metamask: bool,
    is_abc: bool,
    next_id: AtomicU64,
    connected: AtomicBool,
    poll_state: Mutex<PollState>,
    listeners: ListenerRegistry,
}

impl JsonRpcProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, WalletError> {
        let rpc_url_clean = config.rpc_url.trim();
        let rpc_url = reqwest::Url::parse(rpc_url_clean).map_err(|e| {
            WalletError::ConfigError(format!(
                "Invalid RPC URL '{}': {}. Please check wallet.toml or WALLET_RPC_URL.",
                rpc_url_clean, e
            ))
        })?;

        // Short timeout; allow proxy environment vars.
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if let Ok(proxy) = std::env::var("HTTPS_PROXY").or_else(|_| std::env::var("HTTP_PROXY")) {
            if let Ok(p) = reqwest::Proxy::all(proxy) {
                builder = builder.proxy(p);
            }
        }
        let client = builder
            .build()
            .map_err(|e| WalletError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        info!("JSON-RPC provider targeting {}", rpc_url);
        Ok(Self {
            client,
            rpc_url,
            is_metamask: config.is_metamask,
            is_abc: config.is_abc,
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
            poll_state: Mutex::new(PollState::default()),
            listeners: ListenerRegistry::new(),
        })
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc_url.as_str()
    }

    async fn send(&self, request: &RpcRequest) -> Result<Value, ProviderRpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": request.method,
            "params": request.params,
        });
        debug!(method = %request.method, id, "JSON-RPC request");

        let resp = match self.client.post(self.rpc_url.clone()).json(&payload).send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                return Err(ProviderRpcError::new(
                    ProviderRpcError::DISCONNECTED,
                    format!("transport error: {}", e),
                ));
            }
        };
        let status = resp.status();
        let body: Value = resp.json().await.map_err(|e| {
            ProviderRpcError::new(
                ProviderRpcError::INTERNAL_ERROR,
                format!("invalid response body (status {}): {}", status, e),
            )
        })?;
        self.connected.store(true, Ordering::SeqCst);

        if let Some(err) = body.get("error") {
            let parsed: ProviderRpcError = serde_json::from_value(err.clone()).unwrap_or_else(|_| {
                ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, err.to_string())
            });
            return Err(parsed);
        }
        if !status.is_success() {
            return Err(ProviderRpcError::new(
                ProviderRpcError::INTERNAL_ERROR,
                format!("rpc error status: {}", status),
            ));
        }
        body.get("result").cloned().ok_or_else(|| {
            ProviderRpcError::new(
                ProviderRpcError::INTERNAL_ERROR,
                format!("unexpected rpc response: {}", body),
            )
        })
    }

    /// Queries accounts and chain id, emits events for whatever changed since
    /// the previous poll and returns them. The first successful poll (and the
    /// first one after the node became unreachable) announces `connect`;
    /// otherwise it only records a baseline.
    pub async fn poll_changes(&self) -> Result<Vec<ProviderEvent>, ProviderRpcError> {
        let polled = self.poll_once().await;

        let mut events = Vec::new();
        {
            let mut state = self.poll_state.lock();
            let (chain_id, accounts) = match polled {
                Ok(polled) => polled,
                Err(e) => {
                    if e.code == ProviderRpcError::DISCONNECTED {
                        state.connect_announced = false;
                    }
                    return Err(e);
                }
            };

            if !state.connect_announced {
                state.connect_announced = true;
                events.push(ProviderEvent::Connect(ConnectInfo { chain_id: Some(chain_id.clone()) }));
            }
            if state.chain_id.as_ref().is_some_and(|prev| *prev != chain_id) {
                events.push(ProviderEvent::ChainChanged(chain_id.clone()));
            }
            if state.accounts.as_ref().is_some_and(|prev| *prev != accounts) {
                events.push(ProviderEvent::AccountsChanged(accounts.clone()));
            }
            state.chain_id = Some(chain_id);
            state.accounts = Some(accounts);
        }

        for event in &events {
            self.listeners.emit(event.clone());
        }
        Ok(events)
    }

    async fn poll_once(&self) -> Result<(String, Vec<String>), ProviderRpcError> {
        let chain_id = self.send(&RpcRequest::new(methods::ETH_CHAIN_ID)).await?;
        let chain_id = chain_id.as_str().map(str::to_string).ok_or_else(|| {
            ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, "eth_chainId returned non-string")
        })?;
        let accounts: Vec<String> =
            serde_json::from_value(self.send(&RpcRequest::new(methods::ETH_ACCOUNTS)).await?)
                .map_err(|e| ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, e.to_string()))?;
        Ok((chain_id, accounts))
    }

    /// Polls every `interval` until `cancel` fires. Intervals below
    /// [`MIN_POLL_INTERVAL`] are raised to it.
    pub fn spawn_poller(
        self: Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let interval = if interval < MIN_POLL_INTERVAL {
            warn!(requested = ?interval, "Poll interval too small, using {:?}", MIN_POLL_INTERVAL);
            MIN_POLL_INTERVAL
        } else {
            interval
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("JSON-RPC poller stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll_changes().await {
                            warn!(error = %e, "Provider poll failed");
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Eip1193Provider for JsonRpcProvider {
    fn is_meta_mask(&self) -> bool {
        self.is_metamask
    }

    fn is_abc(&self) -> bool {
        self.is_abc
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderRpcError> {
        match self.send(&request).await {
            // Node-backed accounts are pre-authorized; nodes without the
            // wallet method answer with the plain account list.
            Err(e)
                if request.method == methods::ETH_REQUEST_ACCOUNTS
                    && e.code == ProviderRpcError::METHOD_NOT_FOUND =>
            {
                debug!("eth_requestAccounts unsupported by node, falling back to eth_accounts");
                self.send(&RpcRequest::new(methods::ETH_ACCOUNTS)).await
            }
            other => other,
        }
    }

    fn on(&self, kind: ProviderEventKind, handler: EventHandler) -> ListenerId {
        self.listeners.add(kind, handler)
    }

    fn remove_listener(&self, kind: ProviderEventKind, id: ListenerId) -> bool {
        self.listeners.remove(kind, id)
    }

    fn listener_count(&self, kind: ProviderEventKind) -> usize {
        self.listeners.count(kind)
    }
}
