// src/provider/mock.rs
//! Scripted in-memory provider. Records every request and replays queued
//! responses per method.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::listeners::ListenerRegistry;
use super::traits::{
    methods, EventHandler, Eip1193Provider, ListenerId, ProviderEvent, ProviderEventKind,
    ProviderRpcError, RpcRequest,
};
use crate::utils::bytes_to_prefixed_hex;

type MockResult = Result<Value, ProviderRpcError>;

#[derive(Debug)]
pub struct MockProvider {
    is_metamask: bool,
    is_abc: bool,
    connected: AtomicBool,
    queued: Mutex<HashMap<String, VecDeque<MockResult>>>,
    sticky: Mutex<HashMap<String, MockResult>>,
    requests: Mutex<Vec<RpcRequest>>,
    tx_counter: AtomicU64,
    listeners: ListenerRegistry,
}

impl MockProvider {
    pub fn with_flags(is_metamask: bool, is_abc: bool) -> Self {
        Self {
            is_metamask,
            is_abc,
            connected: AtomicBool::new(true),
            queued: Mutex::new(HashMap::new()),
            sticky: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            tx_counter: AtomicU64::new(0),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn metamask() -> Self {
        Self::with_flags(true, false)
    }

    pub fn abc() -> Self {
        Self::with_flags(false, true)
    }

    pub fn generic() -> Self {
        Self::with_flags(false, false)
    }

    /// Queues a one-shot response for `method`. Queued responses win over
    /// the sticky one.
    pub fn push_result(&self, method: &str, result: Value) {
        self.push(method, Ok(result));
    }

    pub fn push_error(&self, method: &str, error: ProviderRpcError) {
        self.push(method, Err(error));
    }

    fn push(&self, method: &str, result: MockResult) {
        self.queued.lock().entry(method.to_string()).or_default().push_back(result);
    }

    /// Response returned for `method` whenever nothing is queued.
    pub fn set_result(&self, method: &str, result: Value) {
        self.sticky.lock().insert(method.to_string(), Ok(result));
    }

    pub fn set_error(&self, method: &str, error: ProviderRpcError) {
        self.sticky.lock().insert(method.to_string(), Err(error));
    }

    /// Convenience: `eth_accounts` and `eth_requestAccounts` both return `accounts`.
    pub fn set_accounts(&self, accounts: &[&str]) {
        self.set_result(methods::ETH_ACCOUNTS, json!(accounts));
        self.set_result(methods::ETH_REQUEST_ACCOUNTS, json!(accounts));
    }

    pub fn set_balance(&self, balance_hex: &str) {
        self.set_result(methods::ETH_GET_BALANCE, json!(balance_hex));
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<RpcRequest> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests_for(&self, method: &str) -> Vec<RpcRequest> {
        self.requests.lock().iter().filter(|r| r.method == method).cloned().collect()
    }

    /// Pushes an event to every registered listener.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        self.listeners.emit(event)
    }

    fn respond(&self, request: &RpcRequest) -> MockResult {
        if let Some(result) =
            self.queued.lock().get_mut(&request.method).and_then(VecDeque::pop_front)
        {
            return result;
        }
        if let Some(result) = self.sticky.lock().get(&request.method) {
            return result.clone();
        }
        if request.method == methods::ETH_SEND_TRANSACTION {
            let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
            let mut hash = [0u8; 32];
            hash[24..].copy_from_slice(&n.to_be_bytes());
            return Ok(json!(bytes_to_prefixed_hex(&hash)));
        }
        Err(ProviderRpcError::new(
            ProviderRpcError::METHOD_NOT_FOUND,
            format!("no mock response for {}", request.method),
        ))
    }
}

#[async_trait]
impl Eip1193Provider for MockProvider {
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
        self.requests.lock().push(request.clone());
        self.respond(&request)
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
