// tests/util.rs
// Shared test helpers for integration tests

use std::sync::Arc;
use std::time::Duration;

use wallet_session::core::session::{SessionStore, WalletSession};
use wallet_session::provider::{Eip1193Provider, MockProvider};
use wallet_session::service::ActionDispatcher;

/// One ether in wei, as providers encode it.
#[allow(dead_code)]
pub const ONE_ETHER_HEX: &str = "0xDE0B6B3A7640000";

#[allow(dead_code)]
pub fn dispatcher_for(provider: &Arc<MockProvider>) -> Arc<ActionDispatcher> {
    Arc::new(ActionDispatcher::new(
        Some(provider.clone() as Arc<dyn Eip1193Provider>),
        SessionStore::new(),
    ))
}

/// Waits (bounded) until the store satisfies `predicate`.
#[allow(dead_code)]
pub async fn wait_for_session<F>(store: &SessionStore, predicate: F) -> WalletSession
where
    F: FnMut(&WalletSession) -> bool,
{
    let mut rx = store.subscribe();
    let session = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("session did not reach expected state in time")
        .expect("session store dropped");
    session.clone()
}
