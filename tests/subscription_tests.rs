//! tests/subscription_tests.rs
//!
//! Event routing, subscription lifecycle and the app init flow.

mod util;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wallet_session::core::session::{SessionPatch, WalletSession};
use wallet_session::provider::{
    methods, ConnectInfo, Eip1193Provider, MockProvider, ProviderCapability, ProviderEvent,
    ProviderEventKind, ProviderRpcError,
};
use wallet_session::service::{ConnectOutcome, EventSubscriptionManager, RefreshOutcome, WalletApp};

use util::{dispatcher_for, wait_for_session, ONE_ETHER_HEX};

fn listener_counts(provider: &MockProvider) -> Vec<usize> {
    ProviderEventKind::ALL.iter().map(|k| provider.listener_count(*k)).collect()
}

#[tokio::test]
async fn test_repeated_subscribe_registers_one_listener_per_kind() {
    let provider = Arc::new(MockProvider::metamask());
    let manager = EventSubscriptionManager::new(dispatcher_for(&provider));

    let _first = manager.subscribe(provider.clone());
    let _second = manager.subscribe(provider.clone());
    let third = manager.subscribe(provider.clone());

    assert_eq!(listener_counts(&provider), vec![1, 1, 1]);
    assert_eq!(provider.emit(ProviderEvent::ChainChanged("0x1".into())), 1);

    assert!(manager.unsubscribe(third));
    assert_eq!(listener_counts(&provider), vec![0, 0, 0]);
}

#[tokio::test]
async fn test_accounts_changed_triggers_refresh_not_payload() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_accounts(&["0xconfirmed"]);
    provider.set_balance(ONE_ETHER_HEX);
    let dispatcher = dispatcher_for(&provider);
    let manager = EventSubscriptionManager::new(dispatcher.clone());
    let _handle = manager.subscribe(provider.clone());

    provider.emit(ProviderEvent::AccountsChanged(vec!["0xpayload".into(), "0xconfirmed".into()]));

    let session = wait_for_session(dispatcher.store(), |s| s.address.is_some()).await;
    assert_eq!(session.address.as_deref(), Some("0xconfirmed"));
    assert_eq!(session.balance_minor_units.as_deref(), Some(ONE_ETHER_HEX));
    assert_eq!(provider.requests_for(methods::ETH_ACCOUNTS).len(), 1);
}

#[tokio::test]
async fn test_accounts_changed_to_empty_clears_stale_account() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_result(methods::ETH_ACCOUNTS, json!([]));
    let dispatcher = dispatcher_for(&provider);
    dispatcher
        .store()
        .apply(SessionPatch::new().connected(true).address("0xold").balance("0x1"));
    let manager = EventSubscriptionManager::new(dispatcher.clone());
    let _handle = manager.subscribe(provider.clone());

    provider.emit(ProviderEvent::AccountsChanged(vec![]));

    let session = wait_for_session(dispatcher.store(), |s| s.address.is_none()).await;
    assert_eq!(session.balance_minor_units, None);
    assert!(session.connected, "account loss is not a disconnect");
}

#[tokio::test]
async fn test_accounts_changed_with_failed_confirmation_clears_account() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_error(
        methods::ETH_ACCOUNTS,
        ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, "node unavailable"),
    );
    let dispatcher = dispatcher_for(&provider);
    dispatcher
        .store()
        .apply(SessionPatch::new().connected(true).address("0xold").balance("0x1"));
    let manager = EventSubscriptionManager::new(dispatcher.clone());
    let _handle = manager.subscribe(provider.clone());

    provider.emit(ProviderEvent::AccountsChanged(vec!["0xnew".into()]));

    let session = wait_for_session(dispatcher.store(), |s| s.address.is_none()).await;
    assert_eq!(session.balance_minor_units, None);
    assert!(session.connected);
}

#[tokio::test]
async fn test_accounts_changed_with_failed_balance_clears_account() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_accounts(&["0xnew"]);
    provider.set_error(
        methods::ETH_GET_BALANCE,
        ProviderRpcError::new(ProviderRpcError::INTERNAL_ERROR, "state unavailable"),
    );
    let dispatcher = dispatcher_for(&provider);
    dispatcher.store().apply(SessionPatch::new().address("0xold").balance("0x1"));

    dispatcher
        .handle_event(ProviderEvent::AccountsChanged(vec!["0xnew".into()]))
        .await;

    let session = dispatcher.session();
    assert_eq!(session.address, None);
    assert_eq!(session.balance_minor_units, None);
}

#[tokio::test]
async fn test_chain_changed_records_chain_and_refreshes() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_accounts(&["0xabc"]);
    provider.push_result(methods::ETH_GET_BALANCE, json!("0x2"));
    let dispatcher = dispatcher_for(&provider);
    let manager = EventSubscriptionManager::new(dispatcher.clone());
    let _handle = manager.subscribe(provider.clone());

    provider.emit(ProviderEvent::ChainChanged("0x89".into()));

    let session = wait_for_session(dispatcher.store(), |s| s.balance_minor_units.is_some()).await;
    assert_eq!(session.chain_id.as_deref(), Some("0x89"));
    assert_eq!(session.balance_minor_units.as_deref(), Some("0x2"));
}

#[tokio::test]
async fn test_chain_changed_keeps_chain_when_refresh_fails() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_error(
        methods::ETH_ACCOUNTS,
        ProviderRpcError::new(ProviderRpcError::DISCONNECTED, "disconnected"),
    );
    let dispatcher = dispatcher_for(&provider);

    dispatcher.handle_event(ProviderEvent::ChainChanged("0x89".into())).await;

    assert_eq!(dispatcher.session().chain_id.as_deref(), Some("0x89"));
    assert_eq!(provider.requests_for(methods::ETH_ACCOUNTS).len(), 1);
}

#[tokio::test]
async fn test_connect_event_sets_connection_and_chain() {
    let provider = Arc::new(MockProvider::metamask());
    let dispatcher = dispatcher_for(&provider);
    let manager = EventSubscriptionManager::new(dispatcher.clone());
    let _handle = manager.subscribe(provider.clone());

    provider.emit(ProviderEvent::Connect(ConnectInfo { chain_id: Some("0x1".into()) }));

    let session = wait_for_session(dispatcher.store(), |s| s.connected).await;
    assert_eq!(session.chain_id.as_deref(), Some("0x1"));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_events_after_unsubscribe_are_ignored() {
    let provider = Arc::new(MockProvider::metamask());
    let dispatcher = dispatcher_for(&provider);
    let manager = EventSubscriptionManager::new(dispatcher.clone());
    let handle = manager.subscribe(provider.clone());
    assert!(manager.unsubscribe(handle));

    assert_eq!(provider.emit(ProviderEvent::ChainChanged("0x5".into())), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(dispatcher.session().chain_id, None);
}

#[tokio::test]
async fn test_app_init_with_metamask_refreshes() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_accounts(&["0xabc"]);
    provider.set_balance(ONE_ETHER_HEX);
    provider.set_result(methods::ETH_CHAIN_ID, json!("0x1"));
    let app = WalletApp::new(Some(provider.clone() as Arc<dyn Eip1193Provider>));

    let report = app.init().await.unwrap();

    assert_eq!(report.capability, ProviderCapability::MetaMaskLike);
    assert!(report.subscribed);
    assert_eq!(report.refresh, Some(RefreshOutcome::Refreshed));
    let session = app.session();
    assert_eq!(session.chain_id.as_deref(), Some("0x1"));
    assert_eq!(session.balance_major(), 1.0);

    app.shutdown();
    assert!(!app.is_subscribed());
    assert_eq!(listener_counts(&provider), vec![0, 0, 0]);
}

#[tokio::test]
async fn test_app_init_with_unknown_provider_subscribes_without_refresh() {
    let provider = Arc::new(MockProvider::generic());
    let app = WalletApp::new(Some(provider.clone() as Arc<dyn Eip1193Provider>));

    let report = app.init().await.unwrap();

    assert_eq!(report.capability, ProviderCapability::None);
    assert!(report.subscribed);
    assert_eq!(report.refresh, None);
    assert_eq!(provider.request_count(), 0);
    assert_eq!(listener_counts(&provider), vec![1, 1, 1]);
}

#[tokio::test]
async fn test_app_without_provider_is_inert() {
    let app = WalletApp::new(None);

    let report = app.init().await.unwrap();

    assert!(!report.subscribed);
    assert_eq!(app.connect().await.unwrap(), ConnectOutcome::ProviderAbsent);
    assert_eq!(app.session(), WalletSession::default());
}

#[tokio::test]
async fn test_app_reinit_does_not_duplicate_handlers() {
    let provider = Arc::new(MockProvider::abc());
    provider.set_accounts(&["0xabc"]);
    provider.set_balance("0x0");
    provider.set_result(methods::ETH_CHAIN_ID, json!("0x1"));
    let app = WalletApp::new(Some(provider.clone() as Arc<dyn Eip1193Provider>));

    app.init().await.unwrap();
    app.init().await.unwrap();

    assert_eq!(listener_counts(&provider), vec![1, 1, 1]);
}
