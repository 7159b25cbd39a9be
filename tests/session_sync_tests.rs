//! tests/session_sync_tests.rs
//!
//! Dispatcher and store behavior against a scripted provider.

mod util;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use wallet_session::core::session::{SessionPatch, SessionStore, WalletSession};
use wallet_session::core::units::minor_hex_to_major;
use wallet_session::provider::{methods, MockProvider, ProviderRpcError};
use wallet_session::service::{ConnectOutcome, RefreshOutcome, TransferOutcome};
use wallet_session::WalletError;

use util::{dispatcher_for, ONE_ETHER_HEX};

#[tokio::test]
async fn test_refresh_scenario_one_ether() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_accounts(&["0xABC"]);
    provider.set_balance(ONE_ETHER_HEX);
    let dispatcher = dispatcher_for(&provider);

    let outcome = dispatcher.refresh_balance().await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let session = dispatcher.session();
    assert_eq!(session.address.as_deref(), Some("0xABC"));
    assert_eq!(minor_hex_to_major(session.balance_minor_units.as_deref()), 1.0);
}

#[tokio::test]
async fn test_refresh_with_no_accounts_keeps_connection_state() {
    let provider = Arc::new(MockProvider::metamask());
    let dispatcher = dispatcher_for(&provider);
    dispatcher.store().apply(SessionPatch::new().connected(true).address("0xold"));
    let before = dispatcher.session();

    provider.set_result(methods::ETH_ACCOUNTS, json!([]));
    let outcome = dispatcher.refresh_balance().await.unwrap();

    assert_eq!(outcome, RefreshOutcome::NoAuthorizedAccount);
    let after = dispatcher.session();
    assert_eq!(after.connected, before.connected);
    assert_eq!(after.address, before.address);
    // no balance query without an account
    assert!(provider.requests_for(methods::ETH_GET_BALANCE).is_empty());
}

#[tokio::test]
async fn test_connect_user_rejection_leaves_session_identical() {
    let provider = Arc::new(MockProvider::metamask());
    provider.push_error(methods::ETH_REQUEST_ACCOUNTS, ProviderRpcError::user_rejected());
    let dispatcher = dispatcher_for(&provider);
    dispatcher.store().apply(SessionPatch::new().chain_id("0x1"));
    let before = dispatcher.session();

    let outcome = dispatcher.connect().await.unwrap();

    assert_eq!(outcome, ConnectOutcome::Rejected);
    assert_eq!(dispatcher.session(), before);
}

#[tokio::test]
async fn test_connect_applies_first_address() {
    let provider = Arc::new(MockProvider::abc());
    provider.set_accounts(&["0x1111", "0x2222"]);
    let dispatcher = dispatcher_for(&provider);

    let outcome = dispatcher.connect().await.unwrap();

    assert_eq!(outcome, ConnectOutcome::Connected { address: "0x1111".to_string() });
    let session = dispatcher.session();
    assert_eq!(session.address.as_deref(), Some("0x1111"));
    assert!(session.connected);
    assert_eq!(session.balance_minor_units, None);
}

#[tokio::test]
async fn test_connect_reports_disconnected_provider_flag() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_accounts(&["0x1111"]);
    provider.set_connected(false);
    let dispatcher = dispatcher_for(&provider);

    dispatcher.connect().await.unwrap();
    assert!(!dispatcher.session().connected);
}

#[tokio::test]
async fn test_send_without_address_fails_before_any_request() {
    let provider = Arc::new(MockProvider::metamask());
    let dispatcher = dispatcher_for(&provider);

    let result = dispatcher.send_transfer("0xdef", "1").await;

    assert_eq!(result, Err(WalletError::NotConnected));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_send_builds_minor_unit_request() {
    let provider = Arc::new(MockProvider::metamask());
    provider.set_result(methods::ETH_SEND_TRANSACTION, json!("0xfeed"));
    let dispatcher = dispatcher_for(&provider);
    dispatcher.store().apply(SessionPatch::new().address("0xabc").balance("0x5"));
    let before = dispatcher.session();

    let outcome = dispatcher.send_transfer("0xdef", "1.5").await.unwrap();

    assert_eq!(outcome, TransferOutcome::Submitted { tx_hash: "0xfeed".to_string() });
    let sent = provider.requests_for(methods::ETH_SEND_TRANSACTION);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].params,
        vec![json!({ "from": "0xabc", "to": "0xdef", "value": "0x14d1120d7b160000" })]
    );
    // transfers never touch the session
    assert_eq!(dispatcher.session(), before);
}

#[tokio::test]
async fn test_send_rejection_and_failure() {
    let provider = Arc::new(MockProvider::metamask());
    provider.push_error(methods::ETH_SEND_TRANSACTION, ProviderRpcError::user_rejected());
    provider.push_error(
        methods::ETH_SEND_TRANSACTION,
        ProviderRpcError::new(-32000, "insufficient funds for gas"),
    );
    let dispatcher = dispatcher_for(&provider);
    dispatcher.store().apply(SessionPatch::new().address("0xabc"));

    assert_eq!(dispatcher.send_transfer("0xdef", "1").await, Ok(TransferOutcome::Rejected));
    match dispatcher.send_transfer("0xdef", "1").await {
        Err(WalletError::ProviderRequestFailed { method, code, message }) => {
            assert_eq!(method, methods::ETH_SEND_TRANSACTION);
            assert_eq!(code, -32000);
            assert!(message.contains("insufficient funds"));
        }
        other => panic!("expected ProviderRequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_send_invalid_amount_issues_no_request() {
    let provider = Arc::new(MockProvider::metamask());
    let dispatcher = dispatcher_for(&provider);
    dispatcher.store().apply(SessionPatch::new().address("0xabc"));

    let result = dispatcher.send_transfer("0xdef", "1,5").await;

    assert!(matches!(result, Err(WalletError::InvalidAmount(_))));
    assert_eq!(provider.request_count(), 0);
}

#[test]
fn test_sequential_partial_updates() {
    let store = SessionStore::new();
    store.apply(SessionPatch::new().address("0xA"));
    let session = store.apply(SessionPatch::new().balance("0x5"));

    assert_eq!(
        session,
        WalletSession {
            connected: false,
            address: Some("0xA".to_string()),
            balance_minor_units: Some("0x5".to_string()),
            chain_id: None,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_disjoint_fields() {
    let store = SessionStore::new();

    for round in 0..50u32 {
        let address = format!("0x{:x}", round);
        let chain_id = format!("0x{:x}", round + 1000);

        let address_writer = {
            let store = store.clone();
            let address = address.clone();
            tokio::spawn(async move {
                store.apply(SessionPatch::new().address(address));
            })
        };
        let chain_writer = {
            let store = store.clone();
            let chain_id = chain_id.clone();
            tokio::spawn(async move {
                store.apply(SessionPatch::new().chain_id(chain_id));
            })
        };
        address_writer.await.unwrap();
        chain_writer.await.unwrap();

        let session = store.current();
        assert_eq!(session.address, Some(address), "address lost in round {}", round);
        assert_eq!(session.chain_id, Some(chain_id), "chain id lost in round {}", round);
    }
}
