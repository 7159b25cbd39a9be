//! Action dispatcher: user-invoked commands and provider event handling.
//!
//! Every operation folds its result into the [`SessionStore`] through
//! `apply`. Failures are logged here and returned as typed results; nothing
//! is allowed to escape as a panic into the rendering surface.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::core::errors::WalletError;
use crate::core::session::{SessionPatch, SessionStore, WalletSession};
use crate::core::units::{major_to_minor_hex, parse_minor_hex};
use crate::provider::{methods, Eip1193Provider, ProviderEvent, RpcRequest};

/// Block tag used for balance queries.
const LATEST: &str = "latest";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RefreshOutcome {
    Refreshed,
    /// The account query returned an empty list; session untouched.
    NoAuthorizedAccount,
    ProviderAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConnectOutcome {
    Connected { address: String },
    /// The user declined in the wallet; session untouched.
    Rejected,
    NoAccountReturned,
    ProviderAbsent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransferOutcome {
    Submitted { tx_hash: String },
    Rejected,
    ProviderAbsent,
}

impl RefreshOutcome {
    /// `Refreshed` as `Ok`, the other outcomes as their error.
    pub fn into_result(self) -> Result<(), WalletError> {
        match self {
            RefreshOutcome::Refreshed => Ok(()),
            RefreshOutcome::NoAuthorizedAccount => Err(WalletError::NoAuthorizedAccount),
            RefreshOutcome::ProviderAbsent => Err(WalletError::ProviderAbsent),
        }
    }
}

impl ConnectOutcome {
    /// The authorized address, or the error to show for any other outcome.
    pub fn into_result(self) -> Result<String, WalletError> {
        match self {
            ConnectOutcome::Connected { address } => Ok(address),
            ConnectOutcome::Rejected => Err(WalletError::UserRejected),
            ConnectOutcome::NoAccountReturned => Err(WalletError::NoAuthorizedAccount),
            ConnectOutcome::ProviderAbsent => Err(WalletError::ProviderAbsent),
        }
    }
}

impl TransferOutcome {
    /// The transaction hash, or the error to show for any other outcome.
    pub fn into_result(self) -> Result<String, WalletError> {
        match self {
            TransferOutcome::Submitted { tx_hash } => Ok(tx_hash),
            TransferOutcome::Rejected => Err(WalletError::UserRejected),
            TransferOutcome::ProviderAbsent => Err(WalletError::ProviderAbsent),
        }
    }
}

pub struct ActionDispatcher {
    provider: Option<Arc<dyn Eip1193Provider>>,
    store: SessionStore,
}

impl ActionDispatcher {
    pub fn new(provider: Option<Arc<dyn Eip1193Provider>>, store: SessionStore) -> Self {
        Self { provider, store }
    }

    pub fn provider(&self) -> Option<&Arc<dyn Eip1193Provider>> {
        self.provider.as_ref()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Read-only snapshot for the rendering surface.
    pub fn session(&self) -> WalletSession {
        self.store.current()
    }

    fn provider_or_log(&self, operation: &str) -> Option<&Arc<dyn Eip1193Provider>> {
        if self.provider.is_none() {
            warn!(operation, "No wallet provider found");
        }
        self.provider.as_ref()
    }

    async fn call(
        provider: &dyn Eip1193Provider,
        method: &str,
        params: Vec<Value>,
    ) -> Result<Value, WalletError> {
        debug!(method, "Provider request");
        provider
            .request(RpcRequest::with_params(method, params))
            .await
            .map_err(|e| WalletError::provider(method, e))
    }

    async fn accounts(provider: &dyn Eip1193Provider, method: &str) -> Result<Vec<String>, WalletError> {
        let value = Self::call(provider, method, Vec::new()).await?;
        serde_json::from_value(value).map_err(|e| WalletError::ProviderRequestFailed {
            method: method.to_string(),
            code: 0,
            message: format!("malformed account list: {}", e),
        })
    }

    /// Re-reads the first authorized account and its balance.
    pub async fn refresh_balance(&self) -> Result<RefreshOutcome, WalletError> {
        let Some(provider) = self.provider_or_log("refresh_balance") else {
            return Ok(RefreshOutcome::ProviderAbsent);
        };
        let result = self.refresh_with(provider.as_ref()).await;
        if let Err(e) = &result {
            error!(error = %e, "Balance refresh failed");
        }
        result
    }

    async fn refresh_with(&self, provider: &dyn Eip1193Provider) -> Result<RefreshOutcome, WalletError> {
        let accounts = Self::accounts(provider, methods::ETH_ACCOUNTS).await?;
        let Some(account) = accounts.into_iter().next() else {
            info!("No authorized account found");
            return Ok(RefreshOutcome::NoAuthorizedAccount);
        };

        let balance =
            Self::call(provider, methods::ETH_GET_BALANCE, vec![json!(account), json!(LATEST)]).await?;
        let balance = balance
            .as_str()
            .filter(|b| parse_minor_hex(b).is_ok())
            .map(str::to_string)
            .ok_or_else(|| WalletError::ProviderRequestFailed {
                method: methods::ETH_GET_BALANCE.to_string(),
                code: 0,
                message: format!("balance is not a hex quantity: {}", balance),
            })?;

        let session = self.store.apply(
            SessionPatch::new()
                .address(account)
                .balance(balance)
                .connected(provider.is_connected()),
        );
        info!(address = ?session.address, balance = ?session.balance_minor_units, "Session refreshed");
        Ok(RefreshOutcome::Refreshed)
    }

    /// Asks the wallet to authorize an account.
    pub async fn connect(&self) -> Result<ConnectOutcome, WalletError> {
        let Some(provider) = self.provider_or_log("connect") else {
            return Ok(ConnectOutcome::ProviderAbsent);
        };

        match Self::accounts(provider.as_ref(), methods::ETH_REQUEST_ACCOUNTS).await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(address) => {
                    self.store.apply(
                        SessionPatch::new().address(address.clone()).connected(provider.is_connected()),
                    );
                    info!(address = %address, "Wallet connected");
                    Ok(ConnectOutcome::Connected { address })
                }
                None => {
                    info!("Wallet returned no accounts");
                    Ok(ConnectOutcome::NoAccountReturned)
                }
            },
            Err(WalletError::UserRejected) => {
                info!("Please connect to the wallet: request rejected by user");
                Ok(ConnectOutcome::Rejected)
            }
            Err(e) => {
                error!(error = %e, "Wallet connection failed");
                Err(e)
            }
        }
    }

    /// Submits a native transfer from the session account. The session is
    /// never mutated by a transfer.
    pub async fn send_transfer(
        &self,
        to_address: &str,
        major_amount: &str,
    ) -> Result<TransferOutcome, WalletError> {
        let Some(provider) = self.provider_or_log("send_transfer") else {
            return Ok(TransferOutcome::ProviderAbsent);
        };

        let tx = match self.build_transfer(to_address, major_amount) {
            Ok(tx) => tx,
            Err(e) => {
                warn!(error = %e, "Transfer rejected before submission");
                return Err(e);
            }
        };

        info!(to = %to_address, amount = %major_amount, "Submitting transfer");
        match Self::call(provider.as_ref(), methods::ETH_SEND_TRANSACTION, vec![tx]).await {
            Ok(hash) => match hash.as_str() {
                Some(tx_hash) => {
                    info!(tx_hash = %tx_hash, "Transaction sent");
                    Ok(TransferOutcome::Submitted { tx_hash: tx_hash.to_string() })
                }
                None => {
                    let e = WalletError::ProviderRequestFailed {
                        method: methods::ETH_SEND_TRANSACTION.to_string(),
                        code: 0,
                        message: format!("transaction hash is not a string: {}", hash),
                    };
                    error!(error = %e, "Transfer failed");
                    Err(e)
                }
            },
            Err(WalletError::UserRejected) => {
                info!("Transfer rejected by user");
                Ok(TransferOutcome::Rejected)
            }
            Err(e) => {
                error!(error = %e, "Transfer failed");
                Err(e)
            }
        }
    }

    /// Local preconditions; no provider traffic.
    fn build_transfer(&self, to_address: &str, major_amount: &str) -> Result<Value, WalletError> {
        if to_address.trim().is_empty() {
            return Err(WalletError::InvalidInput("destination address is empty".to_string()));
        }
        if major_amount.trim().is_empty() {
            return Err(WalletError::InvalidInput("amount is empty".to_string()));
        }
        let from = self.store.current().address.ok_or(WalletError::NotConnected)?;
        let value = major_to_minor_hex(major_amount)?;
        Ok(json!({ "from": from, "to": to_address.trim(), "value": value }))
    }

    /// Records the provider's current chain id.
    pub async fn refresh_chain(&self) -> Result<RefreshOutcome, WalletError> {
        let Some(provider) = self.provider_or_log("refresh_chain") else {
            return Ok(RefreshOutcome::ProviderAbsent);
        };
        let chain_id = Self::call(provider.as_ref(), methods::ETH_CHAIN_ID, Vec::new())
            .await
            .map_err(|e| {
                error!(error = %e, "Chain id query failed");
                e
            })?;
        match chain_id.as_str() {
            Some(chain_id) => {
                self.store.apply(SessionPatch::new().chain_id(chain_id));
                Ok(RefreshOutcome::Refreshed)
            }
            None => Err(WalletError::ProviderRequestFailed {
                method: methods::ETH_CHAIN_ID.to_string(),
                code: 0,
                message: format!("chain id is not a string: {}", chain_id),
            }),
        }
    }

    /// Forgets the local session. The provider keeps its authorization.
    pub fn disconnect(&self) -> WalletSession {
        info!("Local wallet session reset");
        self.store.apply(SessionPatch::reset())
    }

    /// Folds one provider-pushed event into the session.
    pub async fn handle_event(&self, event: ProviderEvent) {
        let Some(provider) = self.provider.as_ref() else {
            return;
        };
        match event {
            ProviderEvent::Connect(info) => {
                info!(chain_id = ?info.chain_id, "Provider connected");
                let mut patch = SessionPatch::new().connected(provider.is_connected());
                if let Some(chain_id) = info.chain_id {
                    patch = patch.chain_id(chain_id);
                }
                self.store.apply(patch);
            }
            ProviderEvent::AccountsChanged(accounts) => {
                info!(?accounts, "Accounts changed");
                // Only a confirmed account may stay in the session.
                match self.refresh_balance().await {
                    Ok(RefreshOutcome::Refreshed) => {}
                    outcome => {
                        debug!(?outcome, "Account change not confirmed, clearing cached account");
                        self.store.apply(SessionPatch::new().clear_account());
                    }
                }
            }
            ProviderEvent::ChainChanged(chain_id) => {
                info!(chain_id = %chain_id, "Chain changed");
                self.store.apply(SessionPatch::new().chain_id(chain_id));
                if let Err(e) = self.refresh_balance().await {
                    debug!(error = %e, "Balance not refreshed after chain change");
                }
            }
        }
    }
}
