//! Session state store.
//!
//! `WalletSession` is the single locally cached view of the provider. The
//! only mutation path is [`SessionStore::apply`], which merges a
//! [`SessionPatch`] field by field under one writer lock.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::core::units::minor_hex_to_major;

/// Connection state, account, balance and chain as last reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub connected: bool,
    pub address: Option<String>,
    /// `0x`-prefixed wei quantity, exactly as the provider returned it.
    pub balance_minor_units: Option<String>,
    pub chain_id: Option<String>,
}

impl WalletSession {
    /// Balance in major units for display. Absent balances show as 0.
    pub fn balance_major(&self) -> f64 {
        minor_hex_to_major(self.balance_minor_units.as_deref())
    }
}

/// Per-field update instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T> Field<T> {
    fn merge_into(self, slot: &mut Option<T>) {
        match self {
            Field::Keep => {}
            Field::Set(v) => *slot = Some(v),
            Field::Clear => *slot = None,
        }
    }

    fn is_keep(&self) -> bool {
        matches!(self, Field::Keep)
    }
}

/// Partial update of a [`WalletSession`]. Fields left at `Keep` are preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionPatch {
    pub connected: Option<bool>,
    pub address: Field<String>,
    pub balance_minor_units: Field<String>,
    pub chain_id: Field<String>,
}

impl SessionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = Some(connected);
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Field::Set(address.into());
        self
    }

    pub fn balance(mut self, balance_minor_units: impl Into<String>) -> Self {
        self.balance_minor_units = Field::Set(balance_minor_units.into());
        self
    }

    pub fn chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Field::Set(chain_id.into());
        self
    }

    /// Drops the cached account and its balance.
    pub fn clear_account(mut self) -> Self {
        self.address = Field::Clear;
        self.balance_minor_units = Field::Clear;
        self
    }

    /// Patch that resets every field to the pre-connection defaults.
    pub fn reset() -> Self {
        Self {
            connected: Some(false),
            address: Field::Clear,
            balance_minor_units: Field::Clear,
            chain_id: Field::Clear,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_none()
            && self.address.is_keep()
            && self.balance_minor_units.is_keep()
            && self.chain_id.is_keep()
    }

    /// Total merge: every field of `session` is either kept or replaced.
    pub fn merge(self, session: &mut WalletSession) {
        if let Some(connected) = self.connected {
            session.connected = connected;
        }
        self.address.merge_into(&mut session.address);
        self.balance_minor_units.merge_into(&mut session.balance_minor_units);
        self.chain_id.merge_into(&mut session.chain_id);
    }
}

/// Shared, cloneable handle to the session. Clones observe the same state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<WalletSession>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates a store holding the pre-connection defaults.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(WalletSession::default());
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current session.
    pub fn current(&self) -> WalletSession {
        self.tx.borrow().clone()
    }

    /// Merges `patch` into the session and returns the resulting snapshot.
    pub fn apply(&self, patch: SessionPatch) -> WalletSession {
        if patch.is_empty() {
            return self.current();
        }
        debug!(?patch, "Applying session patch");

        let mut snapshot = WalletSession::default();
        self.tx.send_if_modified(|session| {
            let before = session.clone();
            patch.merge(session);
            snapshot = session.clone();
            *session != before
        });
        snapshot
    }

    /// Change feed for rendering surfaces; notified only on real changes.
    pub fn subscribe(&self) -> watch::Receiver<WalletSession> {
        self.tx.subscribe()
    }
}
