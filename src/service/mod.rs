pub mod dispatcher;
pub mod subscriptions;

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

pub use dispatcher::{ActionDispatcher, ConnectOutcome, RefreshOutcome, TransferOutcome};
pub use subscriptions::{EventSubscriptionManager, SubscriptionHandle};

use crate::core::errors::WalletError;
use crate::core::session::{SessionStore, WalletSession};
use crate::provider::{detect, global, Eip1193Provider, ProviderCapability};

/// What [`WalletApp::init`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub capability: ProviderCapability,
    pub subscribed: bool,
    pub refresh: Option<RefreshOutcome>,
}

/// Wires detector, store, dispatcher and subscriptions together for one
/// hosting surface.
pub struct WalletApp {
    capability: ProviderCapability,
    dispatcher: Arc<ActionDispatcher>,
    subscriptions: EventSubscriptionManager,
    handle: Mutex<Option<SubscriptionHandle>>,
}

impl WalletApp {
    pub fn new(provider: Option<Arc<dyn Eip1193Provider>>) -> Self {
        let capability = detect(provider.as_deref());
        let dispatcher = Arc::new(ActionDispatcher::new(provider, SessionStore::new()));
        Self {
            capability,
            subscriptions: EventSubscriptionManager::new(dispatcher.clone()),
            dispatcher,
            handle: Mutex::new(None),
        }
    }

    /// Builds the app around whatever sits in the global injection slot.
    pub fn from_injected() -> Self {
        Self::new(global::injected())
    }

    /// Subscribes to provider events whenever a provider exists, then runs
    /// the initial chain and balance refresh if its capability is recognised.
    pub async fn init(&self) -> Result<InitReport, WalletError> {
        let Some(provider) = self.dispatcher.provider().cloned() else {
            warn!("No wallet provider found");
            return Ok(InitReport { capability: self.capability, subscribed: false, refresh: None });
        };

        let handle = self.subscriptions.subscribe(provider);
        *self.handle.lock() = Some(handle);

        if !self.capability.is_available() {
            info!("Wallet provider does not announce a known capability, skipping initial refresh");
            return Ok(InitReport { capability: self.capability, subscribed: true, refresh: None });
        }
        info!(capability = ?self.capability, "Wallet provider detected");

        if let Err(e) = self.dispatcher.refresh_chain().await {
            warn!(error = %e, "Initial chain id unavailable");
        }
        let refresh = self.dispatcher.refresh_balance().await?;
        Ok(InitReport { capability: self.capability, subscribed: true, refresh: Some(refresh) })
    }

    pub fn capability(&self) -> ProviderCapability {
        self.capability
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    pub fn session(&self) -> WalletSession {
        self.dispatcher.session()
    }

    pub fn watch(&self) -> watch::Receiver<WalletSession> {
        self.dispatcher.store().subscribe()
    }

    pub async fn connect(&self) -> Result<ConnectOutcome, WalletError> {
        self.dispatcher.connect().await
    }

    pub async fn refresh_balance(&self) -> Result<RefreshOutcome, WalletError> {
        self.dispatcher.refresh_balance().await
    }

    pub async fn send_transfer(&self, to: &str, amount: &str) -> Result<TransferOutcome, WalletError> {
        self.dispatcher.send_transfer(to, amount).await
    }

    pub fn disconnect(&self) -> WalletSession {
        self.dispatcher.disconnect()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.is_subscribed()
    }

    /// Unregisters every provider listener.
    pub fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().take() {
            self.subscriptions.unsubscribe(handle);
        }
    }
}
