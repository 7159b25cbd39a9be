//! Event subscription manager.
//!
//! Owns at most one live subscription: one listener per event kind plus a
//! worker task that drains events in order into the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::dispatcher::ActionDispatcher;
use crate::provider::{Eip1193Provider, ListenerId, ProviderEvent, ProviderEventKind};

/// Proof of a live subscription, consumed by [`EventSubscriptionManager::unsubscribe`].
#[must_use = "dropping the handle leaves the subscription active until teardown"]
#[derive(Debug, PartialEq, Eq)]
pub struct SubscriptionHandle {
    id: u64,
}

struct ActiveSubscription {
    id: u64,
    provider: Arc<dyn Eip1193Provider>,
    listeners: Vec<(ProviderEventKind, ListenerId)>,
    worker: JoinHandle<()>,
}

impl ActiveSubscription {
    fn teardown(self) {
        for (kind, id) in self.listeners {
            if !self.provider.remove_listener(kind, id) {
                debug!(event = kind.as_str(), "Listener already gone");
            }
        }
        self.worker.abort();
        debug!(subscription = self.id, "Subscription torn down");
    }
}

pub struct EventSubscriptionManager {
    dispatcher: Arc<ActionDispatcher>,
    active: Mutex<Option<ActiveSubscription>>,
    next_id: AtomicU64,
}

impl EventSubscriptionManager {
    pub fn new(dispatcher: Arc<ActionDispatcher>) -> Self {
        Self { dispatcher, active: Mutex::new(None), next_id: AtomicU64::new(1) }
    }

    /// Registers one listener per event kind on `provider`, replacing any
    /// existing subscription first. Must be called within a Tokio runtime.
    pub fn subscribe(&self, provider: Arc<dyn Eip1193Provider>) -> SubscriptionHandle {
        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            debug!(subscription = previous.id, "Replacing existing subscription");
            previous.teardown();
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<ProviderEvent>();
        let listeners = ProviderEventKind::ALL
            .iter()
            .map(|&kind| {
                let tx = tx.clone();
                let id = provider.on(
                    kind,
                    Arc::new(move |event| {
                        // Closed only after teardown.
                        let _ = tx.send(event);
                    }),
                );
                (kind, id)
            })
            .collect();

        let dispatcher = self.dispatcher.clone();
        let worker = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatcher.handle_event(event).await;
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *active = Some(ActiveSubscription { id, provider, listeners, worker });
        info!(subscription = id, "Subscribed to provider events");
        SubscriptionHandle { id }
    }

    /// Removes every listener of the subscription behind `handle`. Returns
    /// false for a stale handle.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut active = self.active.lock();
        match active.take() {
            Some(current) if current.id == handle.id => {
                current.teardown();
                info!(subscription = handle.id, "Unsubscribed from provider events");
                true
            }
            other => {
                *active = other;
                false
            }
        }
    }

    /// Tears down whatever subscription is live.
    pub fn teardown(&self) {
        if let Some(current) = self.active.lock().take() {
            current.teardown();
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl Drop for EventSubscriptionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
