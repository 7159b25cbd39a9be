use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use super::traits::{EventHandler, ListenerId, ProviderEvent, ProviderEventKind};

/// Event emitter shared by provider implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<ProviderEventKind, Vec<(ListenerId, EventHandler)>>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        f.debug_struct("ListenerRegistry").field("listeners", &counts).finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, kind: ProviderEventKind, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().entry(kind).or_default().push((id, handler));
        id
    }

    pub fn remove(&self, kind: ProviderEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        match listeners.get_mut(&kind) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|(existing, _)| *existing != id);
                entries.len() != before
            }
            None => false,
        }
    }

    pub fn count(&self, kind: ProviderEventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Invokes every handler registered for the event's kind and returns how
    /// many ran. Handlers run outside the lock so they may (un)register.
    pub fn emit(&self, event: ProviderEvent) -> usize {
        let handlers: Vec<EventHandler> = self
            .listeners
            .lock()
            .get(&event.kind())
            .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        trace!(event = event.kind().as_str(), handlers = handlers.len(), "Emitting provider event");
        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn add_emit_remove() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = registry.add(
            ProviderEventKind::ChainChanged,
            Arc::new(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(registry.emit(ProviderEvent::ChainChanged("0x1".into())), 1);
        assert_eq!(registry.emit(ProviderEvent::AccountsChanged(vec![])), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(registry.remove(ProviderEventKind::ChainChanged, id));
        assert!(!registry.remove(ProviderEventKind::ChainChanged, id));
        assert_eq!(registry.count(ProviderEventKind::ChainChanged), 0);
    }
}
