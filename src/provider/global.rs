//! Process-wide provider injection slot.
//!
//! Components take their provider explicitly; this slot only exists for
//! hosts that expose a single ambient provider (the way a browser extension
//! injects one object per page).

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::info;

use super::traits::Eip1193Provider;

static INJECTED: Lazy<RwLock<Option<Arc<dyn Eip1193Provider>>>> = Lazy::new(|| RwLock::new(None));

/// Installs `provider`, returning the one it replaced.
pub fn inject(provider: Arc<dyn Eip1193Provider>) -> Option<Arc<dyn Eip1193Provider>> {
    info!(
        metamask = provider.is_meta_mask(),
        abc = provider.is_abc(),
        "Wallet provider injected"
    );
    INJECTED.write().replace(provider)
}

/// Empties the slot.
pub fn take() -> Option<Arc<dyn Eip1193Provider>> {
    INJECTED.write().take()
}

pub fn injected() -> Option<Arc<dyn Eip1193Provider>> {
    INJECTED.read().clone()
}
