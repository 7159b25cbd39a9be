use serde::{Deserialize, Serialize};

use super::global;
use super::traits::Eip1193Provider;

/// Wallet flavor announced by the injected provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderCapability {
    None,
    MetaMaskLike,
    ABCLike,
}

impl ProviderCapability {
    pub fn is_available(&self) -> bool {
        !matches!(self, ProviderCapability::None)
    }
}

/// Derives the capability from a provider slot. An empty slot, or a provider
/// announcing neither flag, yields `None`. MetaMask wins when both are set.
pub fn detect(slot: Option<&dyn Eip1193Provider>) -> ProviderCapability {
    match slot {
        Some(p) if p.is_meta_mask() => ProviderCapability::MetaMaskLike,
        Some(p) if p.is_abc() => ProviderCapability::ABCLike,
        _ => ProviderCapability::None,
    }
}

/// [`detect`] applied to the process-wide injection slot.
pub fn detect_injected() -> ProviderCapability {
    let injected = global::injected();
    detect(injected.as_deref())
}
