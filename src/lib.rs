#![allow(clippy::doc_lazy_continuation)]
// src/lib.rs

pub mod cli;
pub mod core;
pub mod provider;
pub mod service;
pub mod utils;

pub use crate::core::{SessionPatch, SessionStore, WalletError, WalletSession};
pub use crate::provider::{Eip1193Provider, ProviderCapability};
pub use crate::service::WalletApp;
