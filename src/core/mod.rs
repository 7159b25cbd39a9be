pub mod config;
pub mod errors;
pub mod session;
pub mod units;

pub use errors::WalletError;
pub use session::{Field, SessionPatch, SessionStore, WalletSession};
