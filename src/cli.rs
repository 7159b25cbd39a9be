use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::core::session::WalletSession;
use crate::core::units::minor_hex_to_major_string;
use crate::provider::ProviderCapability;

/// Wallet session CLI (library-facing definitions)
#[derive(Debug, Parser)]
#[command(name = "wallet-cli", about = "Wallet session client for an EIP-1193 style provider", version)]
pub struct Cli {
    /// Path to the TOML config (defaults to $CONFIG_PATH or ./wallet.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides the provider RPC URL from the config
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect the provider and print the current session
    Status,
    /// Request account authorization from the wallet
    Connect,
    /// Re-read the authorized account and its balance
    Balance,
    /// Send native currency from the connected account
    Send {
        #[arg(long)]
        to: String,
        /// Amount in ether, e.g. 0.5
        #[arg(long)]
        amount: String,
    },
    /// Follow account and chain changes until interrupted
    Watch {
        /// Poll interval in milliseconds (defaults to the config value)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,
    },
}

/// Session as printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub capability: ProviderCapability,
    pub connected: bool,
    pub address: Option<String>,
    pub chain_id: Option<String>,
    pub balance_wei: Option<String>,
    pub balance_ether: Option<String>,
}

impl SessionView {
    pub fn new(capability: ProviderCapability, session: &WalletSession) -> Self {
        Self {
            capability,
            connected: session.connected,
            address: session.address.clone(),
            chain_id: session.chain_id.clone(),
            balance_wei: session.balance_minor_units.clone(),
            balance_ether: minor_hex_to_major_string(session.balance_minor_units.as_deref()),
        }
    }
}
