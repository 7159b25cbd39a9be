// src/main.rs
//! Wallet session CLI entry point.
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use wallet_session::cli::{Cli, Commands, SessionView};
use wallet_session::core::config::ClientConfig;
use wallet_session::provider::{global, JsonRpcProvider};
use wallet_session::service::{RefreshOutcome, WalletApp};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let mut config = ClientConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    if let Some(url) = cli.rpc_url.as_deref() {
        config.provider.rpc_url = url.to_string();
    }

    init_logging(&config.log_filter)?;
    info!("Starting wallet-cli v{}", env!("CARGO_PKG_VERSION"));

    let provider = Arc::new(JsonRpcProvider::new(&config.provider)?);
    global::inject(provider.clone());

    let app = WalletApp::from_injected();
    let report = app.init().await.context("Wallet initialization failed")?;
    if report.refresh == Some(RefreshOutcome::NoAuthorizedAccount) {
        info!("No authorized account yet; run `wallet-cli connect`");
    }

    match cli.command {
        Commands::Status => print_session(&app)?,
        Commands::Balance => {
            app.refresh_balance().await?.into_result()?;
            print_session(&app)?;
        }
        Commands::Connect => {
            let address = app.connect().await?.into_result()?;
            info!(address = %address, "Connected");
            app.refresh_balance().await?.into_result()?;
            print_session(&app)?;
        }
        Commands::Send { to, amount } => {
            let tx_hash = app.send_transfer(&to, &amount).await?.into_result()?;
            println!("{}", tx_hash);
        }
        Commands::Watch { interval_ms } => {
            let interval =
                Duration::from_millis(interval_ms.unwrap_or(config.provider.poll_interval_ms));
            watch_session(&app, provider, interval).await?;
        }
    }

    app.shutdown();
    Ok(())
}

fn init_logging(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn print_session(app: &WalletApp) -> Result<()> {
    let view = SessionView::new(app.capability(), &app.session());
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

async fn watch_session(
    app: &WalletApp,
    provider: Arc<JsonRpcProvider>,
    interval: Duration,
) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut poller = provider.spawn_poller(interval, cancel.clone());
    let mut rx = app.watch();
    print_session(app)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                break;
            }
            joined = &mut poller => {
                if let Err(e) = joined {
                    error!(error = %e, "Provider poller task failed");
                }
                bail!("Provider poller stopped unexpectedly");
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_session(app)?;
            }
        }
    }

    cancel.cancel();
    if let Err(e) = poller.await {
        error!(error = %e, "Provider poller task failed");
    }
    Ok(())
}
