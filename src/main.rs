//! Oracle Reporter - submits one price report to the oracle contract
//!
//! Loads the gas/retry policy, connects with the oracle wallet and drives the
//! report transaction through escalating-gas retries until it is mined.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use oracle_reporter::chain::ChainConnection;
use oracle_reporter::config::Settings;
use oracle_reporter::metrics::{self, MetricsServer, PrometheusInstrument};
use oracle_reporter::tx::{send_with_retries, ContractCall, PriceReport, SubmissionEvent};

/// Command-line arguments for the reporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "REPORTER_CONFIG", default_value = "config/default.toml")]
    config: PathBuf,

    /// Oracle round the answer belongs to
    #[arg(long)]
    round: u64,

    /// Answer to report, scaled to the feed's decimals
    #[arg(long, allow_hyphen_values = true)]
    answer: i128,

    /// Emit logs as JSON
    #[arg(long, env = "REPORTER_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.log_json);

    info!("Starting Oracle Reporter v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let settings = Settings::load(&args.config)?;
    let manager_config = settings.transaction_manager()?;
    info!(
        "Loaded configuration for {} (retry limit {}, retry multiplier {})",
        settings.reporter.instance_id,
        manager_config.transaction_retry_limit,
        manager_config.transaction_retry_gas_price_multiplier
    );

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let connection = ChainConnection::connect(settings.chain.clone(), &settings.wallet).await?;
    if connection.address() != manager_config.oracle_account {
        anyhow::bail!(
            "Wallet {:?} does not match oracle account {:?}",
            connection.address(),
            manager_config.oracle_account
        );
    }
    if !connection.health_check().await {
        anyhow::bail!("Chain {} is not healthy", connection.chain_id());
    }

    // Surface pending-pool acceptance while waiting for receipts
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let progress_handle = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                SubmissionEvent::Accepted { tx_hash, gas_price } => {
                    info!(tx_hash = ?tx_hash, gas_price = %gas_price, "Transaction accepted, awaiting receipt");
                }
            }
        }
    });

    let report = PriceReport::new(args.round, args.answer);
    let call = ContractCall::new(
        connection.client(),
        connection.oracle_address()?,
        manager_config.oracle_account,
        &report,
    )
    .with_events(event_tx);

    let initial_gas_price = connection
        .gas_price()
        .await
        .context("Failed to fetch initial gas price")?;
    info!(
        round = args.round,
        answer = %args.answer,
        gas_price = %initial_gas_price,
        "Submitting price report"
    );

    let result = tokio::select! {
        result = send_with_retries(&call, initial_gas_price, &manager_config, PrometheusInstrument) => result,
        _ = shutdown_signal() => {
            warn!("Shutdown signal received before the report was confirmed");
            anyhow::bail!("Interrupted");
        }
    };

    drop(call);
    join_progress(progress_handle).await;
    if let Some(h) = metrics_handle {
        h.abort();
    }

    match result {
        Ok(receipt) => {
            metrics::record_report(true);
            info!(
                tx_hash = ?receipt.transaction_hash,
                block = ?receipt.block_number,
                "Price report for round {} confirmed",
                args.round
            );
            Ok(())
        }
        Err(e) => {
            metrics::record_report(false);
            if e.should_alert() {
                error!("Price report for round {} is invalid: {}", args.round, e);
            } else {
                error!("Price report for round {} failed: {}", args.round, e);
            }
            Err(e.into())
        }
    }
}

/// Wait for the progress task to drain. Returns `false` if it panicked or was
/// cancelled.
async fn join_progress(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Progress reporting task failed: {}", e);
            false
        }
    }
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,oracle_reporter=debug,hyper=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
