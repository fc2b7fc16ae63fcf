//! Barbershop - sleeping barber simulation
//!
//! One barber, one receptionist, a bounded waiting room and an endless stream
//! of customers arriving at random intervals. Every event is logged to stdout.
//!
//! Module structure:
//! - `domain/` - Core types (Customer, outcome slot, barber state)
//! - `services/` - Concurrent roles (WaitingRoom, Barber, Receptionist, generator, Shop)
//! - `infra/` - Infrastructure (Config, Metrics)

use barbershop::infra::{Config, Metrics};
use barbershop::services::Shop;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Barbershop - sleeping barber simulation
#[derive(Parser, Debug)]
#[command(name = "barbershop", version, about)]
struct Args {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config is read before logging starts so it can pick the log level;
    // a load failure is reported once the subscriber is up
    let (config, load_error) = match args.config.as_deref() {
        Some(path) => match Config::from_file(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
        None => (Config::default(), None),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);
    if config.log_json() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Some(e) = load_error {
        warn!(error = %format!("{:#}", e), "config_load_failed_using_defaults");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        config_file = %config.config_file(),
        capacity = %config.capacity(),
        service_ms = ?config.service_range_ms(),
        arrival_ms = ?config.arrival_range_ms(),
        idle_interval_ms = %config.idle_interval().as_millis(),
        wake_mode = ?config.wake_mode(),
        max_customers = ?config.max_customers(),
        seed = ?config.seed(),
        "barbershop_starting"
    );

    let metrics = Arc::new(Metrics::new());

    // Periodic metrics summary
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    let reporter = tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        // First tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    let shop = Shop::open_with_customers(&config, metrics.clone()).await?;

    let tally = shop
        .run_until(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown_signal_received");
        })
        .await?;

    reporter.abort();
    metrics.report().log();

    info!(
        spawned = %tally.spawned,
        served = %tally.served,
        turned_away = %tally.turned_away,
        unresolved = %tally.unresolved,
        "barbershop shutdown complete"
    );
    Ok(())
}
