//! Dispatch worker - runs the campaign scheduler and the connection
//! supervisor side by side until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dispatch::{Config, HttpGateway, JsonFileStore, Scheduler, Supervisor, TokioSleeper};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    tracing::info!("worker_starting");

    let config = Config::from_env();
    info!(
        data_dir = %config.data_dir.display(),
        scan_interval_ms = config.scan_interval.as_millis() as u64,
        supervisor_interval_ms = config.supervisor_interval.as_millis() as u64,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        "config_loaded"
    );

    let store = Arc::new(JsonFileStore::new(config.data_dir.clone()));
    let gateway = Arc::new(
        HttpGateway::new(config.request_timeout).context("Failed to create HTTP client")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = Scheduler::new(
        store.clone(),
        gateway.clone(),
        TokioSleeper,
        StdRng::from_entropy(),
    )
    .with_default_pacing(config.default_pacing)
    .with_interval(config.scan_interval);

    let supervisor = Supervisor::new(store, gateway, TokioSleeper)
        .with_interval(config.supervisor_interval);

    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx.clone()));
    let supervisor_task = tokio::spawn(supervisor.run(shutdown_rx));

    wait_for_signal().await?;
    info!("worker_stopping");
    shutdown_tx.send(true).ok();

    scheduler_task.await.context("scheduler task panicked")?;
    supervisor_task.await.context("supervisor task panicked")?;

    info!("worker_shutdown_complete");
    Ok(())
}

async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.context("Failed to install Ctrl+C handler")?;
                info!("Received SIGINT");
            }
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("Failed to install Ctrl+C handler")?;
        info!("Received SIGINT");
    }

    Ok(())
}
