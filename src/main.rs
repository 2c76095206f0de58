// Entry point for the smartpanel hub.
// Starts the background refreshers and the HTTP API, then tears both down on Ctrl-C or SIGTERM.

mod api;
mod cache;
mod config;
mod error;
mod refresh;
mod services;
#[cfg(test)]
mod test_support;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::cache::CacheStore;
use crate::config::{KEY_FITNESS, Settings};
use crate::error::Result;
use crate::refresh::{CooldownGate, TaskSupervisor};
use crate::services::HomebridgeClient;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "smartpanel failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let settings = Settings::from_env()?;
    settings.validate()?;

    let http = Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let store = CacheStore::new();
    let homebridge = Arc::new(HomebridgeClient::from_settings(http.clone(), &settings));

    let tasks = services::refresh_tasks(&settings, &http, &homebridge);
    let mut supervisor = TaskSupervisor::start(store.clone(), tasks);
    if supervisor.is_empty() {
        warn!("no refresh sources configured");
    }

    // No fitness source yet; serve a stable placeholder.
    store.set(KEY_FITNESS, json!({ "placeholder": true }));

    let listener = TcpListener::bind(settings.bind_addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        jobs = supervisor.len(),
        "smartpanel started"
    );

    let state = AppState {
        store,
        homebridge,
        cooldown: Arc::new(CooldownGate::new(settings.action_cooldown)),
        resync: supervisor.resync(settings.resync_delay),
        phases: supervisor.phases(),
        settings: Arc::new(settings),
        started_at: Instant::now(),
    };

    let served = axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    supervisor.shutdown().await;
    drop(http);
    served?;

    info!("smartpanel shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down");
}
