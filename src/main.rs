//! Vantage Back binary entrypoint wiring the match registry, persistence
//! collaborator, and broadcast scheduler. The ingest and output transports
//! attach to the registry handle built here; no state is global.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dto;
mod error;
mod persistence;
mod services;
mod state;
mod translate;

use config::EngineConfig;
use persistence::NullPersistence;
use state::MatchRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = EngineConfig::from_env();
    info!(?config, "engine configuration loaded");

    // The registry is the single authority for live matches. Transports and
    // collaborators receive this handle; swap NullPersistence for a real
    // backend client to enable durable match records.
    let registry = MatchRegistry::new(config, Arc::new(NullPersistence));

    info!("match registry ready, waiting for sessions");
    shutdown_signal().await.context("waiting for shutdown")?;

    for handle in registry.handles() {
        registry.remove_match(handle.group_code());
    }
    info!("shut down cleanly");

    Ok(())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = term.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
