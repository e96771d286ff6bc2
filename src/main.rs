use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use nexusd::command::CommandDispatcher;
use nexusd::connection::ConnectionServer;
use nexusd::dispatch::HandlerDispatcher;
use nexusd::format::FormatRegistry;
use nexusd::server::AppConfig;
use nexusd::session::{RealClock, SessionManager, SessionManagerConfig};

#[derive(Parser)]
struct Cli {
    #[command(flatten)]
    config: AppConfig,
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Cli::parse().config;

    let addr = cfg
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {:?}", cfg.bind))?;

    // Concrete wire formats, handlers, and commands are registered here by
    // the embedding application; this binary serves the bare core with none
    // registered, falling back to `DefaultFormat`/`DefaultHandler` for every
    // packet.
    let formats = FormatRegistry::new();
    let dispatcher = HandlerDispatcher::new();
    let _commands = CommandDispatcher::new();

    let mut sessions = SessionManager::new(
        RealClock,
        SessionManagerConfig {
            cleanup_interval: Duration::from_secs(cfg.cleanup_interval_secs),
            default_valid_for: Duration::from_secs(cfg.session_duration_secs),
            absolute_lifetime: Duration::from_secs(cfg.session_lifetime_secs),
        },
    );
    sessions.spawn_sweeper();

    let server = ConnectionServer::new(formats, dispatcher);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let serve = tokio::spawn(async move { server.serve(addr, shutdown_rx).await });

    shutdown_signal().await;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    serve.await.context("connection server task panicked")?.context("connection server failed")?;
    sessions.shutdown().await;
    Ok(())
}
