mod app;
mod config;
mod context;
mod handlers;
mod middleware;
mod provision;
mod state;
mod storage;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use listenfd::ListenFd;
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todos_core::provision::{ProvisionOutcome, ProvisionTarget};

use crate::{
    app::create_app, config::Config, provision::provision, state::AppState,
    storage::connector_from_config,
};

/// Todos - A todo list service backed by a document store
#[derive(Parser, Debug)]
#[command(name = "todos")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Host address to bind the server to
    #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
    host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "PORT")]
    port: u16,

    /// Directory served for every path that is not an API route
    #[arg(
        long,
        default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/public"),
        env = "PUBLIC_DIR"
    )]
    public_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todos=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        engine = %config.engine,
        data_dir = %config.data_dir.display(),
        database = %config.database,
        "Using storage"
    );

    let connector = connector_from_config(&config)?;

    // The server only starts once the table and its index are usable
    match provision(connector.as_ref(), &ProvisionTarget::default()).await {
        Ok(ProvisionOutcome::AlreadyReady) => {}
        Ok(ProvisionOutcome::Provisioned { applied, skipped }) => {
            tracing::info!(applied = ?applied, skipped = ?skipped, "Provisioning finished");
        }
        Err(e) => {
            tracing::error!(error = %e, "Provisioning failed");
            return Err(e.into());
        }
    }
    tracing::info!("Table and index are available, starting server...");

    let state = AppState::new(connector);
    let app = create_app(state, &cli.public_dir, config.request_timeout());

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{}:{}", cli.host, cli.port);
            TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
