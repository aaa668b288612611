// server/src/main.rs

// Entry point for the clinic administration server. Parses CLI arguments,
// loads configuration, wires the storage backend and auth service, and
// serves the HTTP surface until SIGTERM/SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};

use clinic::auth::AuthService;
use clinic::config::ClinicConfig;
use clinic::session::SessionStore;
use clinic::storage::{ClinicStore, MemoryStore, PostgresStore, StorageEngineKind};

use clinic_server::http::{router, AppState};

#[derive(Debug, Parser)]
#[command(name = "clinic_server", about = "Clinic administration server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<String>,
    /// Run against the in-memory store regardless of configuration.
    #[arg(long)]
    in_memory: bool,
}

async fn handle_signals() {
    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to set up SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to set up SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = ClinicConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if cli.in_memory {
        config.storage.engine = StorageEngineKind::Memory;
    }

    let store: Arc<dyn ClinicStore> = match config.storage.engine {
        StorageEngineKind::Postgres => {
            let conn = config
                .storage
                .connection_string
                .as_deref()
                .context("storage.connection_string is required for the postgres engine")?;
            Arc::new(PostgresStore::connect(conn).await?)
        }
        StorageEngineKind::Memory => {
            info!("Using in-memory storage; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    store.init_schema().await?;

    let sessions = SessionStore::new(config.session.ttl_minutes);
    let auth = AuthService::new(store.clone(), sessions, config.session.remember_days);
    let state = Arc::new(AppState { store, auth });

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("Clinic server listening on http://{}", config.listen_addr);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(handle_signals())
        .await
        .context("server error")?;

    Ok(())
}
