use anyhow::{Context, Result};
use axum::Router;
use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::Path,
    sync::Mutex,
};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::object_storage::ObjectStorageService;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Environment (.env is optional) ---
    dotenvy::dotenv().ok();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    // --- Logging setup ---
    init_tracing(&cfg)?;

    tracing::info!("Starting {} with config: {:?}", cfg.app_name, cfg);

    // --- Initialize object storage gateway ---
    let storage = ObjectStorageService::new(&cfg.storage)
        .await
        .context("initializing object storage")?;
    tracing::info!(
        bucket = %storage.bucket(),
        endpoint = %storage.endpoint_url(),
        "Object storage ready"
    );

    // --- Build router ---
    let state = AppState::new(cfg.app_name.clone(), storage);
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log to stdout and append plain-text lines to `cfg.log_file`.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(cfg: &config::AppConfig) -> Result<()> {
    let log_path = Path::new(&cfg.log_file);
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating log directory {}", parent.display()))?;
        }
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    tracing::info!("Logging setup completed");
    Ok(())
}
