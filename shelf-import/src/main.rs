//! shelf-import - CSV bulk import for the Shelf books collection
//!
//! Serves the import workflow over HTTP + SSE, or with `--import <FILE>`
//! runs one import from the command line and exits.

use anyhow::{Context, Result};
use clap::Parser;
use shelf_common::config::{
    default_config_path, load_toml_config, RootFolderInitializer, RootFolderResolver, TomlConfig,
};
use shelf_common::events::EventBus;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use shelf_import::db::{init_database_pool, BookStore, SqliteBookStore};
use shelf_import::models::ImportDisposition;
use shelf_import::services::{ImportOrchestrator, UploadedFile};
use shelf_import::{build_router, AppState};

const MODULE_NAME: &str = "shelf-import";

/// Command-line arguments for shelf-import
#[derive(Parser, Debug)]
#[command(name = "shelf-import")]
#[command(about = "CSV bulk import for the Shelf books collection")]
#[command(version)]
struct Args {
    /// Root folder holding shelf.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/shelf/shelf-import.toml)
    #[arg(short, long, env = "SHELF_IMPORT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides [server] port)
    #[arg(short, long, env = "SHELF_IMPORT_PORT")]
    port: Option<u16>,

    /// Import this CSV file and exit instead of serving HTTP
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// What to do with rows that already exist (with --import)
    #[arg(long, value_enum, default_value_t = ImportDisposition::Skip)]
    on_duplicate: ImportDisposition,
}

/// Install the tracing subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match &config.logging.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Loaded before tracing so the configured level applies; reported below
    let config_path = args.config.clone().or_else(|| default_config_path(MODULE_NAME));
    let loaded = match config_path.as_deref() {
        Some(path) => load_toml_config(path),
        None => Ok(None),
    };
    let config = match &loaded {
        Ok(Some(config)) => config.clone(),
        _ => TomlConfig::default(),
    };

    init_tracing(&config)?;

    info!(
        "Starting Shelf Import (shelf-import) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match (&loaded, config_path.as_deref()) {
        (Ok(Some(_)), Some(path)) => info!("Config: {}", path.display()),
        (Ok(None), Some(path)) => warn!("Config file {} not found, using defaults", path.display()),
        (Err(e), _) => {
            error!("Invalid config: {}", e);
            return Err(anyhow::anyhow!("Invalid config: {}", e));
        }
        _ => warn!("No config directory available on this platform, using defaults"),
    }

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .with_config_path(config_path.clone())
        .resolve();

    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let db_pool = init_database_pool(&db_path).await?;
    info!("Database connection established");

    let store: Arc<dyn BookStore> =
        Arc::new(SqliteBookStore::new(db_pool, config.import.max_lock_wait_ms));
    let event_bus = EventBus::new(100);

    if let Some(file) = args.import.as_deref() {
        return run_once(store, event_bus, &config, file, args.on_duplicate).await;
    }

    let state = AppState::new(store, event_bus, config.import.clone());
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let port = args.port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Import one file through the pipeline and print the summary
async fn run_once(
    store: Arc<dyn BookStore>,
    event_bus: EventBus,
    config: &TomlConfig,
    path: &Path,
    disposition: ImportDisposition,
) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut pipeline = ImportOrchestrator::new(store, event_bus, config.import.clone());
    let preview = pipeline.upload(UploadedFile::new(name, bytes)).await?;

    for row_error in &preview.error_rows {
        println!("Zeile {}: {}", row_error.row_index, row_error.errors.join("; "));
    }
    println!(
        "{} Zeilen, {} gueltig, {} fehlerhaft, {} bereits vorhanden",
        preview.total_rows,
        preview.valid_rows,
        preview.error_rows.len(),
        preview.duplicates.len()
    );

    if !preview.can_confirm() {
        anyhow::bail!("Keine gueltigen Zeilen zum Importieren");
    }

    pipeline.set_disposition(disposition)?;
    let result = pipeline
        .confirm_import(|progress| {
            info!(
                batch = progress.completed_batches,
                of = progress.total_batches,
                percentage = progress.percentage,
                "Import progress"
            );
        })
        .await?;

    println!("{}", result.summary());
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
