//! shelf-import library interface
//!
//! CSV bulk import for the Shelf books collection. Exposes the pipeline
//! services and the HTTP router for the binary and for integration tests.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult, PipelineError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use shelf_common::config::ImportSettings;
use shelf_common::events::EventBus;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::db::BookStore;
use crate::services::ImportOrchestrator;

/// Extra request body allowance on top of the file size limit, so slightly
/// oversized files still reach the size guard and get its message
const BODY_LIMIT_SLACK_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store behind the pipeline and `GET /books`
    pub store: Arc<dyn BookStore>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// The single import pipeline; held locked while an import runs
    pub pipeline: Arc<Mutex<ImportOrchestrator>>,
    /// Percentage of the running import, readable without the pipeline lock
    pub import_progress: Arc<AtomicU8>,
    pub settings: ImportSettings,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: Arc<dyn BookStore>, event_bus: EventBus, settings: ImportSettings) -> Self {
        let orchestrator = ImportOrchestrator::new(store.clone(), event_bus.clone(), settings.clone());
        Self {
            store,
            event_bus,
            pipeline: Arc::new(Mutex::new(orchestrator)),
            import_progress: Arc::new(AtomicU8::new(0)),
            settings,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember an error for `GET /health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let body_limit = usize::try_from(state.settings.max_file_size_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK_BYTES);

    Router::new()
        .merge(api::import_routes())
        .route("/import/events", get(api::import_event_stream))
        .merge(api::book_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
