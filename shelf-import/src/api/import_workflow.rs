//! Import workflow API handlers
//!
//! POST /import/upload, PUT /import/disposition, POST /import/confirm,
//! POST /import/reset, GET /import/status

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use tokio::sync::MutexGuard;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, PipelineError};
use crate::models::{ImportDisposition, ImportResult, PipelineStage, RowError};
use crate::services::{ImportOrchestrator, PreviewSummary, UploadedFile};
use crate::AppState;

/// POST /import/upload query
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

/// PUT /import/disposition request
#[derive(Debug, Deserialize)]
pub struct DispositionRequest {
    pub disposition: ImportDisposition,
}

/// POST /import/confirm response
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub run_id: Uuid,
    pub result: ImportResult,
    pub error_rows: Vec<RowError>,
}

/// GET /import/status response
///
/// While an import is running only `importing` and `progress` are known.
#[derive(Debug, Serialize)]
pub struct ImportStatusResponse {
    pub importing: bool,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

impl ImportStatusResponse {
    fn from_pipeline(pipeline: &ImportOrchestrator) -> Self {
        Self {
            importing: false,
            progress: pipeline.progress(),
            run_id: Some(pipeline.run_id()),
            stage: Some(pipeline.stage()),
            preview: pipeline.preview(),
            result: pipeline.result(),
            rejection: pipeline.rejection().map(|r| r.to_string()),
        }
    }

    fn running(progress: u8) -> Self {
        Self {
            importing: true,
            progress,
            run_id: None,
            stage: None,
            preview: None,
            result: None,
            rejection: None,
        }
    }
}

/// Take the pipeline for a mutating call; a running import holds it
fn lock_pipeline(state: &AppState) -> ApiResult<MutexGuard<'_, ImportOrchestrator>> {
    state
        .pipeline
        .try_lock()
        .map_err(|_| ApiError::Conflict("Import is running".to_string()))
}

/// POST /import/upload?filename=<name>
///
/// Raw CSV body. Returns the preview, or 400 with the rejection message.
pub async fn upload(
    State(state): State<AppState>,
    query: Result<Query<UploadQuery>, QueryRejection>,
    body: Bytes,
) -> ApiResult<Json<PreviewSummary>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut pipeline = lock_pipeline(&state)?;

    tracing::info!(file = %query.filename, bytes = body.len(), "Upload received");

    let file = UploadedFile::new(query.filename, body.to_vec());
    match pipeline.upload(file).await {
        Ok(preview) => Ok(Json(preview)),
        Err(e) => {
            if let PipelineError::Rejected(ref rejection) = e {
                state.record_error(rejection.to_string()).await;
            }
            Err(e.into())
        }
    }
}

/// PUT /import/disposition
pub async fn set_disposition(
    State(state): State<AppState>,
    Json(request): Json<DispositionRequest>,
) -> ApiResult<Json<ImportStatusResponse>> {
    let mut pipeline = lock_pipeline(&state)?;
    pipeline.set_disposition(request.disposition)?;
    Ok(Json(ImportStatusResponse::from_pipeline(&pipeline)))
}

/// POST /import/confirm
///
/// Runs the whole import before answering; progress is available from
/// GET /import/status and the SSE stream meanwhile. The run is a detached
/// task owning the pipeline lock, so a dropped request does not stop it
/// between batches.
pub async fn confirm(State(state): State<AppState>) -> ApiResult<Json<ConfirmResponse>> {
    let mut pipeline = state
        .pipeline
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::Conflict("Import is running".to_string()))?;

    let progress_cell = state.import_progress.clone();
    progress_cell.store(0, Ordering::Relaxed);

    let task_state = state.clone();
    let run = tokio::spawn(async move {
        let result = pipeline
            .confirm_import(move |progress| {
                progress_cell.store(progress.percentage, Ordering::Relaxed);
            })
            .await?;

        if !result.any_written() {
            task_state.record_error(result.summary()).await;
        }

        Ok::<_, ApiError>(ConfirmResponse {
            run_id: pipeline.run_id(),
            result,
            error_rows: pipeline.outcome().error_rows.clone(),
        })
    });

    let response = run
        .await
        .map_err(|e| ApiError::Internal(format!("Import task failed: {}", e)))??;
    Ok(Json(response))
}

/// POST /import/reset
pub async fn reset(State(state): State<AppState>) -> ApiResult<Json<ImportStatusResponse>> {
    let mut pipeline = lock_pipeline(&state)?;
    pipeline.reset();
    state.import_progress.store(0, Ordering::Relaxed);
    Ok(Json(ImportStatusResponse::from_pipeline(&pipeline)))
}

/// GET /import/status
pub async fn status(State(state): State<AppState>) -> Json<ImportStatusResponse> {
    match state.pipeline.try_lock() {
        Ok(pipeline) => Json(ImportStatusResponse::from_pipeline(&pipeline)),
        Err(_) => Json(ImportStatusResponse::running(
            state.import_progress.load(Ordering::Relaxed),
        )),
    }
}

/// Build import workflow routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/upload", post(upload))
        .route("/import/disposition", put(set_disposition))
        .route("/import/confirm", post(confirm))
        .route("/import/reset", post(reset))
        .route("/import/status", get(status))
}
