//! Import pipeline state machine
//!
//! Drives one run through upload → preview → result:
//! - `upload` reads and validates a file and looks up duplicates
//! - `set_disposition` picks skip/overwrite while previewing
//! - `confirm_import` writes the batches and records the result
//! - `reset` discards everything and returns to upload
//!
//! Stage changes, progress and outcomes are published on the [`EventBus`].

use serde::Serialize;
use shelf_common::config::ImportSettings;
use shelf_common::events::{EventBus, NotificationLevel, ShelfEvent};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::batch_importer::{BatchImporter, BatchProgress};
use super::csv_reader::{read_upload, StructuralError, UploadedFile};
use super::duplicate_resolver::find_duplicates;
use super::schema_validator::validate_rows;
use crate::db::BookStore;
use crate::error::PipelineError;
use crate::models::{
    DuplicateMatch, ImportDisposition, ImportResult, ParseOutcome, PipelineStage, RowError,
    StateTransition,
};

/// Duplicate as listed in the preview
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicatePreview {
    pub row_index: usize,
    pub title: String,
    pub author: String,
    pub existing_id: Uuid,
}

impl From<&DuplicateMatch> for DuplicatePreview {
    fn from(dupe: &DuplicateMatch) -> Self {
        Self {
            row_index: dupe.row.row_index(),
            title: dupe.row.data().title.clone(),
            author: dupe.row.data().author.clone(),
            existing_id: dupe.existing_id,
        }
    }
}

/// What the user sees before confirming
#[derive(Debug, Clone, Serialize)]
pub struct PreviewSummary {
    pub run_id: Uuid,
    pub file_name: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub error_rows: Vec<RowError>,
    pub duplicates: Vec<DuplicatePreview>,
    pub disposition: ImportDisposition,
}

impl PreviewSummary {
    /// Confirm is only offered when something can be written
    pub fn can_confirm(&self) -> bool {
        self.valid_rows > 0
    }
}

/// Owns the state of the current import run
pub struct ImportOrchestrator {
    store: Arc<dyn BookStore>,
    event_bus: EventBus,
    settings: ImportSettings,
    run_id: Uuid,
    stage: PipelineStage,
    file_name: Option<String>,
    outcome: ParseOutcome,
    duplicates: Vec<DuplicateMatch>,
    disposition: ImportDisposition,
    result: Option<ImportResult>,
    rejection: Option<StructuralError>,
    progress: u8,
}

impl ImportOrchestrator {
    pub fn new(store: Arc<dyn BookStore>, event_bus: EventBus, settings: ImportSettings) -> Self {
        Self {
            store,
            event_bus,
            settings,
            run_id: Uuid::new_v4(),
            stage: PipelineStage::Upload,
            file_name: None,
            outcome: ParseOutcome::default(),
            duplicates: Vec::new(),
            disposition: ImportDisposition::default(),
            result: None,
            rejection: None,
            progress: 0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn disposition(&self) -> ImportDisposition {
        self.disposition
    }

    pub fn outcome(&self) -> &ParseOutcome {
        &self.outcome
    }

    pub fn duplicates(&self) -> &[DuplicateMatch] {
        &self.duplicates
    }

    pub fn result(&self) -> Option<ImportResult> {
        self.result
    }

    /// Reason the last upload was refused, cleared by the next upload or reset
    pub fn rejection(&self) -> Option<&StructuralError> {
        self.rejection.as_ref()
    }

    /// Percentage reported by the last batch of the current run
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Preview of the accepted file; `None` while waiting for an upload
    pub fn preview(&self) -> Option<PreviewSummary> {
        let file_name = self.file_name.clone()?;
        Some(PreviewSummary {
            run_id: self.run_id,
            file_name,
            total_rows: self.outcome.total_rows,
            valid_rows: self.outcome.valid_rows.len(),
            error_rows: self.outcome.error_rows.clone(),
            duplicates: self.duplicates.iter().map(DuplicatePreview::from).collect(),
            disposition: self.disposition,
        })
    }

    /// Accept a file, validate its rows and look up duplicates
    ///
    /// A structural defect keeps the pipeline in `upload`, remembers the
    /// reason and posts an error notification.
    pub async fn upload(&mut self, file: UploadedFile) -> Result<PreviewSummary, PipelineError> {
        self.require_stage("upload", PipelineStage::Upload)?;
        self.rejection = None;

        let parsed = match read_upload(&file, self.settings.max_file_size_bytes) {
            Ok(parsed) => parsed,
            Err(rejection) => {
                warn!(
                    run_id = %self.run_id,
                    file = %file.name,
                    reason = ?rejection,
                    "Upload rejected"
                );
                self.notify(NotificationLevel::Error, rejection.to_string());
                self.rejection = Some(rejection.clone());
                return Err(PipelineError::Rejected(rejection));
            }
        };

        let outcome = validate_rows(&parsed.rows);
        let duplicates = find_duplicates(self.store.as_ref(), &outcome.valid_rows).await;

        info!(
            run_id = %self.run_id,
            file = %file.name,
            total_rows = outcome.total_rows,
            valid_rows = outcome.valid_rows.len(),
            error_rows = outcome.error_rows.len(),
            duplicates = duplicates.len(),
            "File accepted"
        );

        self.file_name = Some(file.name);
        self.outcome = outcome;
        self.duplicates = duplicates;
        self.transition_to(PipelineStage::Preview);

        self.preview()
            .ok_or(PipelineError::InvalidState { operation: "upload", stage: self.stage })
    }

    /// Choose what happens to duplicates; only while previewing
    pub fn set_disposition(&mut self, disposition: ImportDisposition) -> Result<(), PipelineError> {
        self.require_stage("set_disposition", PipelineStage::Preview)?;
        self.disposition = disposition;
        Ok(())
    }

    /// Write the previewed rows and move to `result`
    ///
    /// `on_progress` sees every batch boundary in addition to the event bus.
    pub async fn confirm_import<F>(&mut self, mut on_progress: F) -> Result<ImportResult, PipelineError>
    where
        F: FnMut(BatchProgress) + Send,
    {
        self.require_stage("confirm_import", PipelineStage::Preview)?;
        if self.outcome.valid_rows.is_empty() {
            return Err(PipelineError::NothingToImport);
        }

        let run_id = self.run_id;
        let event_bus = self.event_bus.clone();
        let mut last_percentage = 0u8;

        let importer = BatchImporter::new(self.store.as_ref(), self.settings.batch_size);
        let result = importer
            .run(&self.outcome.valid_rows, &self.duplicates, self.disposition, |progress| {
                last_percentage = progress.percentage;
                event_bus.emit_lossy(ShelfEvent::ImportProgressUpdate {
                    run_id,
                    completed_batches: progress.completed_batches,
                    total_batches: progress.total_batches,
                    percentage: progress.percentage,
                    timestamp: chrono::Utc::now(),
                });
                on_progress(progress);
            })
            .await;

        self.progress = last_percentage;
        self.result = Some(result);

        self.event_bus.emit_lossy(ShelfEvent::ImportCompleted {
            run_id,
            imported: result.imported,
            skipped: result.skipped,
            overwritten: result.overwritten,
            errors: result.errors,
            timestamp: chrono::Utc::now(),
        });

        let level = if result.any_written() {
            NotificationLevel::Success
        } else {
            NotificationLevel::Error
        };
        self.notify(level, result.summary());
        self.transition_to(PipelineStage::Result);

        Ok(result)
    }

    /// Discard the run and start over; allowed from any stage
    pub fn reset(&mut self) {
        self.file_name = None;
        self.outcome = ParseOutcome::default();
        self.duplicates.clear();
        self.disposition = ImportDisposition::default();
        self.result = None;
        self.rejection = None;
        self.progress = 0;

        if self.stage != PipelineStage::Upload {
            self.transition_to(PipelineStage::Upload);
        }
        self.run_id = Uuid::new_v4();
        info!(run_id = %self.run_id, "Import pipeline reset");
    }

    fn require_stage(
        &self,
        operation: &'static str,
        expected: PipelineStage,
    ) -> Result<(), PipelineError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(PipelineError::InvalidState {
                operation,
                stage: self.stage,
            })
        }
    }

    fn transition_to(&mut self, new_stage: PipelineStage) -> StateTransition {
        let transition = StateTransition {
            run_id: self.run_id,
            old_stage: self.stage,
            new_stage,
            transitioned_at: chrono::Utc::now(),
        };
        self.stage = new_stage;

        info!(
            run_id = %transition.run_id,
            from = %transition.old_stage,
            to = %transition.new_stage,
            "Import stage changed"
        );
        self.event_bus.emit_lossy(ShelfEvent::ImportStageChanged {
            run_id: transition.run_id,
            old_stage: transition.old_stage.to_string(),
            new_stage: transition.new_stage.to_string(),
            timestamp: transition.transitioned_at,
        });

        transition
    }

    fn notify(&self, level: NotificationLevel, message: String) {
        self.event_bus.emit_lossy(ShelfEvent::notification(level, message));
    }
}
