//! Batched writes of a confirmed import
//!
//! New rows are inserted in batches of `batch_size`; a failed batch counts
//! every row in it as an error and the run moves on. Duplicates are either
//! skipped or updated one by one, grouped into batches only for progress
//! reporting. Writes run strictly one after another.

use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::BookStore;
use crate::models::{DuplicateMatch, ImportDisposition, ImportResult, NewBook, ValidatedRow};

/// Progress after a batch boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed_batches: usize,
    pub total_batches: usize,
    /// round(completed / max(total, 1) * 100)
    pub percentage: u8,
}

impl BatchProgress {
    fn new(completed_batches: usize, total_batches: usize) -> Self {
        Self {
            completed_batches,
            total_batches,
            percentage: percentage(completed_batches, total_batches),
        }
    }

    /// Progress of a run that had nothing to write
    fn finished() -> Self {
        Self {
            completed_batches: 0,
            total_batches: 0,
            percentage: 100,
        }
    }
}

fn percentage(completed: usize, total: usize) -> u8 {
    let ratio = completed as f64 / total.max(1) as f64;
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Number of write batches a run will report
///
/// Duplicates only count when they are going to be written.
pub fn total_batches(
    new_rows: usize,
    duplicate_rows: usize,
    disposition: ImportDisposition,
    batch_size: usize,
) -> usize {
    let batch_size = batch_size.max(1);
    let dupe_batches = match disposition {
        ImportDisposition::Overwrite => duplicate_rows.div_ceil(batch_size),
        ImportDisposition::Skip => 0,
    };
    new_rows.div_ceil(batch_size) + dupe_batches
}

/// Executes a confirmed import against a [`BookStore`]
pub struct BatchImporter<'a> {
    store: &'a dyn BookStore,
    batch_size: usize,
}

impl<'a> BatchImporter<'a> {
    /// A `batch_size` of 0 is treated as 1
    pub fn new(store: &'a dyn BookStore, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Write `valid_rows`, resolving `duplicates` per `disposition`
    ///
    /// `on_progress` is called after every batch; its percentage never
    /// decreases and the last call reports exactly 100. Store failures are
    /// counted in the result, never returned.
    pub async fn run<F>(
        &self,
        valid_rows: &[ValidatedRow],
        duplicates: &[DuplicateMatch],
        disposition: ImportDisposition,
        mut on_progress: F,
    ) -> ImportResult
    where
        F: FnMut(BatchProgress) + Send,
    {
        let duplicate_ids: HashMap<usize, Uuid> = duplicates
            .iter()
            .map(|d| (d.row.row_index(), d.existing_id))
            .collect();

        let new_rows: Vec<&ValidatedRow> = valid_rows
            .iter()
            .filter(|row| !duplicate_ids.contains_key(&row.row_index()))
            .collect();
        let dupe_rows: Vec<(&ValidatedRow, Uuid)> = valid_rows
            .iter()
            .filter_map(|row| duplicate_ids.get(&row.row_index()).map(|id| (row, *id)))
            .collect();

        let total = total_batches(new_rows.len(), dupe_rows.len(), disposition, self.batch_size);
        let mut completed = 0usize;
        let mut result = ImportResult::default();

        info!(
            new_rows = new_rows.len(),
            duplicates = dupe_rows.len(),
            disposition = ?disposition,
            batch_size = self.batch_size,
            total_batches = total,
            "Starting batched import"
        );

        for (batch_index, batch) in new_rows.chunks(self.batch_size).enumerate() {
            let books: Vec<NewBook> = batch.iter().map(|row| NewBook::from(row.data())).collect();

            match self.store.insert_many(&books).await {
                Ok(()) => {
                    result.imported += books.len();
                    debug!(batch = batch_index + 1, rows = books.len(), "Insert batch written");
                }
                Err(e) => {
                    result.errors += books.len();
                    warn!(
                        batch = batch_index + 1,
                        rows = books.len(),
                        error = %e,
                        "Insert batch failed"
                    );
                }
            }

            completed += 1;
            on_progress(BatchProgress::new(completed, total));
        }

        match disposition {
            ImportDisposition::Overwrite => {
                for batch in dupe_rows.chunks(self.batch_size) {
                    for (row, existing_id) in batch {
                        let book = NewBook::from(row.data());
                        match self.store.update_one(*existing_id, &book).await {
                            Ok(()) => result.overwritten += 1,
                            Err(e) => {
                                result.errors += 1;
                                warn!(
                                    row = row.row_index(),
                                    existing_id = %existing_id,
                                    error = %e,
                                    "Overwrite failed"
                                );
                            }
                        }
                    }

                    completed += 1;
                    on_progress(BatchProgress::new(completed, total));
                }
            }
            ImportDisposition::Skip => {
                result.skipped += dupe_rows.len();
            }
        }

        if total == 0 {
            on_progress(BatchProgress::finished());
        }

        info!(
            imported = result.imported,
            skipped = result.skipped,
            overwritten = result.overwritten,
            errors = result.errors,
            "Batched import finished"
        );

        result
    }
}
