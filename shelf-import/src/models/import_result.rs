//! Validation and import outcomes

use serde::{Deserialize, Serialize};

use super::row::{RowError, ValidatedRow};

/// Result of validating every data row of a file
///
/// `valid_rows.len() + error_rows.len() == total_rows` always holds.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseOutcome {
    pub valid_rows: Vec<ValidatedRow>,
    pub error_rows: Vec<RowError>,
    pub total_rows: usize,
}

/// Per-row accounting of one import run
///
/// Each row lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub overwritten: usize,
    pub errors: usize,
}

impl ImportResult {
    /// Rows accounted for so far
    pub fn total(&self) -> usize {
        self.imported + self.skipped + self.overwritten + self.errors
    }

    /// True when at least one row was written
    pub fn any_written(&self) -> bool {
        self.imported + self.overwritten > 0
    }

    /// One-line German summary for the notification sink
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} Buecher importiert", self.imported)];
        if self.overwritten > 0 {
            parts.push(format!("{} ueberschrieben", self.overwritten));
        }
        if self.skipped > 0 {
            parts.push(format!("{} uebersprungen", self.skipped));
        }
        if self.errors > 0 {
            parts.push(format!("{} Fehler", self.errors));
        }
        parts.join(", ")
    }
}
