//! Row-level types flowing through the pipeline
//!
//! A parsed [`RawRow`] becomes exactly one of [`ValidatedRow`] or [`RowError`].
//! `ValidatedRow` can only be built by the schema validator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// One CSV record keyed by normalized (trimmed, lower-cased) column name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    /// Build from header/value pairs, normalizing column names
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
                .collect(),
        )
    }

    /// Cell value for a column; absent columns read as empty
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

/// Fully-typed book data of a row that passed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookRow {
    pub title: String,
    pub author: String,
    pub description: String,
    /// Trimmed, non-empty, de-duplicated tags in file order
    pub genres: Vec<String>,
    pub rating: u8,
    pub image_url: Option<Url>,
    pub amazon_link: Option<Url>,
}

/// A row that passed validation, with its 1-based position in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedRow {
    row_index: usize,
    data: BookRow,
}

impl ValidatedRow {
    pub(crate) fn new(row_index: usize, data: BookRow) -> Self {
        Self { row_index, data }
    }

    pub fn row_index(&self) -> usize {
        self.row_index
    }

    pub fn data(&self) -> &BookRow {
        &self.data
    }
}

/// A rejected row with every violation found, as `"field: message"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row_index: usize,
    pub raw: RawRow,
    pub errors: Vec<String>,
}

/// Validated row whose candidate key already exists in the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateMatch {
    pub row: ValidatedRow,
    pub existing_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_row_normalizes_keys() {
        let row = RawRow::from_pairs([(" Titel ", "Dune"), ("AUTOR", "Herbert")]);
        assert_eq!(row.get("titel"), "Dune");
        assert_eq!(row.get("autor"), "Herbert");
        assert_eq!(row.get("genre"), "");
    }
}
