//! Schema Validator
//!
//! Pure functions checking the header shape of a book CSV and coercing each
//! row into a typed [`BookRow`]. A row either validates completely or is
//! rejected with every violation it contains, in schema order.

use url::Url;

use crate::models::{BookRow, ParseOutcome, RawRow, RowError, ValidatedRow};

/// Recognized columns, in canonical order
pub const EXPECTED_COLUMNS: [&str; 7] = [
    "titel",
    "autor",
    "beschreibung",
    "genre",
    "bewertung",
    "bild_url",
    "amazon_link",
];

/// Coercion applied to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text, kept as-is after trimming
    Text,
    /// Comma-separated tags
    TagList,
    /// Integer within an inclusive range
    BoundedInt { min: i64, max: i64 },
    /// Absolute URL; empty means "not set"
    Url,
}

/// Rule for one column
#[derive(Debug, Clone, Copy)]
pub struct FieldSchema {
    pub column: &'static str,
    /// Human-readable name used in messages
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

pub const BOOK_SCHEMA: [FieldSchema; 7] = [
    FieldSchema { column: "titel", label: "Titel", required: true, kind: FieldKind::Text },
    FieldSchema { column: "autor", label: "Autor", required: true, kind: FieldKind::Text },
    FieldSchema { column: "beschreibung", label: "Beschreibung", required: false, kind: FieldKind::Text },
    FieldSchema { column: "genre", label: "Genre", required: false, kind: FieldKind::TagList },
    FieldSchema {
        column: "bewertung",
        label: "Bewertung",
        required: true,
        kind: FieldKind::BoundedInt { min: 1, max: 5 },
    },
    FieldSchema { column: "bild_url", label: "Bild-URL", required: false, kind: FieldKind::Url },
    FieldSchema { column: "amazon_link", label: "Amazon-Link", required: false, kind: FieldKind::Url },
];

/// Header check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnCheck {
    Valid,
    /// Every absent column, in canonical order
    Missing(Vec<&'static str>),
}

impl ColumnCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, ColumnCheck::Valid)
    }
}

/// Compare header names (trimmed, case-insensitive) against the schema
pub fn validate_columns<S: AsRef<str>>(headers: &[S]) -> ColumnCheck {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();

    let missing: Vec<&'static str> = EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !normalized.iter().any(|h| h == col))
        .collect();

    if missing.is_empty() {
        ColumnCheck::Valid
    } else {
        ColumnCheck::Missing(missing)
    }
}

/// Coerced value of a single cell
enum Cell {
    Text(String),
    Tags(Vec<String>),
    Int(i64),
    Url(Option<Url>),
}

fn coerce(schema: &FieldSchema, raw: &str) -> Result<Cell, String> {
    let value = raw.trim();

    if schema.required && value.is_empty() {
        match schema.kind {
            // Empty numeric cells coerce to 0 and report the range instead
            FieldKind::BoundedInt { .. } => {}
            FieldKind::Text | FieldKind::TagList | FieldKind::Url => {
                return Err(format!("{} ist ein Pflichtfeld", schema.label));
            }
        }
    }

    match schema.kind {
        FieldKind::Text => Ok(Cell::Text(value.to_string())),
        FieldKind::TagList => Ok(Cell::Tags(split_tags(value))),
        FieldKind::BoundedInt { min, max } => {
            let range_msg = || format!("{} muss zwischen {} und {} sein", schema.label, min, max);
            // An empty cell coerces to 0 and therefore fails the range check
            let number = if value.is_empty() {
                0
            } else {
                parse_integer(value).map_err(|kind| match kind {
                    NumberError::NotANumber => format!("{} muss eine Zahl sein", schema.label),
                    NumberError::NotAnInteger => {
                        format!("{} muss eine ganze Zahl sein", schema.label)
                    }
                })?
            };
            if number < min || number > max {
                return Err(range_msg());
            }
            Ok(Cell::Int(number))
        }
        FieldKind::Url => {
            if value.is_empty() {
                return Ok(Cell::Url(None));
            }
            Url::parse(value)
                .map(|u| Cell::Url(Some(u)))
                .map_err(|_| "Ungültige URL".to_string())
        }
    }
}

enum NumberError {
    NotANumber,
    NotAnInteger,
}

/// Integer coercion: "3" and "3.0" are 3, "3.5" is not an integer
fn parse_integer(value: &str) -> Result<i64, NumberError> {
    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        Ok(f) if f.is_finite() => Err(NumberError::NotAnInteger),
        _ => Err(NumberError::NotANumber),
    }
}

/// Split a comma list into trimmed, non-empty, de-duplicated tags
pub fn split_tags(value: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in value.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Validate one row
///
/// `row_index` is the 1-based position of the row in the file.
pub fn validate_row(row_index: usize, raw: &RawRow) -> Result<ValidatedRow, RowError> {
    let mut errors = Vec::new();
    let mut title = String::new();
    let mut author = String::new();
    let mut description = String::new();
    let mut genres = Vec::new();
    let mut rating = 0u8;
    let mut image_url = None;
    let mut amazon_link = None;

    for schema in BOOK_SCHEMA.iter() {
        match coerce(schema, raw.get(schema.column)) {
            Ok(cell) => match (schema.column, cell) {
                ("titel", Cell::Text(v)) => title = v,
                ("autor", Cell::Text(v)) => author = v,
                ("beschreibung", Cell::Text(v)) => description = v,
                ("genre", Cell::Tags(v)) => genres = v,
                // Range already checked against 1..=5
                ("bewertung", Cell::Int(v)) => rating = v as u8,
                ("bild_url", Cell::Url(v)) => image_url = v,
                ("amazon_link", Cell::Url(v)) => amazon_link = v,
                _ => {}
            },
            Err(message) => errors.push(format!("{}: {}", schema.column, message)),
        }
    }

    if errors.is_empty() {
        Ok(ValidatedRow::new(
            row_index,
            BookRow {
                title,
                author,
                description,
                genres,
                rating,
                image_url,
                amazon_link,
            },
        ))
    } else {
        Err(RowError {
            row_index,
            raw: raw.clone(),
            errors,
        })
    }
}

/// Validate every data row, numbering them from 1
pub fn validate_rows(rows: &[RawRow]) -> ParseOutcome {
    let mut outcome = ParseOutcome {
        total_rows: rows.len(),
        ..Default::default()
    };

    for (index, raw) in rows.iter().enumerate() {
        match validate_row(index + 1, raw) {
            Ok(valid) => outcome.valid_rows.push(valid),
            Err(error) => outcome.error_rows.push(error),
        }
    }

    tracing::debug!(
        total = outcome.total_rows,
        valid = outcome.valid_rows.len(),
        invalid = outcome.error_rows.len(),
        "Rows validated"
    );

    outcome
}
