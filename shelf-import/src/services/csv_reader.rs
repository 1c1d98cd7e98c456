//! CSV file intake
//!
//! Applies the structural guards (extension, size, encoding, emptiness,
//! header shape) and turns an uploaded file into [`RawRow`]s. Any structural
//! defect rejects the whole file before a single row is validated.

use csv::{ReaderBuilder, Trim};
use thiserror::Error;

use super::schema_validator::{validate_columns, ColumnCheck, EXPECTED_COLUMNS};
use crate::models::RawRow;

/// File handed over by the upload UI
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// File-level defect; `Display` is the message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("Bitte waehle eine .csv-Datei aus.")]
    WrongExtension { file_name: String },

    #[error("Die Datei ist zu gross. Maximal {} erlaubt.", format_size(.max_bytes))]
    TooLarge { size: u64, max_bytes: u64 },

    #[error("Die Datei konnte nicht gelesen werden. Ist sie im CSV-Format?")]
    Unreadable { reason: String },

    #[error("Die Datei enthaelt keine Daten.")]
    Empty,

    #[error(
        "Fehlende Spalten: {}. Erwartete Spalten: {}",
        .missing.join(", "),
        EXPECTED_COLUMNS.join(", ")
    )]
    MissingColumns { missing: Vec<&'static str> },
}

/// Parsed file contents
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Format a byte limit the way the upload form states it ("5MB")
fn format_size(bytes: &u64) -> String {
    const MB: u64 = 1024 * 1024;
    let bytes = *bytes;
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= MB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else if bytes >= 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

fn has_csv_extension(name: &str) -> bool {
    name.trim().to_lowercase().ends_with(".csv")
}

/// Run the structural guards and parse the file
pub fn read_upload(file: &UploadedFile, max_bytes: u64) -> Result<ParsedFile, StructuralError> {
    if !has_csv_extension(&file.name) {
        return Err(StructuralError::WrongExtension {
            file_name: file.name.clone(),
        });
    }

    if file.size() > max_bytes {
        return Err(StructuralError::TooLarge {
            size: file.size(),
            max_bytes,
        });
    }

    let content = std::str::from_utf8(&file.bytes).map_err(|e| StructuralError::Unreadable {
        reason: format!("not valid UTF-8: {}", e),
    })?;

    let parsed = parse_content(content)?;

    if parsed.rows.is_empty() {
        return Err(StructuralError::Empty);
    }

    if let ColumnCheck::Missing(missing) = validate_columns(&parsed.headers) {
        return Err(StructuralError::MissingColumns { missing });
    }

    Ok(parsed)
}

/// Parse CSV text with a header row
///
/// Only truly empty lines are skipped (the csv reader drops them). A line of
/// bare delimiters is a record with empty cells and goes on to validation.
pub fn parse_content(content: &str) -> Result<ParsedFile, StructuralError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .delimiter(b',')
        .trim(Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| StructuralError::Unreadable {
            reason: format!("failed to read header: {}", e),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| StructuralError::Unreadable {
            reason: format!("failed to parse record {}: {}", index + 1, e),
        })?;

        let pairs = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| (header.as_str(), record.get(idx).unwrap_or("")));
        rows.push(RawRow::from_pairs(pairs));
    }

    Ok(ParsedFile { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "titel,autor,beschreibung,genre,bewertung,bild_url,amazon_link";

    fn csv_file(body: &str) -> UploadedFile {
        UploadedFile::new("books.csv", format!("{}\n{}", HEADER, body))
    }

    #[test]
    fn test_parses_rows_with_normalized_keys() {
        let file = UploadedFile::new(
            "Books.CSV",
            "Titel, AUTOR ,beschreibung,genre,bewertung,bild_url,amazon_link\n\
             Dune,Frank Herbert,,\"Sci-Fi, Klassiker\",5,,\n",
        );
        let parsed = read_upload(&file, 1024).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].get("titel"), "Dune");
        assert_eq!(parsed.rows[0].get("autor"), "Frank Herbert");
        assert_eq!(parsed.rows[0].get("genre"), "Sci-Fi, Klassiker");
    }

    #[test]
    fn test_blank_lines_ignored() {
        let parsed = read_upload(&csv_file("\nA,B,,,3,,\n\nC,D,,,4,,\n"), 1024).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].get("titel"), "C");
    }

    #[test]
    fn test_delimiter_only_line_is_kept_as_row() {
        let parsed = read_upload(&csv_file("A,B,,,3,,\n,,,,,,\nC,D,,,4,,\n"), 1024).unwrap();
        assert_eq!(parsed.rows.len(), 3);
        assert_eq!(parsed.rows[1].get("titel"), "");
        assert_eq!(parsed.rows[1].get("bewertung"), "");
        assert_eq!(parsed.rows[2].get("titel"), "C");
    }

    #[test]
    fn test_wrong_extension() {
        let file = UploadedFile::new("books.xlsx", HEADER);
        let err = read_upload(&file, 1024).unwrap_err();
        assert!(matches!(err, StructuralError::WrongExtension { .. }));
        assert_eq!(err.to_string(), "Bitte waehle eine .csv-Datei aus.");
    }

    #[test]
    fn test_too_large() {
        let file = csv_file("A,B,,,3,,");
        let err = read_upload(&file, 10).unwrap_err();
        assert!(matches!(err, StructuralError::TooLarge { max_bytes: 10, .. }));

        let err = StructuralError::TooLarge { size: 6 * 1024 * 1024, max_bytes: 5 * 1024 * 1024 };
        assert_eq!(err.to_string(), "Die Datei ist zu gross. Maximal 5MB erlaubt.");
    }

    #[test]
    fn test_invalid_utf8_unreadable() {
        let mut bytes = HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"\n\xff\xfe,A,,,3,,\n");
        let err = read_upload(&UploadedFile::new("x.csv", bytes), 1024).unwrap_err();
        assert!(matches!(err, StructuralError::Unreadable { .. }));
    }

    #[test]
    fn test_header_only_is_empty() {
        let file = UploadedFile::new("books.csv", format!("{}\n\n", HEADER));
        assert_eq!(read_upload(&file, 1024).unwrap_err(), StructuralError::Empty);

        let file = UploadedFile::new("books.csv", "");
        assert_eq!(read_upload(&file, 1024).unwrap_err(), StructuralError::Empty);
    }

    #[test]
    fn test_missing_columns_message() {
        let file = UploadedFile::new("books.csv", "titel,autor\nDune,Herbert\n");
        let err = read_upload(&file, 1024).unwrap_err();
        assert_eq!(
            err,
            StructuralError::MissingColumns {
                missing: vec!["beschreibung", "genre", "bewertung", "bild_url", "amazon_link"]
            }
        );
        assert_eq!(
            err.to_string(),
            "Fehlende Spalten: beschreibung, genre, bewertung, bild_url, amazon_link. \
             Erwartete Spalten: titel, autor, beschreibung, genre, bewertung, bild_url, amazon_link"
        );
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let file = UploadedFile::new("books.csv", format!("\u{feff}{}\nA,B,,,3,,\n", HEADER));
        let parsed = read_upload(&file, 1024).unwrap();
        assert_eq!(parsed.rows[0].get("titel"), "A");
    }

    #[test]
    fn test_short_record_reads_missing_cells_as_empty() {
        let parsed = read_upload(&csv_file("A,B,,,3\n"), 1024).unwrap();
        assert_eq!(parsed.rows[0].get("amazon_link"), "");
    }
}
