//! Import pipeline services
//!
//! csv_reader → schema_validator → duplicate_resolver → batch_importer,
//! driven by the import_orchestrator.

pub mod batch_importer;
pub mod csv_reader;
pub mod duplicate_resolver;
pub mod import_orchestrator;
pub mod schema_validator;

pub use batch_importer::{total_batches, BatchImporter, BatchProgress};
pub use csv_reader::{read_upload, ParsedFile, StructuralError, UploadedFile};
pub use duplicate_resolver::find_duplicates;
pub use import_orchestrator::{DuplicatePreview, ImportOrchestrator, PreviewSummary};
pub use schema_validator::{validate_columns, validate_row, validate_rows, ColumnCheck, EXPECTED_COLUMNS};
