//! Data models for shelf-import
//!
//! - Row types produced by the schema validator
//! - Book records exchanged with the record store
//! - Pipeline stage machine and import accounting

pub mod book;
pub mod import_result;
pub mod import_session;
pub mod row;

pub use book::{BookRecord, ExistingBook, NewBook};
pub use import_result::{ImportResult, ParseOutcome};
pub use import_session::{ImportDisposition, PipelineStage, StateTransition};
pub use row::{BookRow, DuplicateMatch, RawRow, RowError, ValidatedRow};
