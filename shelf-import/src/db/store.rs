//! Record store interface
//!
//! The pipeline only talks to the store through [`BookStore`], so the
//! SQLite backend can be swapped for an in-memory fake in tests.

use async_trait::async_trait;
use shelf_common::Result;
use uuid::Uuid;

use crate::models::{BookRecord, ExistingBook, NewBook};

#[async_trait]
pub trait BookStore: Send + Sync {
    /// Insert all books in one all-or-nothing write
    async fn insert_many(&self, books: &[NewBook]) -> Result<()>;

    /// Replace the fields of an existing book
    ///
    /// Returns `Error::NotFound` when no record has this id.
    async fn update_one(&self, id: Uuid, book: &NewBook) -> Result<()>;

    /// Records whose title is in `titles` AND whose author is in `authors`,
    /// compared case-insensitively
    ///
    /// This is a superset query: callers still pair titles with authors.
    async fn find_by_candidate_keys(
        &self,
        titles: &[String],
        authors: &[String],
    ) -> Result<Vec<ExistingBook>>;

    /// All books, newest first
    async fn list_books(&self) -> Result<Vec<BookRecord>>;
}
