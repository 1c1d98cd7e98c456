//! SQLite-backed book store

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use shelf_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::store::BookStore;
use crate::models::{BookRecord, ExistingBook, NewBook};
use crate::utils::retry_on_lock;

/// [`BookStore`] over the `books` table
#[derive(Clone)]
pub struct SqliteBookStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl SqliteBookStore {
    pub fn new(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            pool,
            max_lock_wait_ms,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Serialized column values of one book, prepared before touching the pool
struct BookColumns {
    title_key: String,
    author_key: String,
    genres: Option<String>,
}

impl BookColumns {
    fn from_book(book: &NewBook) -> Result<Self> {
        let genres = book
            .genres
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::Internal(format!("Failed to serialize genres: {}", e)))?;

        Ok(Self {
            title_key: candidate_key(&book.title),
            author_key: candidate_key(&book.author),
            genres,
        })
    }
}

fn candidate_key(value: &str) -> String {
    value.to_lowercase()
}

fn keys_json(values: &[String]) -> Result<String> {
    let keys: Vec<String> = values.iter().map(|v| candidate_key(v)).collect();
    serde_json::to_string(&keys)
        .map_err(|e| Error::Internal(format!("Failed to serialize lookup keys: {}", e)))
}

fn now_timestamp() -> String {
    // Fixed precision keeps lexical order equal to chronological order
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn book_from_row(row: &SqliteRow) -> Result<BookRecord> {
    let guid: String = row.try_get("guid")?;
    let id = Uuid::parse_str(&guid)
        .map_err(|e| Error::Internal(format!("Invalid book guid '{}': {}", guid, e)))?;

    let genres: Option<String> = row.try_get("genres")?;
    let genres = genres
        .map(|json| serde_json::from_str::<Vec<String>>(&json))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to deserialize genres: {}", e)))?;

    let rating: i64 = row.try_get("rating")?;
    let rating = u8::try_from(rating)
        .map_err(|_| Error::Internal(format!("Rating out of range: {}", rating)))?;

    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
        .with_timezone(&Utc);

    Ok(BookRecord {
        id,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        description: row.try_get("description")?,
        genres,
        rating,
        image_url: row.try_get("image_url")?,
        amazon_link: row.try_get("amazon_link")?,
        created_at,
    })
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn insert_many(&self, books: &[NewBook]) -> Result<()> {
        if books.is_empty() {
            return Ok(());
        }

        let prepared = books
            .iter()
            .map(|book| BookColumns::from_book(book).map(|cols| (Uuid::new_v4().to_string(), cols)))
            .collect::<Result<Vec<_>>>()?;
        let created_at = now_timestamp();
        let pool = &self.pool;
        let prepared = &prepared;
        let created_at = created_at.as_str();

        retry_on_lock("insert_many", self.max_lock_wait_ms, || async move {
            let mut tx = pool.begin().await?;

            for ((guid, cols), book) in prepared.iter().zip(books) {
                sqlx::query(
                    r#"
                    INSERT INTO books (
                        guid, title, author, title_key, author_key,
                        description, genres, rating, image_url, amazon_link, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(guid)
                .bind(&book.title)
                .bind(&book.author)
                .bind(&cols.title_key)
                .bind(&cols.author_key)
                .bind(&book.description)
                .bind(&cols.genres)
                .bind(i64::from(book.rating))
                .bind(&book.image_url)
                .bind(&book.amazon_link)
                .bind(created_at)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok::<(), Error>(())
        })
        .await?;

        tracing::debug!(count = books.len(), "Inserted book batch");
        Ok(())
    }

    async fn update_one(&self, id: Uuid, book: &NewBook) -> Result<()> {
        let cols = BookColumns::from_book(book)?;
        let guid = id.to_string();
        let pool = &self.pool;
        let cols = &cols;
        let guid = guid.as_str();

        let rows_affected = retry_on_lock("update_one", self.max_lock_wait_ms, || async move {
            let result = sqlx::query(
                r#"
                UPDATE books SET
                    title = ?, author = ?, title_key = ?, author_key = ?,
                    description = ?, genres = ?, rating = ?, image_url = ?, amazon_link = ?
                WHERE guid = ?
                "#,
            )
            .bind(&book.title)
            .bind(&book.author)
            .bind(&cols.title_key)
            .bind(&cols.author_key)
            .bind(&book.description)
            .bind(&cols.genres)
            .bind(i64::from(book.rating))
            .bind(&book.image_url)
            .bind(&book.amazon_link)
            .bind(guid)
            .execute(pool)
            .await?;
            Ok::<u64, Error>(result.rows_affected())
        })
        .await?;

        if rows_affected == 0 {
            return Err(Error::NotFound(format!("book {}", id)));
        }
        Ok(())
    }

    async fn find_by_candidate_keys(
        &self,
        titles: &[String],
        authors: &[String],
    ) -> Result<Vec<ExistingBook>> {
        if titles.is_empty() || authors.is_empty() {
            return Ok(Vec::new());
        }

        // One JSON array per key column keeps this a single statement
        // regardless of how many candidates the file has
        let rows = sqlx::query(
            r#"
            SELECT guid, title, author FROM books
            WHERE title_key IN (SELECT value FROM json_each(?))
              AND author_key IN (SELECT value FROM json_each(?))
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(keys_json(titles)?)
        .bind(keys_json(authors)?)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ExistingBook> {
                let guid: String = row.try_get("guid")?;
                let id = Uuid::parse_str(&guid)
                    .map_err(|e| Error::Internal(format!("Invalid book guid '{}': {}", guid, e)))?;
                Ok(ExistingBook {
                    id,
                    title: row.try_get("title")?,
                    author: row.try_get("author")?,
                })
            })
            .collect()
    }

    async fn list_books(&self) -> Result<Vec<BookRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT guid, title, author, description, genres, rating,
                   image_url, amazon_link, created_at
            FROM books
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(book_from_row).collect()
    }
}
