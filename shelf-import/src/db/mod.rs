//! Database access for shelf-import
//!
//! The `books` collection lives in `shelf.db` under the root folder.

pub mod books;
pub mod store;

pub use books::SqliteBookStore;
pub use store::BookStore;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool and create tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the `books` table and its candidate-key index if missing
///
/// `title_key`/`author_key` hold the Unicode-lowercased title and author so
/// the duplicate lookup does not depend on SQLite's ASCII-only `lower()`.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            title_key TEXT NOT NULL,
            author_key TEXT NOT NULL,
            description TEXT,
            genres TEXT,
            rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
            image_url TEXT,
            amazon_link TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_books_candidate_key ON books (title_key, author_key)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (books)");

    Ok(())
}
