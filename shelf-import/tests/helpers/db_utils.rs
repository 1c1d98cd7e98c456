//! Database test utilities

use anyhow::Result;
use shelf_common::config::ImportSettings;
use shelf_import::db::{init_database_pool, SqliteBookStore};
use tempfile::TempDir;

/// Import settings with a custom batch size
pub fn test_settings(batch_size: usize) -> ImportSettings {
    ImportSettings {
        batch_size,
        ..ImportSettings::default()
    }
}

/// Create a SQLite book store in a temporary directory
///
/// Returns (TempDir, store); the TempDir must be kept alive for the test.
pub async fn create_test_store() -> Result<(TempDir, SqliteBookStore)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_shelf.db");
    let pool = init_database_pool(&db_path).await?;
    Ok((temp_dir, SqliteBookStore::new(pool, 1000)))
}
