//! Book records as held by the record store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::row::BookRow;

/// Write payload for create/update operations
///
/// Empty optional fields are stored as `NULL`, an empty genre set as `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub genres: Option<Vec<String>>,
    pub rating: u8,
    pub image_url: Option<String>,
    pub amazon_link: Option<String>,
}

impl From<&BookRow> for NewBook {
    fn from(row: &BookRow) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

        Self {
            title: row.title.clone(),
            author: row.author.clone(),
            description: non_empty(&row.description),
            genres: (!row.genres.is_empty()).then(|| row.genres.clone()),
            rating: row.rating,
            image_url: row.image_url.as_ref().map(|u| u.to_string()),
            amazon_link: row.amazon_link.as_ref().map(|u| u.to_string()),
        }
    }
}

/// Stored book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub genres: Option<Vec<String>>,
    pub rating: u8,
    pub image_url: Option<String>,
    pub amazon_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Candidate-key hit returned by the duplicate lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingBook {
    pub id: Uuid,
    pub title: String,
    pub author: String,
}
