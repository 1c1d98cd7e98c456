//! Duplicate detection against the record store
//!
//! A row is a duplicate when a stored book has the same title AND author,
//! compared case-insensitively after trimming. The store is asked once per
//! file with the distinct candidate titles and authors; the pairing happens
//! here.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::BookStore;
use crate::models::{DuplicateMatch, ValidatedRow};

/// Case-insensitive candidate key of a (title, author) pair
fn candidate_key(title: &str, author: &str) -> (String, String) {
    (title.trim().to_lowercase(), author.trim().to_lowercase())
}

/// Find rows whose candidate key already exists in the store
///
/// A failing lookup is logged and treated as "no duplicates" so the import
/// can still proceed. When several stored books share a key, the first one
/// the store returns wins.
pub async fn find_duplicates(store: &dyn BookStore, rows: &[ValidatedRow]) -> Vec<DuplicateMatch> {
    if rows.is_empty() {
        return Vec::new();
    }

    let titles: Vec<String> = rows
        .iter()
        .map(|r| r.data().title.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let authors: Vec<String> = rows
        .iter()
        .map(|r| r.data().author.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let existing = match store.find_by_candidate_keys(&titles, &authors).await {
        Ok(existing) => existing,
        Err(e) => {
            warn!(error = %e, "Duplicate lookup failed, treating all rows as new");
            return Vec::new();
        }
    };

    let mut by_key: HashMap<(String, String), Uuid> = HashMap::with_capacity(existing.len());
    for book in &existing {
        by_key
            .entry(candidate_key(&book.title, &book.author))
            .or_insert(book.id);
    }

    let matches: Vec<DuplicateMatch> = rows
        .iter()
        .filter_map(|row| {
            let data = row.data();
            by_key
                .get(&candidate_key(&data.title, &data.author))
                .map(|id| DuplicateMatch {
                    row: row.clone(),
                    existing_id: *id,
                })
        })
        .collect();

    debug!(
        candidates = existing.len(),
        duplicates = matches.len(),
        "Duplicate lookup finished"
    );

    matches
}
