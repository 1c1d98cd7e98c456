//! In-memory book store with failure injection

use async_trait::async_trait;
use chrono::Utc;
use shelf_common::{Error, Result};
use shelf_import::db::BookStore;
use shelf_import::models::{BookRecord, ExistingBook, NewBook};
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
struct FakeState {
    books: Vec<BookRecord>,
    failing_insert_calls: HashSet<usize>,
    failing_update_titles: HashSet<String>,
    fail_lookup: bool,
    insert_delay: Option<Duration>,
    insert_batch_sizes: Vec<usize>,
    update_calls: usize,
    lookup_calls: usize,
}

#[derive(Default)]
pub struct FakeBookStore {
    state: Mutex<FakeState>,
}

impl FakeBookStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an existing book and return its id
    pub fn seed(&self, title: &str, author: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().books.push(BookRecord {
            id,
            title: title.to_string(),
            author: author.to_string(),
            description: None,
            genres: None,
            rating: 1,
            image_url: None,
            amazon_link: None,
            created_at: Utc::now(),
        });
        id
    }

    /// Make the n-th `insert_many` call (1-based) fail
    pub fn fail_insert_call(&self, call: usize) {
        self.state.lock().unwrap().failing_insert_calls.insert(call);
    }

    /// Make `update_one` fail for rows with this title
    pub fn fail_update_for(&self, title: &str) {
        self.state.lock().unwrap().failing_update_titles.insert(title.to_string());
    }

    /// Make every `insert_many` call take this long before writing
    pub fn delay_inserts(&self, delay: Duration) {
        self.state.lock().unwrap().insert_delay = Some(delay);
    }

    pub fn fail_lookup(&self) {
        self.state.lock().unwrap().fail_lookup = true;
    }

    pub fn insert_batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().insert_batch_sizes.clone()
    }

    pub fn update_calls(&self) -> usize {
        self.state.lock().unwrap().update_calls
    }

    pub fn lookup_calls(&self) -> usize {
        self.state.lock().unwrap().lookup_calls
    }

    pub fn books(&self) -> Vec<BookRecord> {
        self.state.lock().unwrap().books.clone()
    }
}

#[async_trait]
impl BookStore for FakeBookStore {
    async fn insert_many(&self, books: &[NewBook]) -> Result<()> {
        let delay = self.state.lock().unwrap().insert_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        state.insert_batch_sizes.push(books.len());
        let call = state.insert_batch_sizes.len();

        if state.failing_insert_calls.contains(&call) {
            return Err(Error::Internal(format!("injected insert failure on call {}", call)));
        }

        for book in books {
            state.books.push(BookRecord {
                id: Uuid::new_v4(),
                title: book.title.clone(),
                author: book.author.clone(),
                description: book.description.clone(),
                genres: book.genres.clone(),
                rating: book.rating,
                image_url: book.image_url.clone(),
                amazon_link: book.amazon_link.clone(),
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn update_one(&self, id: Uuid, book: &NewBook) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;

        if state.failing_update_titles.contains(&book.title) {
            return Err(Error::Internal(format!("injected update failure for {}", book.title)));
        }

        let record = state
            .books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| Error::NotFound(format!("book {}", id)))?;
        record.title = book.title.clone();
        record.author = book.author.clone();
        record.description = book.description.clone();
        record.genres = book.genres.clone();
        record.rating = book.rating;
        record.image_url = book.image_url.clone();
        record.amazon_link = book.amazon_link.clone();
        Ok(())
    }

    async fn find_by_candidate_keys(
        &self,
        titles: &[String],
        authors: &[String],
    ) -> Result<Vec<ExistingBook>> {
        let mut state = self.state.lock().unwrap();
        state.lookup_calls += 1;

        if state.fail_lookup {
            return Err(Error::Internal("injected lookup failure".to_string()));
        }

        let titles: HashSet<String> = titles.iter().map(|t| t.to_lowercase()).collect();
        let authors: HashSet<String> = authors.iter().map(|a| a.to_lowercase()).collect();

        Ok(state
            .books
            .iter()
            .filter(|b| titles.contains(&b.title.to_lowercase()))
            .filter(|b| authors.contains(&b.author.to_lowercase()))
            .map(|b| ExistingBook {
                id: b.id,
                title: b.title.clone(),
                author: b.author.clone(),
            })
            .collect())
    }

    async fn list_books(&self) -> Result<Vec<BookRecord>> {
        let mut books = self.books();
        books.reverse();
        Ok(books)
    }
}
