//! Book listing

use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::models::BookRecord;
use crate::AppState;

/// GET /books
///
/// All stored books, newest first.
pub async fn list_books(State(state): State<AppState>) -> ApiResult<Json<Vec<BookRecord>>> {
    let books = state.store.list_books().await?;
    Ok(Json(books))
}

pub fn book_routes() -> Router<AppState> {
    Router::new().route("/books", get(list_books))
}
