//! The customer's e-book library.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use quillhouse_commerce::db::{BookRepository, LibraryRepository};
use quillhouse_commerce::models::LibraryEntry;
use quillhouse_core::BookId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Reading access to one e-book.
#[derive(Debug, Serialize)]
pub struct ReadingAccess {
    pub book_id: BookId,
    pub title: String,
    pub ebook_url: String,
}

/// E-books the customer owns.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<LibraryEntry>>> {
    Ok(Json(
        LibraryRepository::new(state.pool())
            .list_for_user(user.id)
            .await?,
    ))
}

/// The e-book file link, for owners and subscribers.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn read(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(book_id): Path<BookId>,
) -> Result<Json<ReadingAccess>> {
    if !LibraryRepository::new(state.pool())
        .has_access(user.id, book_id)
        .await?
    {
        return Err(AppError::Forbidden(
            "This e-book is not in your library".to_string(),
        ));
    }

    let book = BookRepository::new(state.pool())
        .get(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {book_id}")))?;

    let ebook_url = book
        .ebook_url
        .ok_or_else(|| AppError::NotFound("No e-book file for this title".to_string()))?;

    Ok(Json(ReadingAccess {
        book_id: book.id,
        title: book.title,
        ebook_url,
    }))
}
