//! Catalog and review routes.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quillhouse_commerce::db::reviews::RatingSummary;
use quillhouse_commerce::db::{BookRepository, ReviewRepository};
use quillhouse_commerce::models::{Book, BookFilter, Review};
use quillhouse_core::BookId;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Longest review body accepted.
const MAX_REVIEW_LENGTH: usize = 4000;

/// Listing query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub author: Option<i32>,
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct BookList {
    pub books: Arc<Vec<Book>>,
    pub categories: Arc<Vec<String>>,
    pub page: u32,
}

#[derive(Debug, Serialize)]
pub struct BookDetail {
    pub book: Arc<Book>,
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct ReviewList {
    pub reviews: Vec<Review>,
    pub rating: RatingSummary,
}

/// New review body.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

/// Published books, filtered and paginated.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<BookList>> {
    let filter = BookFilter {
        q: query.q,
        category: query.category,
        author: query.author.map(Into::into),
        status: None,
        page: query.page,
    };

    let books = state.catalog().list(state.pool(), &filter).await?;
    let categories = state.catalog().categories(state.pool()).await?;

    Ok(Json(BookList {
        books,
        categories,
        page: query.page.unwrap_or(1).max(1),
    }))
}

/// A published book by slug.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BookDetail>> {
    let book = state
        .catalog()
        .book(state.pool(), &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {slug}")))?;

    let rating = ReviewRepository::new(state.pool()).summary(book.id).await?;

    Ok(Json(BookDetail { book, rating }))
}

async fn published_book(state: &AppState, id: BookId) -> Result<Book> {
    BookRepository::new(state.pool())
        .get(id)
        .await?
        .filter(Book::is_published)
        .ok_or_else(|| AppError::NotFound(format!("Book {id}")))
}

/// Reviews of a book, newest first.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<ReviewList>> {
    let book = published_book(&state, id).await?;
    let repo = ReviewRepository::new(state.pool());

    Ok(Json(ReviewList {
        reviews: repo.list_for_book(book.id).await?,
        rating: repo.summary(book.id).await?,
    }))
}

/// Review a book. One review per customer per book.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<BookId>,
    Json(body): Json<ReviewRequest>,
) -> Result<(StatusCode, Json<Review>)> {
    if !(1..=5).contains(&body.rating) {
        return Err(AppError::BadRequest("Rating must be between 1 and 5".to_string()));
    }

    let comment = body.comment.trim();
    if comment.chars().count() > MAX_REVIEW_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Review must be at most {MAX_REVIEW_LENGTH} characters"
        )));
    }

    let book = published_book(&state, id).await?;

    let review = ReviewRepository::new(state.pool())
        .create(book.id, user.id, body.rating, comment)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}
