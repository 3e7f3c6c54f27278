//! Editorial review and inventory of books.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use quillhouse_commerce::db::{AuthorRepository, BookRepository};
use quillhouse_commerce::models::{Author, Book, BookFilter};
use quillhouse_core::{AuthorId, BookId, BookStatus};

use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BooksQuery {
    pub status: Option<BookStatus>,
    pub q: Option<String>,
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RejectInput {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct InventoryInput {
    pub stock: i32,
    pub print_price: Option<Decimal>,
    pub ebook_price: Option<Decimal>,
}

impl InventoryInput {
    fn validate(&self) -> Result<()> {
        if self.stock < 0 {
            return Err(AppError::BadRequest("Stock cannot be negative".to_string()));
        }
        let bad_price = |p: Option<Decimal>| p.is_some_and(|p| p <= Decimal::ZERO);
        if bad_price(self.print_price) || bad_price(self.ebook_price) {
            return Err(AppError::BadRequest("Prices must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RoyaltyInput {
    pub royalty_rate: Decimal,
}

/// Books in any status; `status=pending_review` is the review queue.
#[instrument(skip(_admin, state))]
pub async fn index(
    RequireAdminAuth(_admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<BooksQuery>,
) -> Result<Json<Vec<Book>>> {
    let filter = BookFilter {
        q: query.q,
        status: query.status,
        page: query.page,
        ..BookFilter::default()
    };
    Ok(Json(BookRepository::new(state.pool()).search(&filter).await?))
}

async fn transition(
    state: &AppState,
    id: BookId,
    to: BookStatus,
    reason: Option<&str>,
) -> Result<Book> {
    let repo = BookRepository::new(state.pool());
    let book = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("book {id}")))?;

    if !book.status.can_transition_to(to) {
        return Err(AppError::Conflict(format!(
            "Book is {} and cannot become {to}",
            book.status
        )));
    }

    let book = repo.set_status(id, to, reason).await?;
    tracing::info!(book_id = %id, status = %to, "Book status changed");
    Ok(book)
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn approve(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>> {
    Ok(Json(transition(&state, id, BookStatus::Published, None).await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn reject(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    Json(input): Json<RejectInput>,
) -> Result<Json<Book>> {
    let reason = input.reason.trim();
    if reason.is_empty() {
        return Err(AppError::BadRequest("A rejection reason is required".to_string()));
    }
    Ok(Json(
        transition(&state, id, BookStatus::Rejected, Some(reason)).await?,
    ))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn archive(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>> {
    Ok(Json(transition(&state, id, BookStatus::Archived, None).await?))
}

#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn update_inventory(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    Json(input): Json<InventoryInput>,
) -> Result<Json<Book>> {
    input.validate()?;
    let book = BookRepository::new(state.pool())
        .update_inventory(id, input.stock, input.print_price, input.ebook_price)
        .await?;
    tracing::info!(book_id = %id, stock = input.stock, "Inventory updated");
    Ok(Json(book))
}

/// Reports use the current rate, so a change also affects past sales.
#[instrument(skip(admin, state, input), fields(admin_id = %admin.id))]
pub async fn set_royalty(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
    Json(input): Json<RoyaltyInput>,
) -> Result<Json<Author>> {
    if input.royalty_rate < Decimal::ZERO || input.royalty_rate > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(
            "Royalty rate must be between 0 and 100".to_string(),
        ));
    }
    let author = AuthorRepository::new(state.pool())
        .set_royalty_rate(id, input.royalty_rate)
        .await?;
    Ok(Json(author))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_validation() {
        let ok = InventoryInput {
            stock: 0,
            print_price: Some(Decimal::from(299)),
            ebook_price: None,
        };
        assert!(ok.validate().is_ok());

        let negative = InventoryInput {
            stock: -1,
            print_price: None,
            ebook_price: None,
        };
        assert!(negative.validate().is_err());

        let free = InventoryInput {
            stock: 5,
            print_price: None,
            ebook_price: Some(Decimal::ZERO),
        };
        assert!(free.validate().is_err());
    }
}
