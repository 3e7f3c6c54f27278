//! Author portal: profile, books, sales and affiliate links.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use quillhouse_commerce::db::{AffiliateRepository, AuthorRepository, BookRepository, SalesRepository};
use quillhouse_commerce::models::{AffiliateLink, Author, Book, BookDraft};
use quillhouse_core::sales::SalesReport;
use quillhouse_core::{BookId, BookStatus, UserRole};

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, RequireAuthor};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

const GENERATED_CODE_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub pen_name: String,
    #[serde(default)]
    pub bio: String,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub book_id: Option<BookId>,
    /// Custom code; generated when absent.
    pub code: Option<String>,
}

fn validate_draft(draft: &BookDraft) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if draft.print_price <= Decimal::ZERO {
        return Err(AppError::BadRequest("Print price must be positive".to_string()));
    }
    if draft.ebook_price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(AppError::BadRequest("E-book price must be positive".to_string()));
    }
    if let Some(isbn) = draft.isbn.as_deref() {
        let digits = isbn.chars().filter(|c| *c != '-').collect::<String>();
        if !matches!(digits.len(), 10 | 13) || !digits.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::BadRequest("ISBN must have 10 or 13 digits".to_string()));
        }
    }
    if draft.pages.is_some_and(|p| p <= 0) || draft.weight_grams.is_some_and(|w| w <= 0) {
        return Err(AppError::BadRequest("Pages and weight must be positive".to_string()));
    }
    Ok(())
}

fn validate_code(code: &str) -> Result<String> {
    let code = code.trim();
    let valid = (4..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::BadRequest(
            "Code must be 4-32 letters, digits, dashes or underscores".to_string(),
        ));
    }
    Ok(code.to_ascii_lowercase())
}

fn generate_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_CODE_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

async fn author_for(state: &AppState, user: &CurrentUser) -> Result<Author> {
    AuthorRepository::new(state.pool())
        .get_by_user(user.id)
        .await?
        .ok_or_else(|| AppError::Forbidden("Author profile required".to_string()))
}

async fn own_book(state: &AppState, author: &Author, id: BookId) -> Result<Book> {
    BookRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|b| b.author_id == author.id)
        .ok_or_else(|| AppError::NotFound(format!("Book {id}")))
}

/// The caller's author profile, or `null` before they set one up.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Option<Author>>> {
    Ok(Json(
        AuthorRepository::new(state.pool())
            .get_by_user(user.id)
            .await?,
    ))
}

/// Create or edit the author profile. Creating one makes a customer an author.
#[instrument(skip(state, session, user, body), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<Author>> {
    let pen_name = body.pen_name.trim();
    if pen_name.is_empty() {
        return Err(AppError::BadRequest("Pen name is required".to_string()));
    }
    let website = body.website.as_deref().map(str::trim).filter(|w| !w.is_empty());
    if website.is_some_and(|w| url::Url::parse(w).is_err()) {
        return Err(AppError::BadRequest("Website must be a full URL".to_string()));
    }

    let author = AuthorRepository::new(state.pool())
        .upsert_profile(user.id, pen_name, body.bio.trim(), website)
        .await?;

    if user.role == UserRole::Customer {
        let promoted = CurrentUser {
            role: UserRole::Author,
            ..user
        };
        session.insert(session_keys::CURRENT_USER, &promoted).await?;
        tracing::info!(author_id = %author.id, "Customer became an author");
    }

    Ok(Json(author))
}

/// The author's books in every status.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn books(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
) -> Result<Json<Vec<Book>>> {
    let author = author_for(&state, &user).await?;
    Ok(Json(
        BookRepository::new(state.pool())
            .list_by_author(author.id)
            .await?,
    ))
}

/// Create a draft.
#[instrument(skip(state, user, draft), fields(user_id = %user.id))]
pub async fn create_book(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<Book>)> {
    validate_draft(&draft)?;
    let author = author_for(&state, &user).await?;

    let book = BookRepository::new(state.pool())
        .create(author.id, &draft)
        .await?;
    tracing::info!(book_id = %book.id, "Draft created");

    Ok((StatusCode::CREATED, Json(book)))
}

/// Edit a draft or rejected book.
#[instrument(skip(state, user, draft), fields(user_id = %user.id))]
pub async fn update_book(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
    Path(id): Path<BookId>,
    Json(draft): Json<BookDraft>,
) -> Result<Json<Book>> {
    validate_draft(&draft)?;
    let author = author_for(&state, &user).await?;
    let book = own_book(&state, &author, id).await?;

    if !book.status.is_editable_by_author() {
        return Err(AppError::Conflict(format!(
            "Books that are {} can no longer be edited",
            book.status
        )));
    }

    Ok(Json(
        BookRepository::new(state.pool())
            .update_draft(id, author.id, &draft)
            .await?,
    ))
}

/// Send a book for review.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn submit_book(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
    Path(id): Path<BookId>,
) -> Result<Json<Book>> {
    let author = author_for(&state, &user).await?;
    let book = own_book(&state, &author, id).await?;

    if !book.status.can_transition_to(BookStatus::PendingReview) {
        return Err(AppError::Conflict(format!(
            "A {} book cannot be submitted for review",
            book.status
        )));
    }

    let book = BookRepository::new(state.pool())
        .set_status(id, BookStatus::PendingReview, None)
        .await?;
    tracing::info!(book_id = %book.id, "Book submitted for review");

    Ok(Json(book))
}

/// Sales of the author's books, optionally for one year.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn sales(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
    Query(query): Query<SalesQuery>,
) -> Result<Json<SalesReport>> {
    let author = author_for(&state, &user).await?;
    let lines = SalesRepository::new(state.pool())
        .lines_for_author(author.id)
        .await?;

    Ok(Json(SalesReport::build(&lines, query.year)))
}

/// The author's affiliate links with click and order counts.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn links(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
) -> Result<Json<Vec<AffiliateLink>>> {
    let author = author_for(&state, &user).await?;
    Ok(Json(
        AffiliateRepository::new(state.pool())
            .list_for_author(author.id)
            .await?,
    ))
}

/// Create an affiliate link, optionally pointing at one of the author's books.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_link(
    State(state): State<AppState>,
    RequireAuthor(user): RequireAuthor,
    Json(body): Json<LinkRequest>,
) -> Result<(StatusCode, Json<AffiliateLink>)> {
    let author = author_for(&state, &user).await?;

    if let Some(book_id) = body.book_id {
        own_book(&state, &author, book_id).await?;
    }

    let code = match body.code.as_deref() {
        Some(code) => validate_code(code)?,
        None => generate_code(),
    };

    let link = AffiliateRepository::new(state.pool())
        .create(author.id, body.book_id, &code)
        .await?;

    Ok((StatusCode::CREATED, Json(link)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> BookDraft {
        BookDraft {
            title: "The Salt Road".to_owned(),
            subtitle: None,
            description: String::new(),
            isbn: Some("978-93-5118-123-4".to_owned()),
            language: None,
            category: None,
            print_price: Decimal::from(399),
            ebook_price: Some(Decimal::from(149)),
            pages: Some(240),
            weight_grams: None,
            cover_url: None,
            ebook_url: None,
        }
    }

    #[test]
    fn test_valid_draft() {
        assert!(validate_draft(&draft()).is_ok());
    }

    #[test]
    fn test_draft_rules() {
        let mut d = draft();
        d.title = "  ".to_owned();
        assert!(validate_draft(&d).is_err());

        let mut d = draft();
        d.print_price = Decimal::ZERO;
        assert!(validate_draft(&d).is_err());

        let mut d = draft();
        d.isbn = Some("12345".to_owned());
        assert!(validate_draft(&d).is_err());
    }

    #[test]
    fn test_code_validation() {
        assert_eq!(validate_code(" Summer-Reads ").unwrap(), "summer-reads");
        assert!(validate_code("ab").is_err());
        assert!(validate_code("has space").is_err());
    }

    #[test]
    fn test_generated_code() {
        let code = generate_code();
        assert_eq!(code.len(), GENERATED_CODE_LENGTH);
        assert!(validate_code(&code).is_ok());
    }
}
