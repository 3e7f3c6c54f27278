//! Affiliate link redirects.

use axum::{
    extract::{Path, State},
    response::Redirect,
};
use tower_sessions::Session;
use tracing::instrument;

use quillhouse_commerce::db::{AffiliateRepository, BookRepository};
use quillhouse_commerce::models::Book;

use crate::error::Result;
use crate::models::session_keys;
use crate::state::AppState;

/// Count the click, remember the code for checkout and send the visitor
/// on to the linked book (or the home page).
///
/// Codes are matched case-insensitively. Unknown codes redirect home
/// without touching the session.
#[instrument(skip(state, session))]
pub async fn redirect(
    State(state): State<AppState>,
    session: Session,
    Path(code): Path<String>,
) -> Result<Redirect> {
    let base = &state.config().base_url;

    let Some(link) = AffiliateRepository::new(state.pool())
        .record_click(&code.to_ascii_lowercase())
        .await?
    else {
        tracing::debug!(code, "Unknown affiliate code");
        return Ok(Redirect::to(&format!("{base}/")));
    };

    session
        .insert(session_keys::AFFILIATE_CODE, &link.code)
        .await?;

    let book = match link.book_id {
        Some(id) => BookRepository::new(state.pool())
            .get(id)
            .await?
            .filter(Book::is_published),
        None => None,
    };

    Ok(match book {
        Some(book) => Redirect::to(&format!("{base}/books/{}", book.slug)),
        None => Redirect::to(&format!("{base}/")),
    })
}
