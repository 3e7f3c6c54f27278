//! Catalog domain types: authors, books and reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use quillhouse_core::{AuthorId, BookFormat, BookId, BookStatus, Money, ReviewId, UserId};

/// An author's publishing profile.
#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub id: AuthorId,
    pub user_id: UserId,
    pub pen_name: String,
    pub bio: String,
    pub website: Option<String>,
    /// Royalty percentage applied to the author's sales.
    pub royalty_rate: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A book in the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Book {
    pub id: BookId,
    pub slug: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_id: AuthorId,
    /// Pen name of the author, joined in for display.
    pub author_name: String,
    pub description: String,
    pub isbn: Option<String>,
    pub language: String,
    pub category: String,
    pub print_price: Money,
    /// `None` when no e-book edition exists.
    pub ebook_price: Option<Money>,
    pub stock: i32,
    pub pages: Option<i32>,
    pub weight_grams: i32,
    pub cover_url: Option<String>,
    /// Never exposed in public listings; served from the library only.
    #[serde(skip_serializing)]
    pub ebook_url: Option<String>,
    pub status: BookStatus,
    pub rejection_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Price for a format, if the book is sold in it.
    #[must_use]
    pub const fn price_for(&self, format: BookFormat) -> Option<Money> {
        match format {
            BookFormat::Print => Some(self.print_price),
            BookFormat::Ebook => self.ebook_price,
        }
    }

    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self.status, BookStatus::Published)
    }
}

/// Fields an author supplies when creating or editing a book.
#[derive(Debug, Clone, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: String,
    pub isbn: Option<String>,
    pub language: Option<String>,
    pub category: Option<String>,
    pub print_price: Decimal,
    pub ebook_price: Option<Decimal>,
    pub pages: Option<i32>,
    pub weight_grams: Option<i32>,
    pub cover_url: Option<String>,
    pub ebook_url: Option<String>,
}

/// Catalog search filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    /// Case-insensitive match on title, subtitle or author name.
    pub q: Option<String>,
    pub category: Option<String>,
    pub author: Option<AuthorId>,
    pub status: Option<BookStatus>,
    pub page: Option<u32>,
}

/// A customer review.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub book_id: BookId,
    pub user_id: UserId,
    /// Reviewer display name, falling back to "Reader".
    pub reviewer: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}
