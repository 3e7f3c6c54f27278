//! Book repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use quillhouse_core::{AuthorId, BookId, BookStatus};

use super::{PAGE_SIZE, RepositoryError, inr, page_offset};
use crate::models::catalog::{Book, BookDraft, BookFilter};

const BOOK_SELECT: &str = r"
    SELECT b.id, b.slug, b.title, b.subtitle, b.author_id, a.pen_name AS author_name,
           b.description, b.isbn, b.language, b.category, b.print_price, b.ebook_price,
           b.stock, b.pages, b.weight_grams, b.cover_url, b.ebook_url, b.status,
           b.rejection_reason, b.published_at, b.created_at, b.updated_at
    FROM shop.book b
    JOIN shop.author a ON a.id = b.author_id
";

#[derive(Debug, sqlx::FromRow)]
struct BookRow {
    id: i32,
    slug: String,
    title: String,
    subtitle: Option<String>,
    author_id: i32,
    author_name: String,
    description: String,
    isbn: Option<String>,
    language: String,
    category: String,
    print_price: Decimal,
    ebook_price: Option<Decimal>,
    stock: i32,
    pages: Option<i32>,
    weight_grams: i32,
    cover_url: Option<String>,
    ebook_url: Option<String>,
    status: BookStatus,
    rejection_reason: Option<String>,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: BookId::new(row.id),
            slug: row.slug,
            title: row.title,
            subtitle: row.subtitle,
            author_id: AuthorId::new(row.author_id),
            author_name: row.author_name,
            description: row.description,
            isbn: row.isbn,
            language: row.language,
            category: row.category,
            print_price: inr(row.print_price),
            ebook_price: row.ebook_price.map(inr),
            stock: row.stock,
            pages: row.pages,
            weight_grams: row.weight_grams,
            cover_url: row.cover_url,
            ebook_url: row.ebook_url,
            status: row.status,
            rejection_reason: row.rejection_reason,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for book database operations.
pub struct BookRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BookRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Search books, newest first.
    ///
    /// `filter.status` restricts the editorial state; storefront callers
    /// always pass `Published`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(&self, filter: &BookFilter) -> Result<Vec<Book>, RepositoryError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(BOOK_SELECT);
        qb.push(" WHERE TRUE");

        if let Some(status) = filter.status {
            qb.push(" AND b.status = ").push_bind(status);
        }

        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            qb.push(" AND b.category = ").push_bind(category.to_owned());
        }

        if let Some(author) = filter.author {
            qb.push(" AND b.author_id = ").push_bind(author);
        }

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", escape_like(q));
            qb.push(" AND (b.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR b.subtitle ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.pen_name ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        qb.push(" ORDER BY COALESCE(b.published_at, b.created_at) DESC, b.id DESC LIMIT ")
            .push_bind(PAGE_SIZE)
            .push(" OFFSET ")
            .push_bind(page_offset(filter.page));

        let rows = qb.build_query_as::<BookRow>().fetch_all(self.pool).await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a book by ID regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BookId) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Get a book by slug regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Book>, RepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.slug = $1"))
            .bind(slug)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Load several books at once (cart resolution).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[BookId]) -> Result<Vec<Book>, RepositoryError> {
        let ids: Vec<i32> = ids.iter().map(BookId::as_i32).collect();
        let rows = sqlx::query_as::<_, BookRow>(&format!("{BOOK_SELECT} WHERE b.id = ANY($1)"))
            .bind(ids)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All books by an author, any status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_author(&self, author_id: AuthorId) -> Result<Vec<Book>, RepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "{BOOK_SELECT} WHERE b.author_id = $1 ORDER BY b.created_at DESC"
        ))
        .bind(author_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a draft book for an author.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the ISBN is already used.
    pub async fn create(&self, author_id: AuthorId, draft: &BookDraft) -> Result<Book, RepositoryError> {
        let slug = format!("{}-{}", slugify(&draft.title), short_suffix());

        let id: i32 = sqlx::query_scalar(
            r"
            INSERT INTO shop.book (
                slug, title, subtitle, author_id, description, isbn, language, category,
                print_price, ebook_price, pages, weight_grams, cover_url, ebook_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'English'), COALESCE($8, 'General'),
                    $9, $10, $11, COALESCE($12, 300), $13, $14)
            RETURNING id
            ",
        )
        .bind(slug)
        .bind(draft.title.trim())
        .bind(draft.subtitle.as_deref())
        .bind(author_id)
        .bind(&draft.description)
        .bind(draft.isbn.as_deref())
        .bind(draft.language.as_deref())
        .bind(draft.category.as_deref())
        .bind(draft.print_price)
        .bind(draft.ebook_price)
        .bind(draft.pages)
        .bind(draft.weight_grams)
        .bind(draft.cover_url.as_deref())
        .bind(draft.ebook_url.as_deref())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "ISBN already registered"))?;

        self.get(BookId::new(id)).await?.ok_or(RepositoryError::NotFound)
    }

    /// Update a book's details on behalf of its author.
    ///
    /// Only draft and rejected books can be edited.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist, isn't
    /// the author's, or is not editable.
    pub async fn update_draft(
        &self,
        id: BookId,
        author_id: AuthorId,
        draft: &BookDraft,
    ) -> Result<Book, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.book
            SET title = $3, subtitle = $4, description = $5, isbn = $6,
                language = COALESCE($7, language), category = COALESCE($8, category),
                print_price = $9, ebook_price = $10, pages = $11,
                weight_grams = COALESCE($12, weight_grams), cover_url = $13, ebook_url = $14,
                updated_at = NOW()
            WHERE id = $1 AND author_id = $2 AND status IN ($15, $16)
            ",
        )
        .bind(id)
        .bind(author_id)
        .bind(draft.title.trim())
        .bind(draft.subtitle.as_deref())
        .bind(&draft.description)
        .bind(draft.isbn.as_deref())
        .bind(draft.language.as_deref())
        .bind(draft.category.as_deref())
        .bind(draft.print_price)
        .bind(draft.ebook_price)
        .bind(draft.pages)
        .bind(draft.weight_grams)
        .bind(draft.cover_url.as_deref())
        .bind(draft.ebook_url.as_deref())
        .bind(BookStatus::Draft)
        .bind(BookStatus::Rejected)
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::conflict_on_unique(e, "ISBN already registered"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Move a book to a new editorial status.
    ///
    /// `published_at` is stamped the first time a book is published. The
    /// rejection reason is cleared unless the new status is `Rejected`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    pub async fn set_status(
        &self,
        id: BookId,
        status: BookStatus,
        rejection_reason: Option<&str>,
    ) -> Result<Book, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.book
            SET status = $2,
                rejection_reason = $3,
                published_at = CASE WHEN $2 = 'published' THEN COALESCE(published_at, NOW())
                                    ELSE published_at END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(rejection_reason.filter(|_| status == BookStatus::Rejected))
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Set stock and, optionally, prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the book doesn't exist.
    pub async fn update_inventory(
        &self,
        id: BookId,
        stock: i32,
        print_price: Option<Decimal>,
        ebook_price: Option<Decimal>,
    ) -> Result<Book, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.book
            SET stock = $2,
                print_price = COALESCE($3, print_price),
                ebook_price = COALESCE($4, ebook_price),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(stock)
        .bind(print_price)
        .bind(ebook_price)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Distinct categories of published books.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM shop.book WHERE status = $1 ORDER BY category",
        )
        .bind(BookStatus::Published)
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }
}

/// URL slug from a title: lower-case ASCII words joined by `-`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("book");
    }

    slug.truncate(60);
    slug.trim_end_matches('-').to_owned()
}

fn short_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(6).collect()
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Monsoon Letters"), "the-monsoon-letters");
        assert_eq!(slugify("  Hello, World!  "), "hello-world");
        assert_eq!(slugify("C++ & You"), "c-you");
        assert_eq!(slugify("कविता"), "book");
    }

    #[test]
    fn test_short_suffix() {
        let s = short_suffix();
        assert_eq!(s.len(), 6);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
