//! Published catalog with a short-lived in-memory cache.
//!
//! Listings, book pages and categories are cached for 60 seconds. Entries
//! are never invalidated explicitly; an approved or edited book shows up
//! once its entry expires.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;

use quillhouse_commerce::db::{BookRepository, RepositoryError};
use quillhouse_commerce::models::{Book, BookFilter};
use quillhouse_core::BookStatus;

const CACHE_TTL: Duration = Duration::from_secs(60);
const CACHE_CAPACITY: u64 = 1000;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Listing {
        category: Option<String>,
        author: Option<i32>,
        page: u32,
    },
    Book(String),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Books(Arc<Vec<Book>>),
    Book(Arc<Book>),
    Categories(Arc<Vec<String>>),
}

/// Read-through cache over the published part of the catalog.
#[derive(Clone)]
pub struct Catalog {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self { cache }
    }

    /// Published books matching `filter`.
    ///
    /// Free-text searches bypass the cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        pool: &PgPool,
        filter: &BookFilter,
    ) -> Result<Arc<Vec<Book>>, RepositoryError> {
        let filter = BookFilter {
            status: Some(BookStatus::Published),
            ..filter.clone()
        };

        let has_query = filter.q.as_deref().is_some_and(|q| !q.trim().is_empty());
        if has_query {
            return Ok(Arc::new(BookRepository::new(pool).search(&filter).await?));
        }

        let key = CacheKey::Listing {
            category: filter.category.clone().filter(|c| !c.is_empty()),
            author: filter.author.map(|a| a.as_i32()),
            page: filter.page.unwrap_or(1).max(1),
        };

        if let Some(CacheValue::Books(books)) = self.cache.get(&key).await {
            return Ok(books);
        }

        let books = Arc::new(BookRepository::new(pool).search(&filter).await?);
        self.cache
            .insert(key, CacheValue::Books(Arc::clone(&books)))
            .await;

        Ok(books)
    }

    /// A published book by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn book(&self, pool: &PgPool, slug: &str) -> Result<Option<Arc<Book>>, RepositoryError> {
        let key = CacheKey::Book(slug.to_owned());

        if let Some(CacheValue::Book(book)) = self.cache.get(&key).await {
            return Ok(Some(book));
        }

        let Some(book) = BookRepository::new(pool)
            .get_by_slug(slug)
            .await?
            .filter(Book::is_published)
        else {
            return Ok(None);
        };

        let book = Arc::new(book);
        self.cache
            .insert(key, CacheValue::Book(Arc::clone(&book)))
            .await;

        Ok(Some(book))
    }

    /// Categories that have at least one published book.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<String>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) =
            self.cache.get(&CacheKey::Categories).await
        {
            return Ok(categories);
        }

        let categories = Arc::new(BookRepository::new(pool).categories().await?);
        self.cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;

        Ok(categories)
    }
}
