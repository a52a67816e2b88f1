//! Persistence seams for the digest pipeline.
//!
//! The services only talk to these traits. `PgStore` backs them with
//! Postgres; `MemoryStore` keeps everything in process and is used when no
//! `DATABASE_URL` is configured and by the tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CacheEntry, CreateTicker, Lang, RawArticle, StoredArticle, TickerRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait TickerRepository: Send + Sync {
    /// Exact match on the stored (uppercase) symbol
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<TickerRecord>, StoreError>;

    /// Inserts a ticker. If the symbol already exists the existing row is
    /// returned unchanged.
    async fn insert(&self, ticker: CreateTicker) -> Result<TickerRecord, StoreError>;
}

#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Insert-or-update keyed on url. Callers guarantee non-empty, distinct urls.
    async fn upsert_many(&self, ticker_id: i64, articles: &[RawArticle]) -> Result<(), StoreError>;

    /// Most recent articles first; unknown publish times sort last
    async fn list_recent(&self, ticker_id: i64, limit: i64) -> Result<Vec<StoredArticle>, StoreError>;
}

#[async_trait]
pub trait DigestCacheRepository: Send + Sync {
    async fn fetch(&self, ticker_id: i64, lang: Lang) -> Result<Option<CacheEntry>, StoreError>;

    /// Replaces any entry for the same (ticker_id, lang)
    async fn store(&self, entry: &CacheEntry) -> Result<(), StoreError>;
}
