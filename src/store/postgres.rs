use async_trait::async_trait;
use sqlx::PgPool;

use super::{ArticleRepository, DigestCacheRepository, StoreError, TickerRepository};
use crate::db::{article_queries, digest_cache_queries, ticker_queries};
use crate::models::{CacheEntry, CreateTicker, DigestResult, Lang, RawArticle, StoredArticle, TickerRecord};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TickerRepository for PgStore {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<TickerRecord>, StoreError> {
        Ok(ticker_queries::fetch_ticker_by_symbol(&self.pool, symbol).await?)
    }

    async fn insert(&self, ticker: CreateTicker) -> Result<TickerRecord, StoreError> {
        Ok(ticker_queries::insert_ticker(&self.pool, &ticker).await?)
    }
}

#[async_trait]
impl ArticleRepository for PgStore {
    async fn upsert_many(&self, ticker_id: i64, articles: &[RawArticle]) -> Result<(), StoreError> {
        article_queries::upsert_articles(&self.pool, ticker_id, articles).await?;
        Ok(())
    }

    async fn list_recent(&self, ticker_id: i64, limit: i64) -> Result<Vec<StoredArticle>, StoreError> {
        Ok(article_queries::fetch_recent_articles(&self.pool, ticker_id, limit).await?)
    }
}

#[async_trait]
impl DigestCacheRepository for PgStore {
    async fn fetch(&self, ticker_id: i64, lang: Lang) -> Result<Option<CacheEntry>, StoreError> {
        let Some(row) = digest_cache_queries::fetch_digest(&self.pool, ticker_id, lang.as_str()).await? else {
            return Ok(None);
        };

        let digest: DigestResult = serde_json::from_value(row.digest)
            .map_err(|e| StoreError::Serialization(format!("cached digest for ticker {}: {}", row.ticker_id, e)))?;

        Ok(Some(CacheEntry {
            ticker_id: row.ticker_id,
            lang,
            digest,
            created_at: row.created_at,
        }))
    }

    async fn store(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let digest = serde_json::to_value(&entry.digest)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        digest_cache_queries::upsert_digest(
            &self.pool,
            entry.ticker_id,
            entry.lang.as_str(),
            digest,
            entry.created_at,
        )
        .await?;

        Ok(())
    }
}
