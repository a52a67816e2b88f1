use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::{ArticleRepository, DigestCacheRepository, StoreError, TickerRepository};
use crate::models::{CacheEntry, CreateTicker, Lang, RawArticle, StoredArticle, TickerRecord};

/// Thread-safe in-process store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tickers: Arc<DashMap<String, TickerRecord>>,
    articles: Arc<DashMap<String, StoredArticle>>,
    digests: Arc<DashMap<(i64, Lang), CacheEntry>>,
    next_ticker_id: Arc<AtomicI64>,
    next_article_id: Arc<AtomicI64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn article_count(&self) -> usize {
        self.articles.len()
    }

    pub fn cached_digest_count(&self) -> usize {
        self.digests.len()
    }
}

/// Newest first, unknown publish time last, newest id breaks ties
pub(crate) fn recency_order(a: &StoredArticle, b: &StoredArticle) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl TickerRepository for MemoryStore {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<TickerRecord>, StoreError> {
        Ok(self.tickers.get(symbol).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, ticker: CreateTicker) -> Result<TickerRecord, StoreError> {
        let record = self
            .tickers
            .entry(ticker.symbol.clone())
            .or_insert_with(|| TickerRecord {
                id: self.next_ticker_id.fetch_add(1, AtomicOrdering::SeqCst) + 1,
                symbol: ticker.symbol,
                name: ticker.name,
                exchange: ticker.exchange,
                sector: ticker.sector,
            })
            .value()
            .clone();
        Ok(record)
    }
}

#[async_trait]
impl ArticleRepository for MemoryStore {
    async fn upsert_many(&self, ticker_id: i64, articles: &[RawArticle]) -> Result<(), StoreError> {
        for article in articles {
            self.articles
                .entry(article.url.clone())
                .and_modify(|row| {
                    row.ticker_id = ticker_id;
                    row.title = article.title.clone();
                    row.source = article.source.clone();
                    row.published_at = article.published_at;
                    row.raw_content = article.raw_content.clone();
                })
                .or_insert_with(|| StoredArticle {
                    id: self.next_article_id.fetch_add(1, AtomicOrdering::SeqCst) + 1,
                    ticker_id,
                    title: article.title.clone(),
                    url: article.url.clone(),
                    source: article.source.clone(),
                    published_at: article.published_at,
                    raw_content: article.raw_content.clone(),
                    created_at: Utc::now(),
                });
        }
        Ok(())
    }

    async fn list_recent(&self, ticker_id: i64, limit: i64) -> Result<Vec<StoredArticle>, StoreError> {
        let mut rows: Vec<StoredArticle> = self
            .articles
            .iter()
            .filter(|entry| entry.value().ticker_id == ticker_id)
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(recency_order);
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[async_trait]
impl DigestCacheRepository for MemoryStore {
    async fn fetch(&self, ticker_id: i64, lang: Lang) -> Result<Option<CacheEntry>, StoreError> {
        Ok(self
            .digests
            .get(&(ticker_id, lang))
            .map(|entry| entry.value().clone()))
    }

    async fn store(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.digests
            .insert((entry.ticker_id, entry.lang), entry.clone());
        Ok(())
    }
}
