#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::json;

use news_digest_backend::config::AppConfig;
use news_digest_backend::errors::LlmError;
use news_digest_backend::external::article_source::{ArticleSource, SourceError};
use news_digest_backend::external::market_data::{
    MarketDataError, MarketDataProvider, SearchQuote, TickerMetadata,
};
use news_digest_backend::models::{CacheEntry, Lang, RawArticle};
use news_digest_backend::services::article_fetcher::ArticleFetcher;
use news_digest_backend::services::article_store::ArticleStore;
use news_digest_backend::services::digest_cache::DigestCache;
use news_digest_backend::services::digest_orchestrator::DigestOrchestrator;
use news_digest_backend::services::llm_service::{Credentials, LlmBackend, LlmCompletion, LlmService};
use news_digest_backend::services::rate_limiter::SearchRateLimiter;
use news_digest_backend::services::summarizer::Summarizer;
use news_digest_backend::services::ticker_resolver::TickerResolver;
use news_digest_backend::state::AppState;
use news_digest_backend::store::{DigestCacheRepository, MemoryStore, StoreError};

/// LLM backend that always answers with the same text (or error)
pub struct ScriptedLlm {
    reply: Result<String, String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn call(&self, prompt: &str, _credentials: &Credentials) -> Result<LlmCompletion, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        match &self.reply {
            Ok(text) => Ok(LlmCompletion {
                text: text.clone(),
                model: "scripted-model".to_string(),
            }),
            Err(message) => Err(LlmError::ApiError(message.clone())),
        }
    }
}

/// Article source returning a fixed batch
pub struct StaticSource {
    articles: Vec<RawArticle>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(articles: Vec<RawArticle>) -> Self {
        Self {
            articles,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, _symbol: &str, limit: usize) -> Result<Vec<RawArticle>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.articles.iter().take(limit).cloned().collect())
    }
}

/// Market data that knows about a fixed set of symbols
#[derive(Default)]
pub struct StubMarketData {
    known: HashMap<String, TickerMetadata>,
}

impl StubMarketData {
    pub fn with(mut self, symbol: &str, name: &str) -> Self {
        self.known.insert(
            symbol.to_string(),
            TickerMetadata {
                long_name: Some(name.to_string()),
                short_name: None,
                exchange: Some("NMS".to_string()),
                sector: Some("Technology".to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl MarketDataProvider for StubMarketData {
    async fn lookup_ticker(&self, symbol: &str) -> Result<Option<TickerMetadata>, MarketDataError> {
        Ok(self.known.get(symbol).cloned())
    }

    async fn search_tickers(&self, query: &str) -> Result<Vec<SearchQuote>, MarketDataError> {
        Ok(self
            .known
            .iter()
            .filter(|(symbol, _)| symbol.to_uppercase().starts_with(&query.to_uppercase()))
            .map(|(symbol, meta)| SearchQuote {
                symbol: symbol.clone(),
                short_name: None,
                long_name: meta.long_name.clone(),
                exchange: meta.exchange.clone(),
                quote_type: Some("EQUITY".to_string()),
                sector: meta.sector.clone(),
            })
            .collect())
    }
}

/// Digest cache backend whose writes always fail
pub struct BrokenCacheRepo;

#[async_trait]
impl DigestCacheRepository for BrokenCacheRepo {
    async fn fetch(&self, _ticker_id: i64, _lang: Lang) -> Result<Option<CacheEntry>, StoreError> {
        Ok(None)
    }

    async fn store(&self, _entry: &CacheEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("cache table locked".to_string()))
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub llm: Arc<ScriptedLlm>,
    pub source: Arc<StaticSource>,
    pub state: AppState,
}

pub fn harness(llm: ScriptedLlm, fetched: Vec<RawArticle>) -> Harness {
    let store = MemoryStore::new();
    let cache: Arc<dyn DigestCacheRepository> = Arc::new(store.clone());
    build(store, cache, llm, fetched)
}

pub fn harness_with_cache(
    llm: ScriptedLlm,
    fetched: Vec<RawArticle>,
    cache: Arc<dyn DigestCacheRepository>,
) -> Harness {
    build(MemoryStore::new(), cache, llm, fetched)
}

fn build(
    store: MemoryStore,
    cache: Arc<dyn DigestCacheRepository>,
    llm: ScriptedLlm,
    fetched: Vec<RawArticle>,
) -> Harness {
    let config = Arc::new(AppConfig::from_lookup(|_| None).expect("default config"));
    let llm = Arc::new(llm);
    let source = Arc::new(StaticSource::new(fetched));
    let market_data: Arc<dyn MarketDataProvider> =
        Arc::new(StubMarketData::default().with("AAPL", "Apple Inc.").with("TSLA", "Tesla, Inc."));

    let service = LlmService::new(llm.clone(), llm.clone());
    let orchestrator = DigestOrchestrator::new(
        TickerResolver::new(Arc::new(store.clone()), market_data.clone()),
        ArticleFetcher::new(vec![source.clone() as Arc<dyn ArticleSource>]),
        ArticleStore::new(Arc::new(store.clone())),
        DigestCache::new(cache, config.cache.summary_ttl()),
        Summarizer::new(Arc::new(service)),
        config.clone(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        market_data,
        search_limiter: Arc::new(SearchRateLimiter::default()),
        config,
    };

    Harness {
        store,
        llm,
        source,
        state,
    }
}

/// `n` articles, newest first, one hour apart
pub fn articles(symbol: &str, n: usize) -> Vec<RawArticle> {
    let base = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
    (0..n)
        .map(|i| RawArticle {
            title: format!("{} headline {}", symbol, i),
            url: format!("https://news.example.com/{}/{}", symbol.to_lowercase(), i),
            source: "Reuters".to_string(),
            published_at: Some(base - Duration::hours(i as i64)),
            raw_content: format!("{} body {}", symbol, i),
        })
        .collect()
}

/// Well-formed provider reply with `bullets` summary points
pub fn digest_reply(bullets: usize, score: f64, label: &str) -> String {
    let summary: Vec<_> = (0..bullets)
        .map(|i| json!({ "point": format!("Point {}", i), "quote": format!("quote {}", i) }))
        .collect();
    json!({
        "summary": summary,
        "sentiment_score": score,
        "sentiment_label": label,
    })
    .to_string()
}
