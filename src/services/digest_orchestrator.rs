//! Per-request pipeline behind `GET /v1/news/:symbol`.
//!
//! resolve ticker, load or fetch articles, then serve the digest from cache
//! or generate it. Stages run sequentially; the only fallback is the one
//! inside [`ArticleFetcher`].

use std::sync::Arc;

use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{
    ArticleInput, ArticleOut, DigestOut, DigestResult, Lang, NewsDigestResponse, SentimentOut,
    StoredArticle, TickerRecord,
};
use crate::services::article_fetcher::ArticleFetcher;
use crate::services::article_store::ArticleStore;
use crate::services::digest_cache::DigestCache;
use crate::services::summarizer::Summarizer;
use crate::services::ticker_resolver::TickerResolver;

pub struct DigestOrchestrator {
    resolver: TickerResolver,
    fetcher: ArticleFetcher,
    store: ArticleStore,
    cache: DigestCache,
    summarizer: Summarizer,
    config: Arc<AppConfig>,
}

impl DigestOrchestrator {
    pub fn new(
        resolver: TickerResolver,
        fetcher: ArticleFetcher,
        store: ArticleStore,
        cache: DigestCache,
        summarizer: Summarizer,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            store,
            cache,
            summarizer,
            config,
        }
    }

    pub async fn get_digest(
        &self,
        symbol: &str,
        limit: usize,
        lang: Lang,
    ) -> Result<NewsDigestResponse, AppError> {
        let ticker = self.resolver.resolve(symbol).await?;
        let articles = self.load_articles(&ticker, limit).await?;

        let digest = match self.cache.get(ticker.id, lang).await {
            Some(cached) => cached,
            None => {
                let digest = self.generate(&ticker, &articles, lang).await?;
                self.cache.put(ticker.id, lang, &digest).await;
                digest
            }
        };

        Ok(build_response(&ticker, &articles, digest))
    }

    /// Stored articles first; the external fetch only runs when the ticker
    /// has nothing stored yet.
    async fn load_articles(
        &self,
        ticker: &TickerRecord,
        limit: usize,
    ) -> Result<Vec<StoredArticle>, AppError> {
        let stored = self.store.list(ticker.id, limit).await?;
        if !stored.is_empty() {
            info!("Using {} stored articles for {}", stored.len(), ticker.symbol);
            return Ok(stored);
        }

        info!("No stored articles for {}, fetching", ticker.symbol);
        let fetched = self.fetcher.fetch(&ticker.symbol, limit).await;
        let stored = self.store.upsert(ticker.id, fetched).await?;

        if stored.is_empty() {
            return Err(AppError::NoNews(ticker.symbol.clone()));
        }
        Ok(stored)
    }

    async fn generate(
        &self,
        ticker: &TickerRecord,
        articles: &[StoredArticle],
        lang: Lang,
    ) -> Result<DigestResult, AppError> {
        let provider = self.config.summarization.provider;
        let credentials = self.config.credentials_for(provider);

        let inputs: Vec<ArticleInput> = articles
            .iter()
            .map(|a| ArticleInput {
                id: a.id,
                title: a.title.clone(),
                source: a.source.clone(),
                content: a.raw_content.clone(),
            })
            .collect();

        self.summarizer
            .summarize(&ticker.symbol, &ticker.name, &inputs, lang, provider, &credentials)
            .await
            .map_err(|e| {
                error!("Digest generation failed for {} ({}): {}", ticker.symbol, lang, e);
                AppError::SummarizationFailed(e)
            })
    }
}

fn build_response(
    ticker: &TickerRecord,
    articles: &[StoredArticle],
    digest: DigestResult,
) -> NewsDigestResponse {
    let last_updated = articles
        .first()
        .map(|a| a.published_at.unwrap_or(a.created_at))
        .unwrap_or(digest.created_at);

    NewsDigestResponse {
        symbol: ticker.symbol.clone(),
        company_name: ticker.name.clone(),
        last_updated,
        digest: DigestOut {
            summary: digest.summary,
            sentiment: SentimentOut {
                score: digest.sentiment_score,
                label: digest.sentiment_label,
            },
            based_on_articles: digest.article_count,
        },
        articles: articles
            .iter()
            .map(|a| ArticleOut {
                id: a.id,
                title: a.title.clone(),
                source: a.source.clone(),
                url: a.url.clone(),
                published_at: a.published_at,
            })
            .collect(),
    }
}
