use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::models::{RawArticle, StoredArticle};
use crate::store::{ArticleRepository, StoreError};

/// Deduplicating article persistence on top of an [`ArticleRepository`]
pub struct ArticleStore {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleStore {
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// Upsert on url and return the newest `rows.len()` stored articles for
    /// the ticker. Articles without a url cannot be deduplicated and are
    /// dropped; repeated urls in one batch keep the last occurrence.
    pub async fn upsert(
        &self,
        ticker_id: i64,
        articles: Vec<RawArticle>,
    ) -> Result<Vec<StoredArticle>, StoreError> {
        let total = articles.len();
        let rows = dedupe_by_url(articles);

        if rows.len() < total {
            warn!(
                "Dropped {} of {} articles for ticker {} (missing or repeated url)",
                total - rows.len(),
                total,
                ticker_id
            );
        }

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        self.repo.upsert_many(ticker_id, &rows).await?;
        info!("Upserted {} articles for ticker {}", rows.len(), ticker_id);

        self.list(ticker_id, rows.len()).await
    }

    pub async fn list(&self, ticker_id: i64, limit: usize) -> Result<Vec<StoredArticle>, StoreError> {
        self.repo.list_recent(ticker_id, limit as i64).await
    }
}

fn dedupe_by_url(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<RawArticle> = Vec::with_capacity(articles.len());

    for mut article in articles {
        article.url = article.url.trim().to_string();
        if article.url.is_empty() {
            continue;
        }
        match position.get(&article.url) {
            Some(&idx) => rows[idx] = article,
            None => {
                position.insert(article.url.clone(), rows.len());
                rows.push(article);
            }
        }
    }

    rows
}
