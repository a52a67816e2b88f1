use std::sync::Arc;

use tracing::{info, warn};

use crate::external::article_source::ArticleSource;
use crate::models::RawArticle;

/// Tries each source in order and returns the first non-empty batch.
///
/// A source that errors or comes back empty hands over to the next one. When
/// every source is exhausted the result is an empty list, never an error;
/// the caller decides whether that means "no news".
pub struct ArticleFetcher {
    sources: Vec<Arc<dyn ArticleSource>>,
}

impl ArticleFetcher {
    pub fn new(sources: Vec<Arc<dyn ArticleSource>>) -> Self {
        Self { sources }
    }

    pub async fn fetch(&self, symbol: &str, limit: usize) -> Vec<RawArticle> {
        for source in &self.sources {
            match source.fetch(symbol, limit).await {
                Ok(mut articles) if !articles.is_empty() => {
                    articles.truncate(limit);
                    info!(
                        "Fetched {} articles for {} from {}",
                        articles.len(),
                        symbol,
                        source.name()
                    );
                    return articles;
                }
                Ok(_) => {
                    info!("No articles for {} from {}, trying next source", symbol, source.name());
                }
                Err(e) => {
                    warn!("Source {} failed for {}: {}. Trying next source", source.name(), symbol, e);
                }
            }
        }

        warn!("All article sources exhausted for {}", symbol);
        Vec::new()
    }
}
