use async_trait::async_trait;
use thiserror::Error;

use crate::models::RawArticle;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// One link of the article fallback chain.
///
/// `Ok(vec![])` means the source answered but had nothing for the symbol;
/// `Err` means the source itself failed. The fetcher moves on in both cases
/// but logs them differently.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<RawArticle>, SourceError>;
}
