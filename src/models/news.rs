use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An article as produced by a fetch source, before it has been persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub raw_content: String,
}

/// A persisted article row. `url` is unique across all tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct StoredArticle {
    pub id: i64,
    pub ticker_id: i64,
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: Option<DateTime<Utc>>,
    pub raw_content: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for `GET /v1/news/:symbol`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsQueryParams {
    /// Number of articles to return, 1..=20 (default: 10)
    pub limit: Option<i64>,
    /// Digest language, `ko` or `en` (default: `ko`)
    pub lang: Option<String>,
}
