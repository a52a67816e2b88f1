use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language a digest is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ko,
    En,
}

impl Lang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::Ko => "ko",
            Lang::En => "en",
        }
    }
}

impl Default for Lang {
    fn default() -> Self {
        Lang::Ko
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ko" => Ok(Lang::Ko),
            "en" => Ok(Lang::En),
            other => Err(format!("Unsupported lang '{}': must be 'ko' or 'en'", other)),
        }
    }
}

/// Overall tone of a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// Scores at or beyond ±0.2 are directional
    pub fn from_score(score: f64) -> Self {
        if score >= 0.2 {
            SentimentLabel::Positive
        } else if score <= -0.2 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    /// Exact, case-sensitive match against the three label names
    pub fn parse_exact(label: &str) -> Option<Self> {
        match label {
            "Positive" => Some(SentimentLabel::Positive),
            "Neutral" => Some(SentimentLabel::Neutral),
            "Negative" => Some(SentimentLabel::Negative),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
            SentimentLabel::Negative => write!(f, "Negative"),
        }
    }
}

/// One synthesized bullet and the excerpt backing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryPoint {
    pub point: String,
    pub quote: String,
}

/// A validated digest for one ticker in one language.
///
/// `article_count == article_ids.len()`, both counting only the articles
/// that were actually sent to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestResult {
    pub summary: Vec<SummaryPoint>,
    pub sentiment_score: f64,
    pub sentiment_label: SentimentLabel,
    pub model_version: String,
    pub article_ids: Vec<i64>,
    pub article_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A cached digest keyed by (ticker_id, lang)
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub ticker_id: i64,
    pub lang: Lang,
    pub digest: DigestResult,
    pub created_at: DateTime<Utc>,
}

/// Summarizer input built from a stored article
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleInput {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentOut {
    pub score: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestOut {
    pub summary: Vec<SummaryPoint>,
    pub sentiment: SentimentOut,
    pub based_on_articles: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleOut {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Response body of `GET /v1/news/:symbol`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsDigestResponse {
    pub symbol: String,
    pub company_name: String,
    pub last_updated: DateTime<Utc>,
    pub digest: DigestOut,
    pub articles: Vec<ArticleOut>,
}
