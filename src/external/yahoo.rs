use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::external::article_source::{ArticleSource, SourceError};
use crate::external::market_data::{MarketDataError, MarketDataProvider, SearchQuote, TickerMetadata};
use crate::models::RawArticle;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_PUBLISHER: &str = "Yahoo Finance";
const SEARCH_QUOTES_COUNT: u32 = 10;
/// ISO-8601 without an offset, read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Yahoo Finance search endpoint: primary news source, ticker metadata and
/// symbol search all come from `/v1/finance/search`.
pub struct YahooFinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn search(
        &self,
        query: &str,
        quotes_count: u32,
        news_count: u32,
    ) -> Result<SearchResponse, MarketDataError> {
        let url = format!("{}/v1/finance/search", self.base_url);

        let resp = self
            .client
            .get(url)
            .query(&[
                ("q", query.to_string()),
                ("quotesCount", quotes_count.to_string()),
                ("newsCount", news_count.to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MarketDataError::RateLimited);
        }

        if !resp.status().is_success() {
            return Err(MarketDataError::BadResponse(format!(
                "Yahoo search returned status {}",
                resp.status()
            )));
        }

        resp.json::<SearchResponse>()
            .await
            .map_err(|e| MarketDataError::Parse(e.to_string()))
    }
}

// Only `quotes` and `news` are read; both stay untyped so one odd entry
// cannot fail the whole response.
#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<Value>,
    #[serde(default)]
    news: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WireQuote {
    symbol: String,
    shortname: Option<String>,
    longname: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
    sector: Option<String>,
}

impl From<WireQuote> for SearchQuote {
    fn from(q: WireQuote) -> Self {
        SearchQuote {
            symbol: q.symbol,
            short_name: q.shortname,
            long_name: q.longname,
            exchange: q.exchange,
            quote_type: q.quote_type,
            sector: q.sector,
        }
    }
}

fn parse_quotes(raw: Vec<Value>) -> Vec<SearchQuote> {
    raw.into_iter()
        .filter_map(|v| serde_json::from_value::<WireQuote>(v).ok())
        .map(SearchQuote::from)
        .collect()
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn lookup_ticker(&self, symbol: &str) -> Result<Option<TickerMetadata>, MarketDataError> {
        let response = self.search(symbol, SEARCH_QUOTES_COUNT, 0).await?;

        let metadata = parse_quotes(response.quotes)
            .into_iter()
            .find(|q| q.symbol.eq_ignore_ascii_case(symbol))
            .map(|q| TickerMetadata {
                long_name: q.long_name,
                short_name: q.short_name,
                exchange: q.exchange,
                sector: q.sector,
            });

        if metadata.is_none() {
            info!("Yahoo Finance has no exact match for {}", symbol);
        }
        Ok(metadata)
    }

    async fn search_tickers(&self, query: &str) -> Result<Vec<SearchQuote>, MarketDataError> {
        let response = self.search(query, SEARCH_QUOTES_COUNT, 0).await?;
        Ok(parse_quotes(response.quotes))
    }
}

#[async_trait]
impl ArticleSource for YahooFinanceClient {
    fn name(&self) -> &str {
        "yahoo-finance"
    }

    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<RawArticle>, SourceError> {
        let response = self
            .search(symbol, 0, limit as u32)
            .await
            .map_err(|e| match e {
                MarketDataError::Parse(msg) => SourceError::Parse(msg),
                MarketDataError::Network(msg) => SourceError::Network(msg),
                other => SourceError::BadResponse(other.to_string()),
            })?;

        Ok(parse_news_items(symbol, &response.news, limit))
    }
}

/// Parse a batch of news items, skipping the ones that are malformed
pub(crate) fn parse_news_items(symbol: &str, items: &[Value], limit: usize) -> Vec<RawArticle> {
    let mut articles = Vec::with_capacity(items.len().min(limit));

    for (i, item) in items.iter().enumerate() {
        match parse_news_item(item) {
            Ok(article) => articles.push(article),
            Err(reason) => warn!("Skipping Yahoo news item {} for {}: {}", i, symbol, reason),
        }
        if articles.len() >= limit {
            break;
        }
    }

    debug!("Parsed {} of {} Yahoo news items for {}", articles.len(), items.len(), symbol);
    articles
}

/// Items come in two shapes: the flat legacy layout (`title`, `link`,
/// `publisher`, `providerPublishTime`) and the newer one with everything
/// nested under `content`. Fields are taken from whichever is present.
pub(crate) fn parse_news_item(item: &Value) -> Result<RawArticle, String> {
    if !item.is_object() {
        return Err("item is not an object".to_string());
    }
    let content = item.get("content").filter(|c| c.is_object());

    let title = first_text(&[item.get("title"), content.and_then(|c| c.get("title"))])
        .ok_or_else(|| "missing title".to_string())?;

    let raw_content = first_text(&[
        content.and_then(|c| c.get("body")),
        content.and_then(|c| c.get("summary")),
        item.get("summary"),
    ])
    .unwrap_or_else(|| title.clone());

    // A timestamp that cannot be read leaves the publish time unknown
    let published_at = [
        item.get("providerPublishTime"),
        content.and_then(|c| c.get("pubDate")),
    ]
    .into_iter()
    .flatten()
    .find_map(|ts| match parse_timestamp(ts) {
        Ok(parsed) => parsed,
        Err(reason) => {
            debug!("Ignoring timestamp: {}", reason);
            None
        }
    });

    let url = first_text(&[
        item.get("link"),
        item.get("url"),
        content.and_then(|c| c.pointer("/canonicalUrl/url")),
        content.and_then(|c| c.pointer("/clickThroughUrl/url")),
    ])
    .unwrap_or_default();

    let source = first_text(&[
        item.get("publisher"),
        content.and_then(|c| c.pointer("/provider/displayName")),
    ])
    .unwrap_or_else(|| DEFAULT_PUBLISHER.to_string());

    Ok(RawArticle {
        title,
        url,
        source,
        published_at,
        raw_content,
    })
}

fn first_text(candidates: &[Option<&Value>]) -> Option<String> {
    candidates
        .iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Epoch seconds (number or digit string) or an ISO-8601 string, with or
/// without an offset. Zero and blank values mean "not set".
fn parse_timestamp(value: &Value) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let secs = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| format!("bad epoch timestamp {}", n))?;
            from_epoch(secs)
        }
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<i64>() {
                return from_epoch(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Ok(Some(dt.with_timezone(&Utc)));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| Some(naive.and_utc()))
                .ok_or_else(|| format!("bad ISO timestamp '{}'", s))
        }
        other => Err(format!("unsupported timestamp {}", other)),
    }
}

fn from_epoch(secs: i64) -> Result<Option<DateTime<Utc>>, String> {
    if secs == 0 {
        return Ok(None);
    }
    DateTime::from_timestamp(secs, 0)
        .map(Some)
        .ok_or_else(|| format!("epoch timestamp {} out of range", secs))
}
