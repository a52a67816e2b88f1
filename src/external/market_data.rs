use async_trait::async_trait;
use thiserror::Error;

/// Company metadata used to register a ticker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickerMetadata {
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
}

impl TickerMetadata {
    /// Long name preferred, short name as fallback; blank names count as missing
    pub fn display_name(&self) -> Option<&str> {
        [self.long_name.as_deref(), self.short_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }
}

/// A raw quote returned by the provider's symbol search
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchQuote {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub exchange: Option<String>,
    pub quote_type: Option<String>,
    pub sector: Option<String>,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Metadata for an exact symbol, `None` when the provider does not know it
    async fn lookup_ticker(&self, symbol: &str) -> Result<Option<TickerMetadata>, MarketDataError>;

    async fn search_tickers(&self, query: &str) -> Result<Vec<SearchQuote>, MarketDataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_long_name() {
        let meta = TickerMetadata {
            long_name: Some("Apple Inc.".into()),
            short_name: Some("Apple".into()),
            ..Default::default()
        };
        assert_eq!(meta.display_name(), Some("Apple Inc."));
    }

    #[test]
    fn test_display_name_skips_blank() {
        let meta = TickerMetadata {
            long_name: Some("  ".into()),
            short_name: Some("Apple".into()),
            ..Default::default()
        };
        assert_eq!(meta.display_name(), Some("Apple"));
        assert_eq!(TickerMetadata::default().display_name(), None);
    }
}
