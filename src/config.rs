use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

use crate::services::llm_service::Credentials;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_RSS_FEEDS: &str = "MarketWatch=https://feeds.marketwatch.com/marketwatch/topstories/,\
Yahoo Finance=https://finance.yahoo.com/rss/";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Which LLM backend serves a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Claude,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::Gemini => "gemini",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude-haiku-4-5-20251001",
            ProviderKind::Gemini => "gemini-2.5-flash",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Ok(ProviderKind::Claude),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown provider '{}', expected 'claude' or 'gemini'", other)),
        }
    }
}

/// Model selection for one AI-backed feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureModelConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub max_tokens: u32,
}

impl FeatureModelConfig {
    /// Reads `{PREFIX}_PROVIDER`, `{PREFIX}_MODEL` and `{PREFIX}_MAX_TOKENS`
    fn from_lookup<F>(prefix: &str, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_key = format!("{}_PROVIDER", prefix);
        let provider = match lookup(&provider_key) {
            Some(raw) => raw
                .parse::<ProviderKind>()
                .map_err(|reason| ConfigError::invalid(&provider_key, &raw, reason))?,
            None => ProviderKind::Claude,
        };

        let model = lookup(&format!("{}_MODEL", prefix))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model().to_string());

        let tokens_key = format!("{}_MAX_TOKENS", prefix);
        let max_tokens = match lookup(&tokens_key) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::invalid(&tokens_key, &raw, "expected a positive integer")),
            },
            None => DEFAULT_MAX_TOKENS,
        };

        Ok(Self {
            provider,
            model,
            max_tokens,
        })
    }
}

/// Freshness windows, in hours
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub article_ttl_hours: f64,
    pub summary_ttl_hours: f64,
}

impl CacheConfig {
    pub fn summary_ttl(&self) -> chrono::Duration {
        hours_to_duration(self.summary_ttl_hours)
    }
}

fn hours_to_duration(hours: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((hours * 3_600_000.0).round() as i64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RssFeed {
    pub name: String,
    pub url: String,
}

/// Process-wide configuration, built once in `main` and shared read-only
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub summarization: FeatureModelConfig,
    pub cache: CacheConfig,
    pub rss_feeds: Vec<RssFeed>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", &bind_raw, e.to_string()))?;

        let cache = CacheConfig {
            article_ttl_hours: parse_hours(&lookup, "ARTICLE_TTL_HOURS", 1.0)?,
            summary_ttl_hours: parse_hours(&lookup, "SUMMARY_TTL_HOURS", 24.0)?,
        };

        let feeds_raw = non_empty("RSS_FEEDS").unwrap_or_else(|| DEFAULT_RSS_FEEDS.to_string());
        let rss_feeds = parse_feeds(&feeds_raw)?;

        let cors_origins = non_empty("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            bind_addr,
            anthropic_api_key: non_empty("ANTHROPIC_API_KEY"),
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            summarization: FeatureModelConfig::from_lookup("SUMMARIZATION", &lookup)?,
            cache,
            rss_feeds,
            cors_origins,
        })
    }

    /// API key for the given backend, if one is configured
    pub fn credentials_for(&self, provider: ProviderKind) -> Credentials {
        let api_key = match provider {
            ProviderKind::Claude => self.anthropic_api_key.clone(),
            ProviderKind::Gemini => self.gemini_api_key.clone(),
        };
        Credentials { api_key }
    }
}

fn parse_hours<F>(lookup: &F, key: &str, default: f64) -> Result<f64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(h) if h.is_finite() && h >= 0.0 => Ok(h),
            _ => Err(ConfigError::invalid(key, &raw, "expected a non-negative number of hours")),
        },
        None => Ok(default),
    }
}

/// `name=url` pairs separated by commas
fn parse_feeds(raw: &str) -> Result<Vec<RssFeed>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, url) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::invalid("RSS_FEEDS", entry, "expected name=url"))?;
            url::Url::parse(url.trim())
                .map_err(|e| ConfigError::invalid("RSS_FEEDS", entry, e.to_string()))?;
            Ok(RssFeed {
                name: name.trim().to_string(),
                url: url.trim().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(move |key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.summarization.provider, ProviderKind::Claude);
        assert_eq!(config.summarization.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.summarization.max_tokens, 1024);
        assert_eq!(config.cache.summary_ttl_hours, 24.0);
        assert_eq!(config.cache.article_ttl_hours, 1.0);
        assert_eq!(config.rss_feeds.len(), 2);
        assert_eq!(config.rss_feeds[0].name, "MarketWatch");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_gemini_uses_its_default_model() {
        let config = config_from(&[("SUMMARIZATION_PROVIDER", "Gemini")]).unwrap();
        assert_eq!(config.summarization.provider, ProviderKind::Gemini);
        assert_eq!(config.summarization.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_invalid_provider_is_rejected() {
        let err = config_from(&[("SUMMARIZATION_PROVIDER", "openai")]).unwrap_err();
        assert!(err.to_string().contains("SUMMARIZATION_PROVIDER"));
    }

    #[test]
    fn test_invalid_ttl_is_rejected() {
        assert!(config_from(&[("SUMMARY_TTL_HOURS", "-3")]).is_err());
        assert!(config_from(&[("SUMMARY_TTL_HOURS", "soon")]).is_err());
    }

    #[test]
    fn test_summary_ttl_duration() {
        let config = config_from(&[("SUMMARY_TTL_HOURS", "0.5")]).unwrap();
        assert_eq!(config.cache.summary_ttl(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_credentials_follow_provider() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "a-key"), ("GEMINI_API_KEY", "")]).unwrap();
        assert_eq!(config.credentials_for(ProviderKind::Claude).api_key.as_deref(), Some("a-key"));
        assert!(config.credentials_for(ProviderKind::Gemini).api_key.is_none());
    }

    #[test]
    fn test_custom_feeds() {
        let config = config_from(&[("RSS_FEEDS", "Reuters=https://example.com/rss")]).unwrap();
        assert_eq!(
            config.rss_feeds,
            vec![RssFeed { name: "Reuters".into(), url: "https://example.com/rss".into() }]
        );
        assert!(config_from(&[("RSS_FEEDS", "no-equals-sign")]).is_err());
    }
}
