use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::models::{CacheEntry, DigestResult, Lang};
use crate::store::DigestCacheRepository;

/// Cache-aside store for computed digests, keyed by (ticker_id, lang).
///
/// Neither operation fails: a read error counts as a miss and a write error
/// is logged and dropped, since the digest in hand is still valid to serve.
pub struct DigestCache {
    repo: Arc<dyn DigestCacheRepository>,
    ttl: Duration,
}

impl DigestCache {
    pub fn new(repo: Arc<dyn DigestCacheRepository>, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub async fn get(&self, ticker_id: i64, lang: Lang) -> Option<DigestResult> {
        self.get_at(ticker_id, lang, Utc::now()).await
    }

    async fn get_at(&self, ticker_id: i64, lang: Lang, now: DateTime<Utc>) -> Option<DigestResult> {
        let entry = match self.repo.fetch(ticker_id, lang).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                info!("No cached digest for ticker {} ({})", ticker_id, lang);
                return None;
            }
            Err(e) => {
                warn!("Digest cache read failed for ticker {} ({}), treating as miss: {}", ticker_id, lang, e);
                return None;
            }
        };

        if is_fresh(entry.created_at, now, self.ttl) {
            info!("Found cached digest for ticker {} ({})", ticker_id, lang);
            Some(entry.digest)
        } else {
            info!("Cached digest for ticker {} ({}) is stale", ticker_id, lang);
            None
        }
    }

    /// The entry's timestamp is the digest's own `created_at`
    pub async fn put(&self, ticker_id: i64, lang: Lang, digest: &DigestResult) {
        let entry = CacheEntry {
            ticker_id,
            lang,
            digest: digest.clone(),
            created_at: digest.created_at,
        };

        match self.repo.store(&entry).await {
            Ok(()) => info!("Cached digest for ticker {} ({})", ticker_id, lang),
            Err(e) => warn!("Failed to cache digest for ticker {} ({}), ignoring: {}", ticker_id, lang, e),
        }
    }
}

/// Valid strictly before `ttl` has elapsed; an entry exactly `ttl` old is stale
fn is_fresh(created_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now - created_at < ttl
}
