use std::sync::Arc;

use crate::config::AppConfig;
use crate::external::market_data::MarketDataProvider;
use crate::services::digest_orchestrator::DigestOrchestrator;
use crate::services::rate_limiter::SearchRateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DigestOrchestrator>,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub search_limiter: Arc<SearchRateLimiter>,
    pub config: Arc<AppConfig>,
}
