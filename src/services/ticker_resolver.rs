use std::sync::Arc;

use tracing::info;

use crate::errors::AppError;
use crate::external::market_data::MarketDataProvider;
use crate::models::{CreateTicker, TickerRecord};
use crate::store::TickerRepository;

/// Maps a user-supplied symbol to a stored ticker, registering unseen
/// symbols from market-data metadata.
pub struct TickerResolver {
    repo: Arc<dyn TickerRepository>,
    market_data: Arc<dyn MarketDataProvider>,
}

impl TickerResolver {
    pub fn new(repo: Arc<dyn TickerRepository>, market_data: Arc<dyn MarketDataProvider>) -> Self {
        Self { repo, market_data }
    }

    pub async fn resolve(&self, symbol: &str) -> Result<TickerRecord, AppError> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::Validation("symbol must not be empty".to_string()));
        }

        if let Some(ticker) = self.repo.find_by_symbol(&symbol).await? {
            return Ok(ticker);
        }

        let metadata = self
            .market_data
            .lookup_ticker(&symbol)
            .await?
            .ok_or_else(|| AppError::TickerNotFound(symbol.clone()))?;

        let name = metadata
            .display_name()
            .ok_or_else(|| AppError::TickerNotFound(symbol.clone()))?
            .to_string();

        let ticker = self
            .repo
            .insert(CreateTicker {
                symbol: symbol.clone(),
                name,
                exchange: metadata.exchange,
                sector: metadata.sector,
            })
            .await?;

        info!("Registered new ticker {} ({}) with id {}", ticker.symbol, ticker.name, ticker.id);
        Ok(ticker)
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
