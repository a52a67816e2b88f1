use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A resolved ticker. `symbol` is always stored uppercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TickerRecord {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
    pub sector: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateTicker {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
    pub sector: Option<String>,
}

/// One row of the ticker search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerMatch {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerSearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerSearchResponse {
    pub results: Vec<TickerMatch>,
}
