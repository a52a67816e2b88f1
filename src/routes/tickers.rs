use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::external::market_data::SearchQuote;
use crate::models::{TickerMatch, TickerSearchParams, TickerSearchResponse};
use crate::state::AppState;

const MAX_QUERY_LEN: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new().route("/search", get(search_tickers))
}

async fn search_tickers(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Query(params): Query<TickerSearchParams>,
) -> Result<Json<TickerSearchResponse>, AppError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    let query_len = query.chars().count();
    if query_len == 0 || query_len > MAX_QUERY_LEN {
        return Err(AppError::Validation(format!(
            "q must be 1 to {} characters",
            MAX_QUERY_LEN
        )));
    }

    let ip = connect_info
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !state.search_limiter.check(ip) {
        warn!("Ticker search rate limit exceeded for {}", ip);
        return Err(AppError::RateLimited);
    }

    info!("GET /v1/tickers/search - q={}", query);

    let quotes = state.market_data.search_tickers(query).await?;
    Ok(Json(TickerSearchResponse {
        results: exact_equity_matches(query, quotes),
    }))
}

fn exact_equity_matches(query: &str, quotes: Vec<SearchQuote>) -> Vec<TickerMatch> {
    quotes
        .into_iter()
        .filter(|q| q.symbol.eq_ignore_ascii_case(query))
        .filter(|q| q.quote_type.as_deref() == Some("EQUITY"))
        .map(|q| TickerMatch {
            name: q.short_name.or(q.long_name).unwrap_or_default(),
            symbol: q.symbol,
            exchange: q.exchange,
        })
        .collect()
}
