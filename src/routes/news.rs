use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::errors::AppError;
use crate::models::{Lang, NewsDigestResponse, NewsQueryParams};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 20;

pub fn router() -> Router<AppState> {
    Router::new().route("/:symbol", get(get_news_digest))
}

async fn get_news_digest(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    params: Result<Query<NewsQueryParams>, QueryRejection>,
) -> Result<Json<NewsDigestResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let (limit, lang) = validate_params(&params)?;

    info!("GET /v1/news/{} - limit={}, lang={}", symbol, limit, lang);

    let response = state.orchestrator.get_digest(&symbol, limit, lang).await?;
    Ok(Json(response))
}

fn validate_params(params: &NewsQueryParams) -> Result<(usize, Lang), AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )));
    }

    let lang = match params.lang.as_deref() {
        None => Lang::default(),
        Some(raw) => raw.parse::<Lang>().map_err(AppError::Validation)?,
    };

    Ok((limit as usize, lang))
}
