use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::external::market_data::MarketDataError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Ticker '{0}' not found")]
    TickerNotFound(String),
    #[error("No recent news for '{0}'")]
    NoNews(String),
    #[error("Summarization failed: {0}")]
    SummarizationFailed(#[source] SummarizeError),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("External error: {0}")]
    External(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::TickerNotFound(_) => (StatusCode::NOT_FOUND, "TICKER_NOT_FOUND"),
            AppError::NoNews(_) => (StatusCode::NOT_FOUND, "NO_NEWS"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::SummarizationFailed(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SUMMARIZATION_FAILED")
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            AppError::External(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message shown to clients. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            AppError::SummarizationFailed(_) => {
                "AI summary generation failed. Please try again later.".to_string()
            }
            AppError::RateLimited => "Too many requests. Please try again later.".to_string(),
            AppError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            AppError::Store(e) => error!("Store error: {}", e),
            AppError::SummarizationFailed(e) => error!("Summarization error: {}", e),
            AppError::External(msg) => error!("Upstream error: {}", msg),
            _ => {}
        }

        let body = Json(serde_json::json!({
            "error": {
                "code": code,
                "message": self.public_message(),
                "status": status.as_u16(),
            }
        }));

        if let AppError::RateLimited = self {
            let mut headers = HeaderMap::new();
            headers.insert("Retry-After", HeaderValue::from_static("60"));
            return (status, headers, body).into_response();
        }

        (status, body).into_response()
    }
}

impl From<MarketDataError> for AppError {
    fn from(value: MarketDataError) -> Self {
        AppError::External(value.to_string())
    }
}

/// Failures talking to an LLM backend
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for {0}")]
    MissingCredentials(&'static str),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("request timed out")]
    Timeout,
    #[error("rate limited by provider")]
    RateLimited,
    #[error("API error: {0}")]
    ApiError(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::NetworkError(e.to_string())
        }
    }
}

/// Summarizer failures. `Validation` covers bad input and unusable provider
/// output; `Provider` is the backend call itself failing.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("provider call failed: {0}")]
    Provider(#[from] LlmError),
}
