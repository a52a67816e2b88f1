use axum::http::HeaderValue;
use axum::Router;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::routes::{health, news, tickers};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/v1/news", news::router())
        .nest("/v1/tickers", tickers::router())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
}
