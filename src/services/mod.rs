pub mod article_fetcher;
pub mod article_store;
pub mod digest_cache;
pub mod digest_orchestrator;
pub mod llm_service;
pub mod rate_limiter;
pub mod summarizer;
pub mod ticker_resolver;
