pub mod article_queries;
pub mod digest_cache_queries;
pub mod ticker_queries;
