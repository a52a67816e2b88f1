pub mod article_source;
pub mod market_data;
pub mod rss;
pub mod yahoo;
