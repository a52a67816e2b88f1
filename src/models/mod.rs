mod digest;
mod news;
mod ticker;

pub use digest::{
    ArticleInput, ArticleOut, CacheEntry, DigestOut, DigestResult, Lang, NewsDigestResponse,
    SentimentLabel, SentimentOut, SummaryPoint,
};
pub use news::{NewsQueryParams, RawArticle, StoredArticle};
pub use ticker::{CreateTicker, TickerMatch, TickerRecord, TickerSearchParams, TickerSearchResponse};
