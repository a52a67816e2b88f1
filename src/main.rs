use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use news_digest_backend::app;
use news_digest_backend::config::AppConfig;
use news_digest_backend::external::article_source::ArticleSource;
use news_digest_backend::external::market_data::MarketDataProvider;
use news_digest_backend::external::rss::RssFeedSource;
use news_digest_backend::external::yahoo::YahooFinanceClient;
use news_digest_backend::logging::{init_logging, LoggingConfig};
use news_digest_backend::services::article_fetcher::ArticleFetcher;
use news_digest_backend::services::article_store::ArticleStore;
use news_digest_backend::services::digest_cache::DigestCache;
use news_digest_backend::services::digest_orchestrator::DigestOrchestrator;
use news_digest_backend::services::llm_service::LlmService;
use news_digest_backend::services::rate_limiter::SearchRateLimiter;
use news_digest_backend::services::summarizer::Summarizer;
use news_digest_backend::services::ticker_resolver::TickerResolver;
use news_digest_backend::state::AppState;
use news_digest_backend::store::{
    ArticleRepository, DigestCacheRepository, MemoryStore, PgStore, TickerRepository,
};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; NewsDigest/0.1)";

type Repositories = (
    Arc<dyn TickerRepository>,
    Arc<dyn ArticleRepository>,
    Arc<dyn DigestCacheRepository>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env()).map_err(|e| anyhow::anyhow!(e))?;

    let config = Arc::new(AppConfig::from_env().context("invalid configuration")?);
    tracing::info!(
        "Summarization: provider={}, model={}, max_tokens={}",
        config.summarization.provider,
        config.summarization.model,
        config.summarization.max_tokens
    );
    tracing::info!(
        "Cache TTLs: articles={}h, digests={}h",
        config.cache.article_ttl_hours,
        config.cache.summary_ttl_hours
    );

    let (tickers, articles, digests) = open_repositories(&config).await?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("failed to build HTTP client")?;

    let yahoo = Arc::new(YahooFinanceClient::new(client.clone()));
    let rss = Arc::new(RssFeedSource::new(client.clone(), config.rss_feeds.clone()));
    let market_data: Arc<dyn MarketDataProvider> = yahoo.clone();
    let sources: Vec<Arc<dyn ArticleSource>> = vec![yahoo as Arc<dyn ArticleSource>, rss];

    let llm = Arc::new(LlmService::from_config(client, &config.summarization));

    let orchestrator = DigestOrchestrator::new(
        TickerResolver::new(tickers, market_data.clone()),
        ArticleFetcher::new(sources),
        ArticleStore::new(articles),
        DigestCache::new(digests, config.cache.summary_ttl()),
        Summarizer::new(llm),
        config.clone(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        market_data,
        search_limiter: Arc::new(SearchRateLimiter::default()),
        config: config.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("News digest backend running at http://{}/", config.bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

async fn open_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
        return Ok(repositories(MemoryStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("Database connected and migrations applied");

    Ok(repositories(PgStore::new(pool)))
}

fn repositories<S>(store: S) -> Repositories
where
    S: TickerRepository + ArticleRepository + DigestCacheRepository + Clone + 'static,
{
    let tickers: Arc<dyn TickerRepository> = Arc::new(store.clone());
    let articles: Arc<dyn ArticleRepository> = Arc::new(store.clone());
    let digests: Arc<dyn DigestCacheRepository> = Arc::new(store);
    (tickers, articles, digests)
}
