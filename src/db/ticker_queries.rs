use sqlx::PgPool;

use crate::models::{CreateTicker, TickerRecord};

pub async fn fetch_ticker_by_symbol(
    pool: &PgPool,
    symbol: &str,
) -> Result<Option<TickerRecord>, sqlx::Error> {
    sqlx::query_as::<_, TickerRecord>(
        r#"
        SELECT id, symbol, name, exchange, sector
        FROM tickers
        WHERE symbol = $1
        LIMIT 1
        "#,
    )
    .bind(symbol)
    .fetch_optional(pool)
    .await
}

/// Insert a ticker, returning the existing row if another request won the race.
/// The no-op update keeps `RETURNING` populated on conflict without touching
/// the stored metadata.
pub async fn insert_ticker(
    pool: &PgPool,
    ticker: &CreateTicker,
) -> Result<TickerRecord, sqlx::Error> {
    sqlx::query_as::<_, TickerRecord>(
        r#"
        INSERT INTO tickers (symbol, name, exchange, sector)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (symbol)
        DO UPDATE SET symbol = EXCLUDED.symbol
        RETURNING id, symbol, name, exchange, sector
        "#,
    )
    .bind(&ticker.symbol)
    .bind(&ticker.name)
    .bind(&ticker.exchange)
    .bind(&ticker.sector)
    .fetch_one(pool)
    .await
}
