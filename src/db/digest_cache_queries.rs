use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, sqlx::FromRow)]
pub struct DigestCacheRow {
    pub ticker_id: i64,
    pub lang: String,
    pub digest: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn fetch_digest(
    pool: &PgPool,
    ticker_id: i64,
    lang: &str,
) -> Result<Option<DigestCacheRow>, sqlx::Error> {
    sqlx::query_as::<_, DigestCacheRow>(
        r#"
        SELECT ticker_id, lang, digest, created_at
        FROM news_digest_cache
        WHERE ticker_id = $1 AND lang = $2
        "#,
    )
    .bind(ticker_id)
    .bind(lang)
    .fetch_optional(pool)
    .await
}

pub async fn upsert_digest(
    pool: &PgPool,
    ticker_id: i64,
    lang: &str,
    digest: serde_json::Value,
    created_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO news_digest_cache (ticker_id, lang, digest, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (ticker_id, lang)
        DO UPDATE SET
            digest = EXCLUDED.digest,
            created_at = EXCLUDED.created_at
        "#,
    )
    .bind(ticker_id)
    .bind(lang)
    .bind(digest)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}
