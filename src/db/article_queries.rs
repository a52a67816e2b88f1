use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::{RawArticle, StoredArticle};

/// Batch upsert keyed on `url`. Existing rows take the new ticker, title,
/// source, publish time and content; `id` and `created_at` are kept.
pub async fn upsert_articles(
    pool: &PgPool,
    ticker_id: i64,
    articles: &[RawArticle],
) -> Result<u64, sqlx::Error> {
    if articles.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO news_articles (ticker_id, title, url, source, published_at, raw_content) ",
    );

    builder.push_values(articles, |mut row, article| {
        row.push_bind(ticker_id)
            .push_bind(&article.title)
            .push_bind(&article.url)
            .push_bind(&article.source)
            .push_bind(article.published_at)
            .push_bind(&article.raw_content);
    });

    builder.push(
        r#"
        ON CONFLICT (url)
        DO UPDATE SET
            ticker_id = EXCLUDED.ticker_id,
            title = EXCLUDED.title,
            source = EXCLUDED.source,
            published_at = EXCLUDED.published_at,
            raw_content = EXCLUDED.raw_content
        "#,
    );

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn fetch_recent_articles(
    pool: &PgPool,
    ticker_id: i64,
    limit: i64,
) -> Result<Vec<StoredArticle>, sqlx::Error> {
    sqlx::query_as::<_, StoredArticle>(
        r#"
        SELECT id, ticker_id, title, url, source, published_at, raw_content, created_at
        FROM news_articles
        WHERE ticker_id = $1
        ORDER BY published_at DESC NULLS LAST, id DESC
        LIMIT $2
        "#,
    )
    .bind(ticker_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}
