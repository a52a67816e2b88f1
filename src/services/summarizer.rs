//! Ticker-level digest generation.
//!
//! A batch of up to [`MAX_ARTICLES`] articles is folded into one prompt and
//! sent in a single provider call. The response must be a JSON object; it is
//! validated and normalized before it becomes a [`DigestResult`].

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::ProviderKind;
use crate::errors::SummarizeError;
use crate::models::{ArticleInput, DigestResult, Lang, SentimentLabel, SummaryPoint};
use crate::services::llm_service::{Credentials, LlmService};

pub const MAX_ARTICLES: usize = 10;
pub const MAX_CONTENT_CHARS: usize = 500;
pub const MAX_SUMMARY_BULLETS: usize = 10;

pub struct Summarizer {
    llm: Arc<LlmService>,
}

impl Summarizer {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self { llm }
    }

    pub async fn summarize(
        &self,
        symbol: &str,
        company_name: &str,
        articles: &[ArticleInput],
        lang: Lang,
        provider: ProviderKind,
        credentials: &Credentials,
    ) -> Result<DigestResult, SummarizeError> {
        if articles.is_empty() {
            return Err(SummarizeError::Validation(
                "at least one article is required".to_string(),
            ));
        }

        let target = &articles[..articles.len().min(MAX_ARTICLES)];
        let prompt = build_prompt(symbol, company_name, target, lang);

        info!(
            "Summarizing {}: articles={}, lang={}, provider={}",
            symbol,
            target.len(),
            lang,
            provider
        );

        let completion = self.llm.call(provider, &prompt, credentials).await?;
        let parsed = parse_llm_response(&completion.text)?;
        let (summary, sentiment_score, sentiment_label) = validate_digest(&parsed)?;

        info!(
            "Digest for {} ready: {} bullets, sentiment {} ({})",
            symbol,
            summary.len(),
            sentiment_score,
            sentiment_label
        );

        Ok(DigestResult {
            summary,
            sentiment_score,
            sentiment_label,
            model_version: completion.model,
            article_ids: target.iter().map(|a| a.id).collect(),
            article_count: target.len(),
            created_at: Utc::now(),
        })
    }
}

/// First `max_chars` characters, never splitting a character
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub(crate) fn build_prompt(
    symbol: &str,
    company_name: &str,
    articles: &[ArticleInput],
    lang: Lang,
) -> String {
    let lang_instruction = match lang {
        Lang::Ko => "Write every \"point\" in Korean (한국어로 작성하세요).",
        Lang::En => "Write every \"point\" in English.",
    };

    let articles_block: String = articles
        .iter()
        .enumerate()
        .map(|(i, article)| {
            format!(
                "[Article {}]\nTitle: {}\nSource: {}\nContent: {}\n\n",
                i + 1,
                article.title,
                article.source,
                truncate_chars(&article.content, MAX_CONTENT_CHARS)
            )
        })
        .collect();

    format!(
        r#"You are a financial news analyst.

Below are the {count} most recent news articles about {symbol} ({company_name}).

## Instructions
1. Synthesize the articles as a whole into the key insights that matter to {symbol} investors, as bullet points.
2. Order the bullets by importance to an investor and never exceed {max_bullets} bullets.
3. Merge points repeated across articles into a single bullet.
4. Leave out general market commentary that is not directly about {symbol}.
5. Score the overall sentiment of the news flow from -1.0 (very negative) to +1.0 (very positive).
6. {lang_instruction}

## Response format (output a single JSON object and nothing else)
{{
  "summary": [
    {{"point": "first bullet", "quote": "verbatim excerpt from the source article supporting it"}},
    {{"point": "second bullet", "quote": "verbatim excerpt from the source article supporting it"}}
  ],
  "sentiment_score": 0.00,
  "sentiment_label": "Positive | Neutral | Negative"
}}

## Articles
{articles_block}"#,
        count = articles.len(),
        symbol = symbol,
        company_name = company_name,
        max_bullets = MAX_SUMMARY_BULLETS,
        lang_instruction = lang_instruction,
        articles_block = articles_block,
    )
}

/// Remove a surrounding Markdown code fence (with an optional `json` tag)
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    let rest = match rest.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &rest[4..],
        _ => rest,
    };

    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

pub(crate) fn parse_llm_response(raw: &str) -> Result<Value, SummarizeError> {
    let body = strip_code_fence(raw);
    serde_json::from_str::<Value>(body).map_err(|e| {
        error!("Failed to parse LLM response as JSON: {}\nRaw text: {}", e, body);
        SummarizeError::Validation(format!("LLM response is not valid JSON ({}): {}", e, body))
    })
}

/// Apply the output rules: at most 10 bullets, each with a non-empty point;
/// score clamped to [-1, 1] and rounded to 2 decimals; label derived from
/// the score when missing or unrecognized.
pub(crate) fn validate_digest(
    parsed: &Value,
) -> Result<(Vec<SummaryPoint>, f64, SentimentLabel), SummarizeError> {
    let raw_bullets = parsed
        .get("summary")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let summary: Vec<SummaryPoint> = raw_bullets
        .iter()
        .take(MAX_SUMMARY_BULLETS)
        .filter_map(|bullet| {
            let point = bullet.get("point")?.as_str()?.trim();
            if point.is_empty() {
                return None;
            }
            let quote = bullet
                .get("quote")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(SummaryPoint {
                point: point.to_string(),
                quote: quote.to_string(),
            })
        })
        .collect();

    if summary.is_empty() {
        return Err(SummarizeError::Validation(
            "LLM returned no usable summary points".to_string(),
        ));
    }

    let raw_score = match parsed.get("sentiment_score") {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        Some(_) => f64::NAN,
    };
    if !raw_score.is_finite() {
        return Err(SummarizeError::Validation(format!(
            "sentiment_score is not a finite number: {}",
            parsed.get("sentiment_score").cloned().unwrap_or(Value::Null)
        )));
    }

    // The label follows the clamped score; rounding only applies to the output
    let clamped = raw_score.clamp(-1.0, 1.0);
    let score = (clamped * 100.0).round() / 100.0;

    let label = match parsed
        .get("sentiment_label")
        .and_then(Value::as_str)
        .and_then(SentimentLabel::parse_exact)
    {
        Some(label) => label,
        None => {
            let derived = SentimentLabel::from_score(clamped);
            warn!(
                "Invalid sentiment_label {:?}, derived {} from score {}",
                parsed.get("sentiment_label"),
                derived,
                score
            );
            derived
        }
    };

    Ok((summary, score, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LlmError;
    use crate::services::llm_service::{LlmBackend, LlmCompletion};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Returns a canned response and remembers the last prompt
    struct ScriptedBackend {
        response: Result<String, ()>,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedBackend {
        fn ok(text: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(text.into()),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn call(&self, prompt: &str, _credentials: &Credentials) -> Result<LlmCompletion, LlmError> {
            *self.last_prompt.lock() = Some(prompt.to_string());
            match &self.response {
                Ok(text) => Ok(LlmCompletion {
                    text: text.clone(),
                    model: "test-model".to_string(),
                }),
                Err(()) => Err(LlmError::ApiError("HTTP 500: boom".to_string())),
            }
        }
    }

    fn summarizer_with(backend: Arc<ScriptedBackend>) -> Summarizer {
        Summarizer::new(Arc::new(LlmService::new(backend.clone(), backend)))
    }

    fn articles(n: usize) -> Vec<ArticleInput> {
        (1..=n as i64)
            .map(|id| ArticleInput {
                id,
                title: format!("Headline {}", id),
                source: "Reuters".to_string(),
                content: format!("Body of article {}", id),
            })
            .collect()
    }

    fn bullets(n: usize) -> Vec<Value> {
        (1..=n)
            .map(|i| json!({ "point": format!("point {}", i), "quote": format!("quote {}", i) }))
            .collect()
    }

    async fn run(backend: Arc<ScriptedBackend>, input: &[ArticleInput]) -> Result<DigestResult, SummarizeError> {
        summarizer_with(backend)
            .summarize("AAPL", "Apple Inc.", input, Lang::En, ProviderKind::Claude, &Credentials::default())
            .await
    }

    #[tokio::test]
    async fn test_empty_articles_is_validation_error() {
        let backend = ScriptedBackend::ok("{}");
        let result = run(backend.clone(), &[]).await;
        assert!(matches!(result, Err(SummarizeError::Validation(_))));
        assert!(backend.last_prompt.lock().is_none(), "provider must not be called");
    }

    #[tokio::test]
    async fn test_score_is_clamped_and_label_derived() {
        let response = json!({ "summary": bullets(2), "sentiment_score": 5.0, "sentiment_label": "Great" });
        let digest = run(ScriptedBackend::ok(response.to_string()), &articles(3)).await.unwrap();

        assert_eq!(digest.sentiment_score, 1.0);
        assert_eq!(digest.sentiment_label, SentimentLabel::Positive);
        assert_eq!(digest.model_version, "test-model");
    }

    #[tokio::test]
    async fn test_score_is_rounded_to_two_decimals() {
        let response = json!({ "summary": bullets(1), "sentiment_score": -0.4567, "sentiment_label": "Negative" });
        let digest = run(ScriptedBackend::ok(response.to_string()), &articles(1)).await.unwrap();
        assert_eq!(digest.sentiment_score, -0.46);
    }

    #[tokio::test]
    async fn test_provided_label_is_kept_when_valid() {
        let response = json!({ "summary": bullets(1), "sentiment_score": 0.9, "sentiment_label": "Neutral" });
        let digest = run(ScriptedBackend::ok(response.to_string()), &articles(1)).await.unwrap();
        assert_eq!(digest.sentiment_label, SentimentLabel::Neutral);
    }

    #[tokio::test]
    async fn test_missing_score_defaults_to_neutral() {
        let response = json!({ "summary": bullets(1) });
        let digest = run(ScriptedBackend::ok(response.to_string()), &articles(1)).await.unwrap();
        assert_eq!(digest.sentiment_score, 0.0);
        assert_eq!(digest.sentiment_label, SentimentLabel::Neutral);
    }

    #[tokio::test]
    async fn test_summary_is_capped_at_ten() {
        let response = json!({ "summary": bullets(12), "sentiment_score": 0.1 });
        let digest = run(ScriptedBackend::ok(response.to_string()), &articles(2)).await.unwrap();
        assert_eq!(digest.summary.len(), 10);
        assert_eq!(digest.summary[0].point, "point 1");
        assert_eq!(digest.summary[9].point, "point 10");
    }

    #[tokio::test]
    async fn test_entries_without_point_are_dropped() {
        let response = json!({
            "summary": [
                { "point": "", "quote": "q" },
                { "quote": "orphan" },
                "just a string",
                { "point": "kept" }
            ],
            "sentiment_score": 0.0
        });
        let digest = run(ScriptedBackend::ok(response.to_string()), &articles(1)).await.unwrap();
        assert_eq!(digest.summary, vec![SummaryPoint { point: "kept".into(), quote: "".into() }]);
    }

    #[tokio::test]
    async fn test_no_usable_points_is_validation_error() {
        let response = json!({ "summary": [{ "point": "" }], "sentiment_score": 0.3 });
        let result = run(ScriptedBackend::ok(response.to_string()), &articles(1)).await;
        assert!(matches!(result, Err(SummarizeError::Validation(_))));
    }

    #[tokio::test]
    async fn test_undecodable_response_carries_text() {
        let result = run(ScriptedBackend::ok("Sorry, I cannot help with that."), &articles(1)).await;
        match result {
            Err(SummarizeError::Validation(msg)) => assert!(msg.contains("Sorry, I cannot help")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let result = run(ScriptedBackend::failing(), &articles(1)).await;
        assert!(matches!(result, Err(SummarizeError::Provider(LlmError::ApiError(_)))));
    }

    #[tokio::test]
    async fn test_only_first_ten_articles_are_used() {
        let backend = ScriptedBackend::ok(json!({ "summary": bullets(1) }).to_string());
        let digest = run(backend.clone(), &articles(13)).await.unwrap();

        assert_eq!(digest.article_count, 10);
        assert_eq!(digest.article_ids, (1..=10).collect::<Vec<i64>>());

        let prompt = backend.last_prompt.lock().clone().unwrap();
        assert!(prompt.contains("Headline 10"));
        assert!(!prompt.contains("Headline 11"));
    }

    #[tokio::test]
    async fn test_fenced_response_parses_like_bare_json() {
        let bare = json!({ "summary": bullets(3), "sentiment_score": -0.25, "sentiment_label": "Negative" }).to_string();
        let fenced = format!("```json\n{}\n```", bare);

        let a = run(ScriptedBackend::ok(bare), &articles(2)).await.unwrap();
        let b = run(ScriptedBackend::ok(fenced), &articles(2)).await.unwrap();

        assert_eq!(a.summary, b.summary);
        assert_eq!(a.sentiment_score, b.sentiment_score);
        assert_eq!(a.sentiment_label, b.sentiment_label);
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```JSON {\"a\":1} ```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```\n"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```json\n{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_label_boundaries() {
        let check = |score: f64| {
            let (_, s, label) = validate_digest(&json!({ "summary": bullets(1), "sentiment_score": score })).unwrap();
            (s, label)
        };
        assert_eq!(check(0.2), (0.2, SentimentLabel::Positive));
        assert_eq!(check(-0.2), (-0.2, SentimentLabel::Negative));
        assert_eq!(check(0.0), (0.0, SentimentLabel::Neutral));
        assert_eq!(check(-7.0), (-1.0, SentimentLabel::Negative));
    }

    #[test]
    fn test_label_derived_before_rounding() {
        let check = |score: f64| {
            let (_, s, label) = validate_digest(&json!({ "summary": bullets(1), "sentiment_score": score })).unwrap();
            (s, label)
        };
        assert_eq!(check(0.196), (0.2, SentimentLabel::Neutral));
        assert_eq!(check(-0.197), (-0.2, SentimentLabel::Neutral));
    }

    #[test]
    fn test_non_numeric_score_is_rejected() {
        let result = validate_digest(&json!({ "summary": bullets(1), "sentiment_score": "bullish" }));
        assert!(matches!(result, Err(SummarizeError::Validation(_))));

        let (_, score, _) = validate_digest(&json!({ "summary": bullets(1), "sentiment_score": "0.456" })).unwrap();
        assert_eq!(score, 0.46);
    }

    #[test]
    fn test_prompt_truncates_content_by_characters() {
        let long = "가".repeat(800);
        let input = vec![ArticleInput {
            id: 1,
            title: "T".into(),
            source: "S".into(),
            content: long,
        }];
        let prompt = build_prompt("005930", "Samsung", &input, Lang::Ko);

        assert!(prompt.contains(&"가".repeat(500)));
        assert!(!prompt.contains(&"가".repeat(501)));
        assert!(prompt.contains("Korean"));
    }

    #[test]
    fn test_prompt_mentions_rules() {
        let prompt = build_prompt("AAPL", "Apple Inc.", &articles(2), Lang::En);
        assert!(prompt.contains("AAPL (Apple Inc.)"));
        assert!(prompt.contains("never exceed 10 bullets"));
        assert!(prompt.contains("-1.0"));
        assert!(prompt.contains("single JSON object"));
        assert!(prompt.contains("[Article 2]"));
        assert!(prompt.contains("English"));
    }
}
