use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, error, info};

use crate::config::RssFeed;
use crate::external::article_source::{ArticleSource, SourceError};
use crate::models::RawArticle;

/// Secondary article source: general market RSS/Atom feeds filtered down to
/// entries whose title mentions the symbol.
pub struct RssFeedSource {
    client: reqwest::Client,
    feeds: Vec<RssFeed>,
}

impl RssFeedSource {
    pub fn new(client: reqwest::Client, feeds: Vec<RssFeed>) -> Self {
        Self { client, feeds }
    }

    async fn fetch_feed(&self, feed: &RssFeed) -> Result<String, SourceError> {
        let response = self.client.get(&feed.url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::BadResponse(format!(
                "{} returned status {}",
                feed.name,
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ArticleSource for RssFeedSource {
    fn name(&self) -> &str {
        "rss"
    }

    async fn fetch(&self, symbol: &str, limit: usize) -> Result<Vec<RawArticle>, SourceError> {
        let mut articles = Vec::new();

        for feed in &self.feeds {
            match self.fetch_feed(feed).await {
                Ok(body) => {
                    let matched = parse_feed(&body, &feed.name, symbol);
                    debug!("{} entries in {} mention {}", matched.len(), feed.name, symbol);
                    articles.extend(matched);
                }
                Err(e) => error!("RSS feed {} failed: {}", feed.name, e),
            }
        }

        sort_by_recency(&mut articles);
        articles.truncate(limit);

        info!("Collected {} RSS articles for {}", articles.len(), symbol);
        Ok(articles)
    }
}

/// Newest first; entries without a publish time are treated as oldest
pub(crate) fn sort_by_recency(articles: &mut [RawArticle]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Parse RSS `<item>` and Atom `<entry>` elements, keeping the ones whose
/// title contains `symbol` (case-insensitive).
pub(crate) fn parse_feed(xml: &str, source_name: &str, symbol: &str) -> Vec<RawArticle> {
    let keyword = symbol.to_uppercase();
    let Ok(entry_re) = Regex::new(r"(?s)<(item|entry)\b[^>]*>(.*?)</(?:item|entry)>") else {
        return Vec::new();
    };

    entry_re
        .captures_iter(xml)
        .filter_map(|cap| {
            let is_atom = &cap[1] == "entry";
            let entry = &cap[2];

            let title = extract_tag(entry, "title").map(|t| clean_text(&t))?;
            if title.is_empty() || !title.to_uppercase().contains(&keyword) {
                return None;
            }

            let url = if is_atom {
                extract_attribute(entry, "link", "href")
                    .or_else(|| extract_tag(entry, "link"))
            } else {
                extract_tag(entry, "link")
            }
            .map(|u| clean_text(&u))
            .unwrap_or_default();

            let raw_content = ["description", "summary", "content:encoded", "content"]
                .iter()
                .filter_map(|tag| extract_tag(entry, tag))
                .map(|c| clean_text(&c))
                .find(|c| !c.is_empty())
                .unwrap_or_else(|| title.clone());

            let published_at = ["pubDate", "published", "updated", "dc:date"]
                .iter()
                .filter_map(|tag| extract_tag(entry, tag))
                .find_map(|raw| parse_feed_date(&clean_text(&raw)));

            Some(RawArticle {
                title,
                url,
                source: source_name.to_string(),
                published_at,
                raw_content,
            })
        })
        .collect()
}

/// RFC 2822 for RSS, RFC 3339 for Atom
fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{}(?:\s[^>]*)?>(.*?)</{}>", regex::escape(tag), regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

fn extract_attribute(xml: &str, tag: &str, attr: &str) -> Option<String> {
    let pattern = format!(r#"<{}\s[^>]*{}="([^"]+)""#, regex::escape(tag), regex::escape(attr));
    let re = Regex::new(&pattern).ok()?;
    re.captures(xml)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}

/// Unwrap CDATA, drop markup, decode the common entities and collapse whitespace
fn clean_text(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    if let Some(inner) = text
        .strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
    {
        text = inner.to_string();
    }

    let text = decode_entities(&text);
    let text = match Regex::new(r"<[^>]+>") {
        Ok(tag_re) => tag_re.replace_all(&text, " ").into_owned(),
        Err(_) => text,
    };
    let text = decode_entities(&text);

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
