use crate::config::Settings;
use crate::providers::NewsProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_PATH: &str = "/v1/finance/search";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const NEWS_COUNT: usize = 10;

/// Wire shape of one article as returned by the news provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(alias = "uuid")]
    pub id: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    #[serde(alias = "publisher")]
    pub source: Option<String>,
    #[serde(alias = "link")]
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Epoch-seconds variant some feeds use instead of `published_at`.
    #[serde(default, rename = "providerPublishTime")]
    pub provider_publish_time: Option<i64>,
    #[serde(alias = "thumbnail")]
    pub image: Option<ImageRef>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

impl NewsArticle {
    /// Publication timestamp with the epoch fallback applied.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published_at.or_else(|| {
            self.provider_publish_time
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        })
    }
}

/// Either a bare URL or a thumbnail payload with multiple resolutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Thumbnail(Thumbnail),
}

impl ImageRef {
    /// Direct URL if present, otherwise the widest available resolution.
    pub fn resolve(&self) -> Option<String> {
        match self {
            ImageRef::Url(url) => Some(url.clone()),
            ImageRef::Thumbnail(thumb) => thumb
                .url
                .clone()
                .filter(|u| !u.is_empty())
                .or_else(|| {
                    thumb
                        .resolutions
                        .iter()
                        .max_by_key(|r| r.width.unwrap_or(0))
                        .map(|r| r.url.clone())
                }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: Option<String>,
    #[serde(default)]
    pub resolutions: Vec<ThumbnailResolution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailResolution {
    pub url: String,
    pub width: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<NewsArticle>,
}

/// News-by-symbol client against the Yahoo Finance search endpoint.
#[derive(Debug, Clone)]
pub struct YahooNewsClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooNewsClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .news_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout_secs = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build news http client")?;

        Ok(Self { http, base_url })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), DEFAULT_PATH)
    }
}

#[async_trait::async_trait]
impl NewsProvider for YahooNewsClient {
    async fn fetch_news(&self, symbol: &str) -> Result<Vec<NewsArticle>> {
        let res = self
            .http
            .get(self.url())
            .query(&[
                ("q", symbol),
                ("newsCount", &NEWS_COUNT.to_string()),
                ("quotesCount", "0"),
            ])
            .send()
            .await
            .with_context(|| format!("news request failed for {symbol}"))?;

        let status = res.status();
        anyhow::ensure!(status.is_success(), "news provider HTTP {status} for {symbol}");

        let parsed: SearchResponse = res
            .json()
            .await
            .with_context(|| format!("failed to parse news response for {symbol}"))?;
        Ok(parsed.news)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_articles_with_field_aliases() {
        let v = json!({
            "news": [
                {
                    "uuid": "abc-123",
                    "title": "Apple beats estimates",
                    "publisher": "Newswire",
                    "link": "https://example.com/a",
                    "providerPublishTime": 1700000000,
                    "type": "STORY",
                    "thumbnail": {
                        "resolutions": [
                            {"url": "https://img/s.jpg", "width": 140},
                            {"url": "https://img/l.jpg", "width": 1280}
                        ]
                    }
                }
            ]
        });

        let parsed: SearchResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.news.len(), 1);
        let article = &parsed.news[0];
        assert_eq!(article.id, "abc-123");
        assert_eq!(article.source.as_deref(), Some("Newswire"));
        assert_eq!(
            article.published().unwrap().timestamp(),
            1_700_000_000
        );
        assert_eq!(
            article.image.as_ref().unwrap().resolve().as_deref(),
            Some("https://img/l.jpg")
        );
    }

    #[test]
    fn published_at_takes_precedence_over_epoch() {
        let v = json!({
            "id": "n1",
            "published_at": "2026-08-01T10:00:00Z",
            "providerPublishTime": 1500000000
        });
        let article: NewsArticle = serde_json::from_value(v).unwrap();
        assert_eq!(
            article.published().unwrap().to_rfc3339(),
            "2026-08-01T10:00:00+00:00"
        );
    }

    #[test]
    fn direct_image_url_wins() {
        let image = ImageRef::Url("https://img/direct.jpg".to_string());
        assert_eq!(image.resolve().as_deref(), Some("https://img/direct.jpg"));
    }

    #[test]
    fn empty_response_parses_to_no_articles() {
        let parsed: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.news.is_empty());
    }
}
