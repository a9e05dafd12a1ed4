use crate::config::Settings;
use crate::providers::IdeasProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PATH: &str = "/v1/ideas";
const DEFAULT_RETRIES: u32 = 3;

/// Wire shape of one community trading idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaPost {
    pub id: String,
    pub ticker: String,
    pub category: String,
    pub title: String,
    pub author: Option<String>,
    pub rating: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub idea_url: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}

/// Ideas-by-category client against a JSON endpoint, with bounded retries.
#[derive(Debug, Clone)]
pub struct HttpJsonIdeasClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    path: String,
    retries: u32,
}

impl HttpJsonIdeasClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings
            .ideas_base_url
            .clone()
            .context("IDEAS_BASE_URL is required")?;
        let api_key = settings.ideas_api_key.clone();

        let timeout_secs = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("IDEAS_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        let path = std::env::var("IDEAS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PATH.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build ideas http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
            path,
            retries,
        })
    }

    fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn fetch_once(&self, category: &str) -> Result<Vec<IdeaPost>> {
        let mut req = self.http.get(self.url()).query(&[("category", category)]);
        if let Some(api_key) = &self.api_key {
            req = req.header("x-api-key", api_key);
        }

        let res = req
            .send()
            .await
            .with_context(|| format!("ideas request failed for category {category}"))?;

        let status = res.status();
        anyhow::ensure!(
            status.is_success(),
            "ideas provider HTTP {status} for category {category}"
        );

        let posts: Vec<IdeaPost> = res
            .json()
            .await
            .with_context(|| format!("failed to parse ideas response for category {category}"))?;

        for post in &posts {
            validate_post(post)?;
        }
        Ok(posts)
    }
}

#[async_trait::async_trait]
impl IdeasProvider for HttpJsonIdeasClient {
    async fn fetch_ideas(&self, category: &str) -> Result<Vec<IdeaPost>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(category).await {
                Ok(posts) => return Ok(posts),
                Err(err) => {
                    if attempt >= self.retries.max(1) {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, %category, ?backoff, error = %err, "ideas fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn validate_post(post: &IdeaPost) -> Result<()> {
    anyhow::ensure!(!post.id.trim().is_empty(), "idea id must be non-empty");
    anyhow::ensure!(
        !post.ticker.trim().is_empty(),
        "idea ticker must be non-empty"
    );
    anyhow::ensure!(!post.title.trim().is_empty(), "idea title must be non-empty");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_expected_wire_shape() {
        let v = json!([
            {
                "id": "idea-1",
                "ticker": "AAPL",
                "category": "stock",
                "title": "AAPL breakout setup",
                "author": "trader_x",
                "rating": "Long",
                "published_at": "2026-08-28T09:00:00Z",
                "idea_url": "https://example.com/ideas/idea-1",
                "image_url": null,
                "source_url": "https://example.com/AAPL"
            }
        ]);

        let posts: Vec<IdeaPost> = serde_json::from_value(v).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].ticker, "AAPL");
        assert_eq!(posts[0].rating.as_deref(), Some("Long"));
        assert!(validate_post(&posts[0]).is_ok());
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let post = IdeaPost {
            id: "  ".to_string(),
            ticker: "AAPL".to_string(),
            category: "stock".to_string(),
            title: "t".to_string(),
            author: None,
            rating: None,
            published_at: None,
            idea_url: "https://example.com".to_string(),
            image_url: None,
            source_url: None,
        };
        assert!(validate_post(&post).is_err());
    }
}
