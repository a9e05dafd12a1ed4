//! External data providers behind a uniform result contract.
//!
//! Each capability is an independent collaborator. The gateway converts any
//! provider error (timeout, HTTP failure, parse failure) into an explicit
//! `Fetched::Degraded` tag so the processor composes results by branching on
//! tags instead of intercepting errors.

pub mod ideas;
pub mod news;
pub mod sentiment;

use crate::domain::document::SentimentReading;
use std::sync::Arc;

pub use ideas::IdeaPost;
pub use news::NewsArticle;

#[async_trait::async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn fetch_sentiment(&self) -> anyhow::Result<SentimentReading>;
}

#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    /// News for one canonical symbol, most recent first.
    async fn fetch_news(&self, symbol: &str) -> anyhow::Result<Vec<NewsArticle>>;
}

#[async_trait::async_trait]
pub trait IdeasProvider: Send + Sync {
    /// Community trading ideas for one category (e.g. "stock", "crypto").
    async fn fetch_ideas(&self, category: &str) -> anyhow::Result<Vec<IdeaPost>>;
}

/// Result of one fetch slice. A degraded slice carries the reason and yields
/// no data; it never aborts the portfolio it belongs to.
#[derive(Debug, Clone)]
pub enum Fetched<T> {
    Data(T),
    Degraded(String),
}

/// Bundles the three fetch capabilities used by portfolio tasks.
#[derive(Clone)]
pub struct ProviderGateway {
    sentiment: Arc<dyn SentimentProvider>,
    news: Arc<dyn NewsProvider>,
    ideas: Arc<dyn IdeasProvider>,
}

impl ProviderGateway {
    pub fn new(
        sentiment: Arc<dyn SentimentProvider>,
        news: Arc<dyn NewsProvider>,
        ideas: Arc<dyn IdeasProvider>,
    ) -> Self {
        Self {
            sentiment,
            news,
            ideas,
        }
    }

    pub async fn sentiment(&self) -> Fetched<SentimentReading> {
        match self.sentiment.fetch_sentiment().await {
            Ok(reading) => Fetched::Data(reading),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "sentiment fetch degraded");
                Fetched::Degraded(format!("{err:#}"))
            }
        }
    }

    pub async fn news_for(&self, symbol: &str) -> Fetched<Vec<NewsArticle>> {
        match self.news.fetch_news(symbol).await {
            Ok(articles) => Fetched::Data(articles),
            Err(err) => {
                tracing::warn!(%symbol, error = %format!("{err:#}"), "news fetch degraded");
                Fetched::Degraded(format!("{err:#}"))
            }
        }
    }

    pub async fn ideas_for(&self, category: &str) -> Fetched<Vec<IdeaPost>> {
        match self.ideas.fetch_ideas(category).await {
            Ok(posts) => Fetched::Data(posts),
            Err(err) => {
                tracing::warn!(%category, error = %format!("{err:#}"), "ideas fetch degraded");
                Fetched::Degraded(format!("{err:#}"))
            }
        }
    }
}
