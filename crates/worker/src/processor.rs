//! Per-portfolio unit of work: normalize symbols, fetch news and ideas,
//! filter/dedup/cap, assemble one document, classify the outcome.

use chrono::{Duration, Utc};
use pulse_core::domain::document::{NewsItem, PortfolioDocument, SentimentReading, TradingIdea};
use pulse_core::domain::outcome::TaskOutcome;
use pulse_core::domain::portfolio::Portfolio;
use pulse_core::normalize;
use pulse_core::providers::{Fetched, IdeaPost, NewsArticle, ProviderGateway};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// News entries retained per normalized symbol.
    pub max_news_per_symbol: usize,
    /// Trading ideas retained per portfolio, most recent first.
    pub max_ideas_per_portfolio: usize,
    /// Trailing eligibility window for news, in hours.
    pub news_window_hours: i64,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            max_news_per_symbol: 3,
            max_ideas_per_portfolio: 5,
            news_window_hours: 24,
        }
    }
}

impl ProcessorOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("MAX_NEWS_PER_SYMBOL") {
            if let Ok(n) = s.parse::<usize>() {
                out.max_news_per_symbol = n;
            }
        }

        if let Ok(s) = std::env::var("MAX_IDEAS_PER_PORTFOLIO") {
            if let Ok(n) = s.parse::<usize>() {
                out.max_ideas_per_portfolio = n;
            }
        }

        if let Ok(s) = std::env::var("NEWS_WINDOW_HOURS") {
            if let Ok(n) = s.parse::<i64>() {
                out.news_window_hours = n;
            }
        }

        out
    }
}

/// Result of processing one portfolio. A failed portfolio still carries a
/// document with empty collections unless the failure is structural.
#[derive(Debug)]
pub struct TaskReport {
    pub document: Option<PortfolioDocument>,
    pub outcome: TaskOutcome,
    pub degradations: Vec<String>,
}

pub async fn process(
    gateway: &ProviderGateway,
    options: &ProcessorOptions,
    portfolio: &Portfolio,
    sentiment: Option<&SentimentReading>,
) -> TaskReport {
    // Without an owner there is no storage path to publish to.
    let Some(user_id) = portfolio.user_id else {
        tracing::error!(
            portfolio_id = portfolio.portfolio_id,
            "portfolio has no owning user; skipping"
        );
        return TaskReport {
            document: None,
            outcome: TaskOutcome::Failed,
            degradations: vec!["missing user id".to_string()],
        };
    };

    let generated_at = Utc::now();
    let mut degradations: Vec<String> = Vec::new();

    if sentiment.is_none() {
        degradations.push("sentiment unavailable for this run".to_string());
    }

    // Normalize and collapse symbols that map to the same canonical form.
    let mut symbols: Vec<String> = Vec::new();
    {
        let mut seen = HashSet::new();
        for raw in portfolio.raw_symbols() {
            let normalized = normalize::normalize(raw);
            if seen.insert(normalized.clone()) {
                symbols.push(normalized);
            }
        }
    }

    tracing::info!(
        portfolio_id = portfolio.portfolio_id,
        portfolio_name = %portfolio.name,
        symbols = symbols.len(),
        "processing portfolio"
    );

    let mut total_slices = 0usize;
    let mut degraded_slices = 0usize;

    // News: per symbol, window filter, dedup by id first-seen, then cap.
    let window_start = generated_at - Duration::hours(options.news_window_hours);
    let mut news: Vec<NewsItem> = Vec::new();
    let mut seen_news_ids: HashSet<String> = HashSet::new();
    for symbol in &symbols {
        total_slices += 1;
        match gateway.news_for(symbol).await {
            Fetched::Data(articles) => {
                let mut kept = 0usize;
                for article in articles {
                    if kept >= options.max_news_per_symbol {
                        break;
                    }
                    let Some(item) = news_item(symbol, article) else {
                        continue;
                    };
                    if item.published_at < window_start {
                        continue;
                    }
                    if !seen_news_ids.insert(item.id.clone()) {
                        continue;
                    }
                    news.push(item);
                    kept += 1;
                }
            }
            Fetched::Degraded(reason) => {
                degraded_slices += 1;
                degradations.push(format!("news[{symbol}]: {reason}"));
            }
        }
    }

    // Ideas: one fetch per derived category, dedup, most recent first, cap.
    let mut ideas: Vec<TradingIdea> = Vec::new();
    let mut seen_idea_ids: HashSet<String> = HashSet::new();
    for category in categories_for(&symbols) {
        total_slices += 1;
        match gateway.ideas_for(&category).await {
            Fetched::Data(posts) => {
                for post in posts {
                    let Some(idea) = trading_idea(post) else {
                        continue;
                    };
                    if seen_idea_ids.insert(idea.id.clone()) {
                        ideas.push(idea);
                    }
                }
            }
            Fetched::Degraded(reason) => {
                degraded_slices += 1;
                degradations.push(format!("ideas[{category}]: {reason}"));
            }
        }
    }
    ideas.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    ideas.truncate(options.max_ideas_per_portfolio);

    let outcome = if symbols.is_empty() {
        TaskOutcome::Failed
    } else if total_slices > 0 && degraded_slices == total_slices {
        TaskOutcome::Failed
    } else if degradations.is_empty() {
        TaskOutcome::Succeeded
    } else {
        TaskOutcome::PartiallySucceeded
    };

    tracing::info!(
        portfolio_id = portfolio.portfolio_id,
        news = news.len(),
        ideas = ideas.len(),
        degraded_slices,
        ?outcome,
        "portfolio processed"
    );

    TaskReport {
        document: Some(PortfolioDocument {
            generated_at,
            portfolio_id: portfolio.portfolio_id,
            portfolio_name: portfolio.name.clone(),
            user_id,
            market_sentiment: sentiment.map(SentimentReading::as_market_sentiment),
            portfolio_news: news,
            tradingview_ideas: ideas,
        }),
        outcome,
        degradations,
    }
}

/// Idea categories covered by a symbol set, in first-seen order.
fn categories_for(symbols: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for symbol in symbols {
        let category = if symbol.ends_with("-USD") {
            "crypto"
        } else {
            "stock"
        };
        if !out.iter().any(|c| c == category) {
            out.push(category.to_string());
        }
    }
    out
}

fn news_item(symbol: &str, article: NewsArticle) -> Option<NewsItem> {
    let id = article.id.trim().to_string();
    if id.is_empty() {
        return None;
    }
    // Items without a publication timestamp cannot be windowed; drop them.
    let published_at = article.published()?;
    let image_url = article.image.as_ref().and_then(|image| image.resolve());

    Some(NewsItem {
        id,
        symbol: symbol.to_string(),
        title: article.title,
        source: article.source,
        url: article.url,
        published_at,
        image_url,
        content_type: article.content_type,
    })
}

fn trading_idea(post: IdeaPost) -> Option<TradingIdea> {
    let published_at = post.published_at?;
    Some(TradingIdea {
        id: post.id,
        ticker: post.ticker,
        category: post.category,
        title: post.title,
        author: post.author,
        rating: post.rating,
        published_at,
        idea_url: post.idea_url,
        image_url: post.image_url,
        source_url: post.source_url,
    })
}
