use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Market-wide fear/greed reading, fetched once per run and shared read-only
/// across every portfolio task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentReading {
    pub value: i64,
    pub label: String,
    pub fetched_at: DateTime<Utc>,
}

impl SentimentReading {
    pub fn as_market_sentiment(&self) -> MarketSentiment {
        MarketSentiment {
            value: self.value,
            description: self.label.clone(),
        }
    }
}

/// The `market_sentiment` block of the published document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSentiment {
    pub value: i64,
    pub description: String,
}

/// One deduplicated, windowed news entry in the published document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub symbol: String,
    pub title: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub image_url: Option<String>,
    #[serde(rename = "type")]
    pub content_type: Option<String>,
}

/// One community trading idea in the published document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingIdea {
    pub id: String,
    pub ticker: String,
    pub category: String,
    pub title: String,
    pub author: Option<String>,
    pub rating: Option<String>,
    pub published_at: DateTime<Utc>,
    pub idea_url: String,
    pub image_url: Option<String>,
    pub source_url: Option<String>,
}

/// Output aggregate for one portfolio. Assembled once per run, never mutated
/// afterwards; serialized verbatim to `{user_id}/portfolio_news.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDocument {
    pub generated_at: DateTime<Utc>,
    pub portfolio_id: i64,
    pub portfolio_name: String,
    pub user_id: Uuid,
    pub market_sentiment: Option<MarketSentiment>,
    pub portfolio_news: Vec<NewsItem>,
    pub tradingview_ideas: Vec<TradingIdea>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_serializes_with_expected_field_names() {
        let doc = PortfolioDocument {
            generated_at: Utc::now(),
            portfolio_id: 7,
            portfolio_name: "Growth".to_string(),
            user_id: Uuid::new_v4(),
            market_sentiment: Some(MarketSentiment {
                value: 61,
                description: "Greed".to_string(),
            }),
            portfolio_news: vec![NewsItem {
                id: "n-1".to_string(),
                symbol: "AAPL".to_string(),
                title: Some("Apple ships".to_string()),
                source: Some("Newswire".to_string()),
                url: None,
                published_at: Utc::now(),
                image_url: None,
                content_type: Some("STORY".to_string()),
            }],
            tradingview_ideas: vec![],
        };

        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(v["portfolio_id"], 7);
        assert_eq!(v["market_sentiment"]["value"], 61);
        assert_eq!(v["portfolio_news"][0]["type"], "STORY");
        assert!(v.get("generated_at").is_some());
        assert!(v["tradingview_ideas"].as_array().unwrap().is_empty());
    }

    #[test]
    fn missing_sentiment_serializes_as_null() {
        let doc = PortfolioDocument {
            generated_at: Utc::now(),
            portfolio_id: 1,
            portfolio_name: String::new(),
            user_id: Uuid::new_v4(),
            market_sentiment: None,
            portfolio_news: vec![],
            tradingview_ideas: vec![],
        };
        let v = serde_json::to_value(&doc).unwrap();
        assert!(v["market_sentiment"].is_null());
    }
}
