use crate::config::Settings;
use crate::domain::document::SentimentReading;
use crate::providers::SentimentProvider;
use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_URL: &str = "https://feargreedmeter.com/";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

/// Fear & greed index client. The site embeds its state as a JSON blob in a
/// `__NEXT_DATA__` script tag; we pull the latest score out of that.
#[derive(Debug, Clone)]
pub struct FearGreedClient {
    http: reqwest::Client,
    url: String,
}

impl FearGreedClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings
            .sentiment_url
            .clone()
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let timeout_secs = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build sentiment http client")?;

        Ok(Self { http, url })
    }
}

#[async_trait::async_trait]
impl SentimentProvider for FearGreedClient {
    async fn fetch_sentiment(&self) -> Result<SentimentReading> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("sentiment request failed")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("failed to read sentiment response")?;
        anyhow::ensure!(status.is_success(), "sentiment provider HTTP {status}");

        let payload = extract_next_data(&body)?;
        let value = score_from_payload(&payload)?;

        Ok(SentimentReading {
            value,
            label: label_for_score(value).to_string(),
            fetched_at: Utc::now(),
        })
    }
}

pub fn label_for_score(score: i64) -> &'static str {
    match score {
        _ if score <= 25 => "Extreme Fear",
        _ if score <= 45 => "Fear",
        _ if score <= 54 => "Neutral",
        _ if score <= 74 => "Greed",
        _ => "Extreme Greed",
    }
}

/// Pulls the JSON body of the `__NEXT_DATA__` script tag out of the page.
fn extract_next_data(html: &str) -> Result<Value> {
    let marker = html
        .find("__NEXT_DATA__")
        .context("__NEXT_DATA__ script tag not found")?;
    let tag_end = html[marker..]
        .find('>')
        .map(|i| marker + i + 1)
        .context("__NEXT_DATA__ script tag is malformed")?;
    let close = html[tag_end..]
        .find("</script>")
        .map(|i| tag_end + i)
        .context("__NEXT_DATA__ script tag is not closed")?;

    serde_json::from_str(&html[tag_end..close]).context("__NEXT_DATA__ is not valid JSON")
}

fn score_from_payload(payload: &Value) -> Result<i64> {
    let score = payload
        .pointer("/props/pageProps/data/fgi/latest/now")
        .and_then(Value::as_i64)
        .context("fear/greed score missing from payload")?;
    anyhow::ensure!(
        (0..=100).contains(&score),
        "fear/greed score out of range: {score}"
    );
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn labels_cover_the_full_scale() {
        assert_eq!(label_for_score(0), "Extreme Fear");
        assert_eq!(label_for_score(25), "Extreme Fear");
        assert_eq!(label_for_score(26), "Fear");
        assert_eq!(label_for_score(45), "Fear");
        assert_eq!(label_for_score(50), "Neutral");
        assert_eq!(label_for_score(55), "Greed");
        assert_eq!(label_for_score(74), "Greed");
        assert_eq!(label_for_score(75), "Extreme Greed");
        assert_eq!(label_for_score(100), "Extreme Greed");
    }

    #[test]
    fn extracts_score_from_embedded_json() {
        let html = concat!(
            "<html><head></head><body>",
            r#"<script id="__NEXT_DATA__" type="application/json">"#,
            r#"{"props":{"pageProps":{"data":{"fgi":{"latest":{"now":61}}}}}}"#,
            "</script></body></html>",
        );

        let payload = extract_next_data(html).unwrap();
        assert_eq!(score_from_payload(&payload).unwrap(), 61);
    }

    #[test]
    fn missing_script_tag_is_an_error() {
        assert!(extract_next_data("<html></html>").is_err());
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let payload = json!({"props":{"pageProps":{"data":{"fgi":{"latest":{"now":140}}}}}});
        assert!(score_from_payload(&payload).is_err());
    }
}
