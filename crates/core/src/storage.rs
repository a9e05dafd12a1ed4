//! Per-user object storage for assembled documents. One file per user at a
//! well-known path, always overwritten by the latest run.

use crate::config::Settings;
use crate::domain::document::PortfolioDocument;
use anyhow::{Context, Result};
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DOCUMENT_FILENAME: &str = "portfolio_news.json";

/// Storage location for a user's snapshot document.
pub fn storage_path(user_id: Uuid) -> String {
    format!("{user_id}/{DOCUMENT_FILENAME}")
}

#[async_trait::async_trait]
pub trait DocumentPublisher: Send + Sync {
    /// Serializes and writes one document, returning the storage path.
    async fn publish(&self, document: &PortfolioDocument) -> Result<String>;
}

/// Supabase Storage publisher. Uploads with `x-upsert` so reruns overwrite.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_supabase_url()?.to_string();
        let service_key = settings.require_supabase_service_role_key()?.to_string();
        let bucket = settings.supabase_bucket_name.clone();

        let timeout_secs = std::env::var("STORAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build storage http client")?;

        Ok(Self {
            http,
            base_url,
            service_key,
            bucket,
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            path
        )
    }
}

#[async_trait::async_trait]
impl DocumentPublisher for SupabaseStorage {
    async fn publish(&self, document: &PortfolioDocument) -> Result<String> {
        let path = storage_path(document.user_id);
        let body =
            serde_json::to_string_pretty(document).context("serialize portfolio document failed")?;

        let res = self
            .http
            .post(self.object_url(&path))
            .bearer_auth(&self.service_key)
            .header("content-type", "application/json;charset=utf-8")
            .header("x-upsert", "true")
            .body(body)
            .send()
            .await
            .with_context(|| format!("storage upload request failed for {path}"))?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            anyhow::bail!("storage upload HTTP {status} for {path}: {detail}");
        }

        tracing::debug!(%path, "document uploaded");
        Ok(path)
    }
}

/// Publisher for dry runs: accepts every document without writing anything.
#[derive(Debug, Clone, Default)]
pub struct DiscardPublisher;

#[async_trait::async_trait]
impl DocumentPublisher for DiscardPublisher {
    async fn publish(&self, document: &PortfolioDocument) -> Result<String> {
        Ok(storage_path(document.user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_path_is_keyed_by_user() {
        let user_id = Uuid::parse_str("6d9e0a2e-9e2f-4f7d-8b1a-111111111111").unwrap();
        assert_eq!(
            storage_path(user_id),
            "6d9e0a2e-9e2f-4f7d-8b1a-111111111111/portfolio_news.json"
        );
    }

    #[test]
    fn object_url_joins_bucket_and_path() {
        let storage = SupabaseStorage {
            http: reqwest::Client::new(),
            base_url: "https://project.supabase.co/".to_string(),
            service_key: "key".to_string(),
            bucket: "portfolio-files".to_string(),
        };
        assert_eq!(
            storage.object_url("u/portfolio_news.json"),
            "https://project.supabase.co/storage/v1/object/portfolio-files/u/portfolio_news.json"
        );
    }
}
