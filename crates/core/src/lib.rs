pub mod domain;
pub mod normalize;
pub mod providers;
pub mod storage;
pub mod store;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub supabase_url: Option<String>,
        pub supabase_service_role_key: Option<String>,
        pub supabase_bucket_name: String,
        pub sentry_dsn: Option<String>,
        pub sentiment_url: Option<String>,
        pub news_base_url: Option<String>,
        pub ideas_base_url: Option<String>,
        pub ideas_api_key: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                supabase_url: std::env::var("SUPABASE_URL").ok(),
                supabase_service_role_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY").ok(),
                supabase_bucket_name: std::env::var("SUPABASE_BUCKET_NAME")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "portfolio-files".to_string()),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                sentiment_url: std::env::var("SENTIMENT_URL").ok(),
                news_base_url: std::env::var("NEWS_BASE_URL").ok(),
                ideas_base_url: std::env::var("IDEAS_BASE_URL").ok(),
                ideas_api_key: std::env::var("IDEAS_API_KEY").ok(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_supabase_url(&self) -> anyhow::Result<&str> {
            self.supabase_url
                .as_deref()
                .context("SUPABASE_URL is required")
        }

        pub fn require_supabase_service_role_key(&self) -> anyhow::Result<&str> {
            self.supabase_service_role_key
                .as_deref()
                .context("SUPABASE_SERVICE_ROLE_KEY is required")
        }
    }
}
