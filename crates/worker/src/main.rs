use anyhow::Context;
use clap::Parser;
use pulse_core::providers::ProviderGateway;
use pulse_core::storage::{DiscardPublisher, DocumentPublisher, SupabaseStorage};
use pulse_core::store::PgPortfolioStore;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod orchestrator;
mod processor;

const DEFAULT_SUMMARY_PATH: &str = "orchestration_summary.json";

#[derive(Debug, Parser)]
#[command(name = "pulse_worker")]
struct Args {
    /// Restrict the run to a single portfolio id (overrides FILTER_PORTFOLIO_ID).
    #[arg(long)]
    portfolio_id: Option<i64>,

    /// Restrict the run to one user's portfolios (overrides FILTER_USER_ID).
    #[arg(long)]
    user_id: Option<uuid::Uuid>,

    /// Force one-portfolio-at-a-time execution regardless of PARALLEL_EXECUTION.
    #[arg(long)]
    sequential: bool,

    /// Do everything except writing documents to storage.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pulse_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let mut options = orchestrator::RunOptions::from_env();
    if let Some(id) = args.portfolio_id {
        options.filter_portfolio_id = Some(id);
    }
    if let Some(id) = args.user_id {
        options.filter_user_id = Some(id);
    }
    if args.sequential {
        options.policy = orchestrator::ExecPolicy::Sequential;
    }

    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    let gateway = Arc::new(ProviderGateway::new(
        Arc::new(pulse_core::providers::sentiment::FearGreedClient::from_settings(&settings)?),
        Arc::new(pulse_core::providers::news::YahooNewsClient::from_settings(&settings)?),
        Arc::new(pulse_core::providers::ideas::HttpJsonIdeasClient::from_settings(&settings)?),
    ));

    let publisher: Arc<dyn DocumentPublisher> = if args.dry_run {
        tracing::info!("dry run: documents will not be written to storage");
        Arc::new(DiscardPublisher)
    } else {
        Arc::new(SupabaseStorage::from_settings(&settings)?)
    };

    let orchestrator = orchestrator::Orchestrator::new(
        Arc::new(PgPortfolioStore::new(pool)),
        gateway,
        publisher,
    );

    let summary = match orchestrator.run(&options).await {
        Ok(summary) => summary,
        Err(err) => {
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %format!("{err:#}"), "run aborted");
            return Err(err);
        }
    };

    tracing::info!(
        attempted = summary.statistics.attempted,
        succeeded = summary.statistics.succeeded,
        partially_succeeded = summary.statistics.partially_succeeded,
        failed = summary.statistics.failed,
        success_rate = summary.statistics.success_rate,
        total_duration_secs = summary.total_duration_secs,
        "run finished"
    );
    for report in &summary.results {
        if !report.degradations.is_empty() {
            tracing::warn!(
                portfolio_id = report.portfolio_id,
                outcome = ?report.outcome,
                degradations = ?report.degradations,
                "portfolio finished with degradations"
            );
        }
    }

    let summary_path = std::env::var("SUMMARY_PATH")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SUMMARY_PATH.to_string());
    let body = serde_json::to_string_pretty(&summary).context("serialize summary failed")?;
    std::fs::write(&summary_path, body)
        .with_context(|| format!("write summary to {summary_path} failed"))?;
    tracing::info!(%summary_path, "execution summary written");

    Ok(())
}

fn init_sentry(settings: &pulse_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
