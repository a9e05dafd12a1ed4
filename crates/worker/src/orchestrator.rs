//! Run loop: loads the work list, fetches the shared sentiment reading once,
//! schedules portfolio tasks under the selected policy, and aggregates the
//! outcomes. A failure inside one portfolio task never aborts its siblings;
//! only the initial portfolio load is fatal.

use crate::processor::{self, ProcessorOptions, TaskReport};
use anyhow::{Context, Result};
use chrono::Utc;
use pulse_core::domain::document::{PortfolioDocument, SentimentReading};
use pulse_core::domain::outcome::{ExecutionSummary, PortfolioReport, TaskOutcome};
use pulse_core::domain::portfolio::Portfolio;
use pulse_core::providers::{Fetched, ProviderGateway};
use pulse_core::storage::DocumentPublisher;
use pulse_core::store::{PortfolioFilter, PortfolioSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const DEFAULT_MAX_WORKERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecPolicy {
    /// One portfolio at a time, in load order.
    Sequential,
    /// Up to `max_workers` in-flight portfolio tasks.
    Parallel { max_workers: usize },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub filter_portfolio_id: Option<i64>,
    pub filter_user_id: Option<uuid::Uuid>,
    pub policy: ExecPolicy,
    pub processor: ProcessorOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filter_portfolio_id: None,
            filter_user_id: None,
            policy: ExecPolicy::Parallel {
                max_workers: DEFAULT_MAX_WORKERS,
            },
            processor: ProcessorOptions::default(),
        }
    }
}

impl RunOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        // A malformed filter must not silently widen the run to everything.
        if let Ok(s) = std::env::var("FILTER_PORTFOLIO_ID") {
            match s.trim().parse::<i64>() {
                Ok(id) => out.filter_portfolio_id = Some(id),
                Err(_) => {
                    tracing::warn!(value = %s, "FILTER_PORTFOLIO_ID is not an integer; ignoring")
                }
            }
        }

        if let Ok(s) = std::env::var("FILTER_USER_ID") {
            match s.trim().parse::<uuid::Uuid>() {
                Ok(id) => out.filter_user_id = Some(id),
                Err(_) => tracing::warn!(value = %s, "FILTER_USER_ID is not a UUID; ignoring"),
            }
        }

        let parallel = std::env::var("PARALLEL_EXECUTION")
            .map(|s| s.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        let max_workers = match std::env::var("MAX_WORKERS") {
            Ok(s) => match s.trim().parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    tracing::warn!(value = %s, "MAX_WORKERS is not an integer; using default");
                    DEFAULT_MAX_WORKERS
                }
            },
            Err(_) => DEFAULT_MAX_WORKERS,
        };

        out.policy = if parallel {
            ExecPolicy::Parallel { max_workers }
        } else {
            ExecPolicy::Sequential
        };

        out.processor = ProcessorOptions::from_env();
        out
    }

    fn portfolio_filter(&self) -> PortfolioFilter {
        PortfolioFilter {
            portfolio_id: self.filter_portfolio_id,
            user_id: self.filter_user_id,
        }
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    source: Arc<dyn PortfolioSource>,
    gateway: Arc<ProviderGateway>,
    publisher: Arc<dyn DocumentPublisher>,
}

impl Orchestrator {
    pub fn new(
        source: Arc<dyn PortfolioSource>,
        gateway: Arc<ProviderGateway>,
        publisher: Arc<dyn DocumentPublisher>,
    ) -> Self {
        Self {
            source,
            gateway,
            publisher,
        }
    }

    pub async fn run(&self, options: &RunOptions) -> Result<ExecutionSummary> {
        let started_at = Utc::now();

        let portfolios = self
            .source
            .load_portfolios(options.portfolio_filter())
            .await
            .context("loading portfolios failed")?;

        if portfolios.is_empty() {
            tracing::warn!(
                filter_portfolio_id = ?options.filter_portfolio_id,
                filter_user_id = ?options.filter_user_id,
                "no portfolios matched; nothing to do"
            );
            return Ok(ExecutionSummary::from_reports(started_at, Utc::now(), vec![]));
        }
        tracing::info!(count = portfolios.len(), "loaded portfolios");

        // One sentiment fetch per run, shared read-only by every task.
        let sentiment = match self.gateway.sentiment().await {
            Fetched::Data(reading) => {
                tracing::info!(value = reading.value, label = %reading.label, "market sentiment");
                Some(reading)
            }
            Fetched::Degraded(reason) => {
                tracing::warn!(%reason, "market sentiment unavailable for this run");
                None
            }
        };

        let options = Arc::new(options.clone());
        let reports = match options.policy {
            ExecPolicy::Sequential => self.run_sequential(portfolios, sentiment, options).await,
            ExecPolicy::Parallel { max_workers } => {
                self.run_parallel(portfolios, sentiment, options, max_workers)
                    .await
            }
        };

        Ok(ExecutionSummary::from_reports(started_at, Utc::now(), reports))
    }

    async fn run_sequential(
        &self,
        portfolios: Vec<Portfolio>,
        sentiment: Option<SentimentReading>,
        options: Arc<RunOptions>,
    ) -> Vec<PortfolioReport> {
        tracing::info!("sequential execution mode");

        let mut reports = Vec::with_capacity(portfolios.len());
        for portfolio in portfolios {
            let portfolio_id = portfolio.portfolio_id;
            let portfolio_name = portfolio.name.clone();
            let this = self.clone();
            let sentiment = sentiment.clone();
            let options = Arc::clone(&options);

            // Spawned so a panic is contained to this portfolio's task.
            let handle = tokio::spawn(async move {
                this.run_one(portfolio, sentiment.as_ref(), &options).await
            });

            match handle.await {
                Ok(report) => reports.push(report),
                Err(err) => reports.push(panic_report(portfolio_id, portfolio_name, &err)),
            }
        }
        reports
    }

    async fn run_parallel(
        &self,
        portfolios: Vec<Portfolio>,
        sentiment: Option<SentimentReading>,
        options: Arc<RunOptions>,
        max_workers: usize,
    ) -> Vec<PortfolioReport> {
        let max_workers = max_workers.max(1);
        tracing::info!(max_workers, "parallel execution mode");

        let semaphore = Arc::new(Semaphore::new(max_workers));
        let mut set = JoinSet::new();
        // Task identities survive a panic via the join id.
        let mut identities: HashMap<tokio::task::Id, (i64, String)> = HashMap::new();

        for portfolio in portfolios {
            let portfolio_id = portfolio.portfolio_id;
            let portfolio_name = portfolio.name.clone();
            let this = self.clone();
            let sentiment = sentiment.clone();
            let options = Arc::clone(&options);
            let semaphore = Arc::clone(&semaphore);

            let handle = set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return failed_report(
                            portfolio.portfolio_id,
                            portfolio.name.clone(),
                            "worker pool closed before the task started".to_string(),
                        )
                    }
                };
                this.run_one(portfolio, sentiment.as_ref(), &options).await
            });
            identities.insert(handle.id(), (portfolio_id, portfolio_name));
        }

        let mut reports = Vec::with_capacity(identities.len());
        while let Some(joined) = set.join_next_with_id().await {
            match joined {
                Ok((_, report)) => reports.push(report),
                Err(err) => {
                    let (portfolio_id, portfolio_name) = identities
                        .get(&err.id())
                        .cloned()
                        .unwrap_or((-1, String::new()));
                    reports.push(panic_report(portfolio_id, portfolio_name, &err));
                }
            }
        }
        reports
    }

    async fn run_one(
        &self,
        portfolio: Portfolio,
        sentiment: Option<&SentimentReading>,
        options: &RunOptions,
    ) -> PortfolioReport {
        let t0 = Instant::now();

        let TaskReport {
            document,
            mut outcome,
            mut degradations,
        } = processor::process(&self.gateway, &options.processor, &portfolio, sentiment).await;

        let mut storage_path = None;
        if let Some(document) = &document {
            match self.publish_with_retry(document).await {
                Ok(path) => storage_path = Some(path),
                Err(err) => {
                    tracing::error!(
                        portfolio_id = portfolio.portfolio_id,
                        error = %format!("{err:#}"),
                        "document publish failed"
                    );
                    degradations.push(format!("publish: {err:#}"));
                    outcome = TaskOutcome::Failed;
                }
            }
        }

        PortfolioReport {
            portfolio_id: portfolio.portfolio_id,
            portfolio_name: portfolio.name,
            outcome,
            degradations,
            duration_secs: t0.elapsed().as_secs_f64(),
            storage_path,
        }
    }

    /// One retry with no backoff before the failure is recorded.
    async fn publish_with_retry(&self, document: &PortfolioDocument) -> Result<String> {
        match self.publisher.publish(document).await {
            Ok(path) => Ok(path),
            Err(err) => {
                tracing::warn!(
                    portfolio_id = document.portfolio_id,
                    error = %format!("{err:#}"),
                    "publish failed; retrying once"
                );
                self.publisher.publish(document).await
            }
        }
    }
}

fn failed_report(portfolio_id: i64, portfolio_name: String, reason: String) -> PortfolioReport {
    PortfolioReport {
        portfolio_id,
        portfolio_name,
        outcome: TaskOutcome::Failed,
        degradations: vec![reason],
        duration_secs: 0.0,
        storage_path: None,
    }
}

fn panic_report(
    portfolio_id: i64,
    portfolio_name: String,
    err: &tokio::task::JoinError,
) -> PortfolioReport {
    tracing::error!(portfolio_id, error = %err, "portfolio task panicked");
    failed_report(portfolio_id, portfolio_name, format!("task panicked: {err}"))
}
