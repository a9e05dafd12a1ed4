//! Read-only access to the relational store that owns users, portfolios and
//! their holdings. The schema belongs to the upstream application; this
//! worker only ever selects from it.

use crate::domain::portfolio::{Asset, Portfolio};
use anyhow::{Context, Result};
use uuid::Uuid;

/// Narrows a run to one portfolio, one user, or both.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortfolioFilter {
    pub portfolio_id: Option<i64>,
    pub user_id: Option<Uuid>,
}

#[async_trait::async_trait]
pub trait PortfolioSource: Send + Sync {
    /// Loads the work list for a run. A failure here is fatal to the run.
    async fn load_portfolios(&self, filter: PortfolioFilter) -> Result<Vec<Portfolio>>;
}

pub struct PgPortfolioStore {
    pool: sqlx::PgPool,
}

impl PgPortfolioStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PortfolioSource for PgPortfolioStore {
    async fn load_portfolios(&self, filter: PortfolioFilter) -> Result<Vec<Portfolio>> {
        let rows: Vec<(i64, Option<Uuid>, Option<String>)> =
            match (filter.portfolio_id, filter.user_id) {
                (Some(id), Some(user_id)) => sqlx::query_as(
                    "SELECT portfolio_id, user_id, portfolio_name \
                     FROM portfolios WHERE portfolio_id = $1 AND user_id = $2",
                )
                .persistent(false)
                .bind(id)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("load portfolio {id} for user {user_id} failed"))?,
                (Some(id), None) => sqlx::query_as(
                    "SELECT portfolio_id, user_id, portfolio_name \
                     FROM portfolios WHERE portfolio_id = $1",
                )
                .persistent(false)
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("load portfolio {id} failed"))?,
                (None, Some(user_id)) => sqlx::query_as(
                    "SELECT portfolio_id, user_id, portfolio_name \
                     FROM portfolios WHERE user_id = $1 ORDER BY portfolio_id ASC",
                )
                .persistent(false)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("load portfolios for user {user_id} failed"))?,
                (None, None) => sqlx::query_as(
                    "SELECT portfolio_id, user_id, portfolio_name \
                     FROM portfolios ORDER BY portfolio_id ASC",
                )
                .persistent(false)
                .fetch_all(&self.pool)
                .await
                .context("load portfolios failed")?,
            };

        let mut out = Vec::with_capacity(rows.len());
        for (portfolio_id, user_id, name) in rows {
            let symbols: Vec<(String,)> = sqlx::query_as(
                "SELECT asset_symbol FROM assets \
                 WHERE portfolio_id = $1 ORDER BY asset_id ASC",
            )
            .persistent(false)
            .bind(portfolio_id)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("load assets for portfolio {portfolio_id} failed"))?;

            out.push(Portfolio {
                portfolio_id,
                user_id,
                name: name.unwrap_or_default(),
                assets: symbols
                    .into_iter()
                    .map(|(symbol,)| Asset { symbol })
                    .collect(),
            });
        }

        // Full and per-user runs skip portfolios with nothing to fetch for;
        // an explicitly requested portfolio is processed even when empty.
        if filter.portfolio_id.is_none() {
            out.retain(Portfolio::has_assets);
        }

        Ok(out)
    }
}
