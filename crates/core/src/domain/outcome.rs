use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of one portfolio task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Every fetch for the portfolio returned data and the document was
    /// published (or the run was a dry run).
    Succeeded,
    /// At least one fetch degraded; the document was still produced.
    PartiallySucceeded,
    /// Empty symbol list, every fetch degraded, a structural defect, or the
    /// publish step failed after its retry.
    Failed,
}

/// Per-portfolio result handed to the summary builder. Degradations are
/// enumerated verbatim so operators can see exactly which slice failed.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub portfolio_id: i64,
    pub portfolio_name: String,
    pub outcome: TaskOutcome,
    pub degradations: Vec<String>,
    pub duration_secs: f64,
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStatistics {
    pub attempted: usize,
    pub succeeded: usize,
    pub partially_succeeded: usize,
    pub failed: usize,
    /// succeeded / attempted, in percent; 0 when nothing was attempted.
    pub success_rate: f64,
}

/// Run-level report. Invariant to the order portfolio tasks completed in:
/// results are keyed and sorted by portfolio id before aggregation.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total_duration_secs: f64,
    pub average_duration_secs: f64,
    pub statistics: RunStatistics,
    pub results: Vec<PortfolioReport>,
}

impl ExecutionSummary {
    /// Pure aggregation over collected outcomes. No side effects.
    pub fn from_reports(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        mut results: Vec<PortfolioReport>,
    ) -> Self {
        results.sort_by_key(|r| r.portfolio_id);

        let attempted = results.len();
        let succeeded = results
            .iter()
            .filter(|r| r.outcome == TaskOutcome::Succeeded)
            .count();
        let partially_succeeded = results
            .iter()
            .filter(|r| r.outcome == TaskOutcome::PartiallySucceeded)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.outcome == TaskOutcome::Failed)
            .count();

        let success_rate = if attempted > 0 {
            round2(succeeded as f64 / attempted as f64 * 100.0)
        } else {
            0.0
        };

        let total_duration_secs =
            round2((completed_at - started_at).num_milliseconds() as f64 / 1000.0);
        let average_duration_secs = if attempted > 0 {
            round2(results.iter().map(|r| r.duration_secs).sum::<f64>() / attempted as f64)
        } else {
            0.0
        };

        Self {
            started_at,
            completed_at,
            total_duration_secs,
            average_duration_secs,
            statistics: RunStatistics {
                attempted,
                succeeded,
                partially_succeeded,
                failed,
                success_rate,
            },
            results,
        }
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn report(id: i64, outcome: TaskOutcome, duration_secs: f64) -> PortfolioReport {
        PortfolioReport {
            portfolio_id: id,
            portfolio_name: format!("p{id}"),
            outcome,
            degradations: vec![],
            duration_secs,
            storage_path: None,
        }
    }

    #[test]
    fn counts_every_outcome_bucket() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(10);
        let summary = ExecutionSummary::from_reports(
            t0,
            t1,
            vec![
                report(1, TaskOutcome::Succeeded, 2.0),
                report(2, TaskOutcome::PartiallySucceeded, 3.0),
                report(3, TaskOutcome::Failed, 1.0),
                report(4, TaskOutcome::Succeeded, 2.0),
            ],
        );

        assert_eq!(summary.statistics.attempted, 4);
        assert_eq!(summary.statistics.succeeded, 2);
        assert_eq!(summary.statistics.partially_succeeded, 1);
        assert_eq!(summary.statistics.failed, 1);
        assert_eq!(summary.statistics.success_rate, 50.0);
        assert_eq!(summary.total_duration_secs, 10.0);
        assert_eq!(summary.average_duration_secs, 2.0);
    }

    #[test]
    fn empty_run_has_zero_rate() {
        let t0 = Utc::now();
        let summary = ExecutionSummary::from_reports(t0, t0, vec![]);
        assert_eq!(summary.statistics.attempted, 0);
        assert_eq!(summary.statistics.success_rate, 0.0);
        assert_eq!(summary.average_duration_secs, 0.0);
    }

    #[test]
    fn summary_is_invariant_to_completion_order() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(5);
        let a = vec![
            report(1, TaskOutcome::Succeeded, 1.0),
            report(2, TaskOutcome::Failed, 2.0),
            report(3, TaskOutcome::Succeeded, 3.0),
        ];
        let mut b = a.clone();
        b.reverse();

        let left = ExecutionSummary::from_reports(t0, t1, a);
        let right = ExecutionSummary::from_reports(t0, t1, b);

        assert_eq!(left.statistics.succeeded, right.statistics.succeeded);
        let left_ids: Vec<i64> = left.results.iter().map(|r| r.portfolio_id).collect();
        let right_ids: Vec<i64> = right.results.iter().map(|r| r.portfolio_id).collect();
        assert_eq!(left_ids, right_ids);
        assert_eq!(left_ids, vec![1, 2, 3]);
    }
}
