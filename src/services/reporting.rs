//! Reporting aggregator.
//!
//! Reports are reductions over finalized execution rows. The reductions are
//! plain functions so they can be exercised without a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    CasePerformance, CaseRef, CurrentUser, DailyTrend, Execution, ExecutionStatus,
    FailureFrequency, OutcomeCounts, ReportFilter, RunSession, SessionStatus, SuiteStats,
};
use crate::repository::{CatalogRepository, RunRepository};

use super::ensure_owner;

pub const DEFAULT_TOP_FAILURES: usize = 10;
pub const MAX_TOP_FAILURES: usize = 100;

pub struct ReportingService {
    catalog: Arc<dyn CatalogRepository>,
    runs: Arc<dyn RunRepository>,
}

impl ReportingService {
    pub fn new(catalog: Arc<dyn CatalogRepository>, runs: Arc<dyn RunRepository>) -> Self {
        Self { catalog, runs }
    }

    async fn check_suite(&self, user: &CurrentUser, filter: &ReportFilter) -> AppResult<()> {
        if let Some(suite_id) = filter.suite_id {
            let suite = self.catalog.get_suite(suite_id).await?.ok_or_else(|| {
                crate::error::AppError::NotFound(format!("Suite {} not found", suite_id))
            })?;
            ensure_owner(user, suite.user_id, "Suite", suite_id)?;
        }
        Ok(())
    }

    async fn executions(
        &self,
        user: &CurrentUser,
        filter: &ReportFilter,
    ) -> AppResult<Vec<Execution>> {
        self.check_suite(user, filter).await?;
        self.runs
            .list_finalized_executions(user.user_id, filter)
            .await
    }

    async fn titles(&self, executions: &[Execution]) -> AppResult<HashMap<CaseRef, String>> {
        let mut refs: Vec<CaseRef> = executions.iter().map(|e| e.case).collect();
        refs.sort();
        refs.dedup();
        Ok(self
            .catalog
            .get_test_cases(&refs)
            .await?
            .into_iter()
            .map(|c| (c.case_ref(), c.title().to_string()))
            .collect())
    }

    pub async fn suite_stats(
        &self,
        user: &CurrentUser,
        filter: &ReportFilter,
    ) -> AppResult<SuiteStats> {
        let executions = self.executions(user, filter).await?;
        let sessions: Vec<RunSession> = self
            .runs
            .list_sessions(user.user_id, filter.suite_id)
            .await?
            .into_iter()
            .filter(|s| filter.from_date.is_none_or(|from| s.actual_start >= from))
            .filter(|s| filter.to_date.is_none_or(|to| s.actual_start <= to))
            .collect();
        Ok(suite_stats(filter.suite_id, &sessions, &executions))
    }

    pub async fn case_performance(
        &self,
        user: &CurrentUser,
        filter: &ReportFilter,
    ) -> AppResult<Vec<CasePerformance>> {
        let executions = self.executions(user, filter).await?;
        let titles = self.titles(&executions).await?;
        Ok(case_performance(&executions, &titles))
    }

    pub async fn daily_trends(
        &self,
        user: &CurrentUser,
        filter: &ReportFilter,
    ) -> AppResult<Vec<DailyTrend>> {
        let executions = self.executions(user, filter).await?;
        Ok(daily_trends(&executions))
    }

    pub async fn failure_frequency(
        &self,
        user: &CurrentUser,
        filter: &ReportFilter,
    ) -> AppResult<Vec<FailureFrequency>> {
        let executions = self.executions(user, filter).await?;
        let titles = self.titles(&executions).await?;
        let limit = filter
            .limit
            .unwrap_or(DEFAULT_TOP_FAILURES)
            .clamp(1, MAX_TOP_FAILURES);
        Ok(failure_frequency(&executions, &titles, limit))
    }
}

/// `numerator / denominator * 100` rounded to two decimals; 0 for an empty denominator.
pub fn percentage(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 10_000.0).round() / 100.0
}

impl OutcomeCounts {
    fn add(&mut self, status: ExecutionStatus) {
        match status {
            ExecutionStatus::Passed => self.passed += 1,
            ExecutionStatus::Failed => self.failed += 1,
            ExecutionStatus::Blocked => self.blocked += 1,
            ExecutionStatus::Skipped => self.skipped += 1,
            ExecutionStatus::InProgress => return,
        }
        self.total += 1;
        self.pass_rate = percentage(self.passed, self.total);
    }

    pub fn from_statuses(statuses: impl IntoIterator<Item = ExecutionStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.add(status);
        }
        counts
    }
}

pub fn suite_stats(
    suite_id: Option<Uuid>,
    sessions: &[RunSession],
    executions: &[Execution],
) -> SuiteStats {
    let count = |status: SessionStatus| sessions.iter().filter(|s| s.status == status).count() as i64;

    let durations: Vec<f64> = sessions
        .iter()
        .filter(|s| s.status == SessionStatus::Completed)
        .filter_map(|s| s.actual_end.map(|end| (end - s.actual_start).num_seconds() as f64 / 60.0))
        .collect();
    let average_session_minutes = if durations.is_empty() {
        0.0
    } else {
        (durations.iter().sum::<f64>() / durations.len() as f64 * 100.0).round() / 100.0
    };

    SuiteStats {
        suite_id,
        sessions_total: sessions.len() as i64,
        sessions_in_progress: count(SessionStatus::InProgress),
        sessions_paused: count(SessionStatus::Paused),
        sessions_completed: count(SessionStatus::Completed),
        sessions_aborted: count(SessionStatus::Aborted),
        executions: OutcomeCounts::from_statuses(executions.iter().map(|e| e.status)),
        average_session_minutes,
    }
}

/// Per-case history, sorted by title.
pub fn case_performance(
    executions: &[Execution],
    titles: &HashMap<CaseRef, String>,
) -> Vec<CasePerformance> {
    let mut by_case: HashMap<CaseRef, CasePerformance> = HashMap::new();
    for execution in executions {
        let entry = by_case
            .entry(execution.case)
            .or_insert_with(|| CasePerformance {
                case: execution.case,
                title: titles.get(&execution.case).cloned().unwrap_or_default(),
                runs: OutcomeCounts::default(),
                last_status: None,
                last_run_at: None,
            });
        entry.runs.add(execution.status);
        if execution.completed_at >= entry.last_run_at {
            entry.last_run_at = execution.completed_at;
            entry.last_status = Some(execution.status);
        }
    }

    let mut rows: Vec<CasePerformance> = by_case.into_values().collect();
    rows.sort_by(|a, b| a.title.cmp(&b.title).then(a.case.cmp(&b.case)));
    rows
}

/// Results per UTC day of completion, ascending.
pub fn daily_trends(executions: &[Execution]) -> Vec<DailyTrend> {
    let mut by_day: BTreeMap<NaiveDate, OutcomeCounts> = BTreeMap::new();
    for execution in executions {
        if let Some(completed_at) = execution.completed_at {
            by_day
                .entry(completed_at.date_naive())
                .or_default()
                .add(execution.status);
        }
    }
    by_day
        .into_iter()
        .map(|(date, runs)| DailyTrend { date, runs })
        .collect()
}

/// Cases that failed at least once, most failures first, then by title.
pub fn failure_frequency(
    executions: &[Execution],
    titles: &HashMap<CaseRef, String>,
    limit: usize,
) -> Vec<FailureFrequency> {
    let mut by_case: HashMap<CaseRef, (FailureFrequency, Option<chrono::DateTime<chrono::Utc>>)> =
        HashMap::new();
    for execution in executions {
        let (row, last_failed_at) = by_case.entry(execution.case).or_insert_with(|| {
            (
                FailureFrequency {
                    case: execution.case,
                    title: titles.get(&execution.case).cloned().unwrap_or_default(),
                    failures: 0,
                    runs: 0,
                    failure_rate: 0.0,
                    last_failure_reason: None,
                },
                None,
            )
        });
        row.runs += 1;
        if execution.status == ExecutionStatus::Failed {
            row.failures += 1;
            if execution.completed_at >= *last_failed_at {
                *last_failed_at = execution.completed_at;
                row.last_failure_reason = execution.failure_reason.clone();
            }
        }
    }

    let mut rows: Vec<FailureFrequency> = by_case
        .into_values()
        .map(|(mut row, _)| {
            row.failure_rate = percentage(row.failures, row.runs);
            row
        })
        .filter(|row| row.failures > 0)
        .collect();
    rows.sort_by(|a, b| {
        b.failures
            .cmp(&a.failures)
            .then(a.title.cmp(&b.title))
            .then(a.case.cmp(&b.case))
    });
    rows.truncate(limit);
    rows
}
