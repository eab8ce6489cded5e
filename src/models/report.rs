//! Reporting DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::execution::ExecutionStatus;
use super::test_case::CaseRef;

/// Filter for report queries.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReportFilter {
    pub suite_id: Option<Uuid>,
    /// Inclusive lower bound on `completed_at`.
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `completed_at`.
    pub to_date: Option<DateTime<Utc>>,
    /// Number of entries for ranked reports (default 10, max 100).
    pub limit: Option<usize>,
}

/// Outcome counts shared by every report row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct OutcomeCounts {
    pub total: i64,
    pub passed: i64,
    pub failed: i64,
    pub blocked: i64,
    pub skipped: i64,
    /// `passed / total * 100`, two decimals; 0 when `total` is 0.
    pub pass_rate: f64,
}

/// Aggregate statistics over a user's (or one suite's) runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SuiteStats {
    pub suite_id: Option<Uuid>,
    pub sessions_total: i64,
    pub sessions_in_progress: i64,
    pub sessions_paused: i64,
    pub sessions_completed: i64,
    pub sessions_aborted: i64,
    pub executions: OutcomeCounts,
    /// Mean wall time of completed sessions, in minutes.
    pub average_session_minutes: f64,
}

/// Per-case history.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CasePerformance {
    pub case: CaseRef,
    pub title: String,
    pub runs: OutcomeCounts,
    pub last_status: Option<ExecutionStatus>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Results for one UTC day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub runs: OutcomeCounts,
}

/// How often a case failed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FailureFrequency {
    pub case: CaseRef,
    pub title: String,
    pub failures: i64,
    pub runs: i64,
    /// `failures / runs * 100`, two decimals.
    pub failure_rate: f64,
    pub last_failure_reason: Option<String>,
}
