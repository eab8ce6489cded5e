//! Run session domain model.
//!
//! A session drives one run of a suite. Its status is a single enumerated
//! value with an explicit transition table; the aggregate counters are only
//! changed through `record_outcome` / `revert_outcome` so that
//! `test_cases_completed` always equals the number of finalized executions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::execution::{Execution, Outcome};
use super::test_case::CaseRef;
use crate::error::{AppError, AppResult};

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Paused,
    Completed,
    /// Reserved: stored and reported, but nothing transitions into it.
    Aborted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    /// Allowed session transitions.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (Self::InProgress, Self::Paused)
                | (Self::Paused, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Completed, Self::InProgress)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `round(100 * completed / total)`, halves rounding up. Zero when `total` is zero.
///
/// Capped at 99 while any case is unfinished, so 100 is only ever reported
/// for a fully finalized session.
pub fn progress_percentage(completed: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let completed = completed.clamp(0, total);
    let rounded = (200 * i64::from(completed) + i64::from(total)) / (2 * i64::from(total));
    if completed < total {
        rounded.min(99) as i32
    } else {
        100
    }
}

/// A run of a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RunSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub suite_id: Uuid,
    pub name: String,
    pub status: SessionStatus,
    pub test_cases_total: i32,
    pub test_cases_completed: i32,
    pub progress_percentage: i32,
    pub passed_cases: i32,
    pub failed_cases: i32,
    pub blocked_cases: i32,
    pub skipped_cases: i32,
    /// Index into the suite's run order of the case currently open.
    pub current_index: i32,
    pub auto_advance: bool,
    /// Cases of the suite in run order when the session started. Later
    /// edits to the suite do not change a running session.
    pub case_order: Vec<CaseRef>,
    pub actual_start: DateTime<Utc>,
    pub actual_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunSession {
    /// A freshly started session over `case_order`, already `in_progress` at index 0.
    pub fn start(
        user_id: Uuid,
        suite_id: Uuid,
        name: String,
        case_order: Vec<CaseRef>,
        auto_advance: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let total = case_order.len() as i32;
        Self {
            id: Uuid::now_v7(),
            user_id,
            suite_id,
            name,
            status: SessionStatus::InProgress,
            test_cases_total: total,
            test_cases_completed: 0,
            progress_percentage: 0,
            passed_cases: 0,
            failed_cases: 0,
            blocked_cases: 0,
            skipped_cases: 0,
            current_index: 0,
            auto_advance,
            case_order,
            actual_start: now,
            actual_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.test_cases_completed >= self.test_cases_total
    }

    fn transition(&mut self, next: SessionStatus, now: DateTime<Utc>) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Session {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Reject mutations of executions unless the session is running.
    pub fn ensure_in_progress(&self) -> AppResult<()> {
        if self.status != SessionStatus::InProgress {
            return Err(AppError::Conflict(format!(
                "Session {} is {}, not in_progress",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(SessionStatus::Paused, now)
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(SessionStatus::InProgress, now)
    }

    fn counter_mut(&mut self, outcome: Outcome) -> &mut i32 {
        match outcome {
            Outcome::Passed => &mut self.passed_cases,
            Outcome::Failed => &mut self.failed_cases,
            Outcome::Blocked => &mut self.blocked_cases,
            Outcome::Skipped => &mut self.skipped_cases,
        }
    }

    /// Count one finalized execution. Completes the session on the last one.
    pub fn record_outcome(&mut self, outcome: Outcome, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_in_progress()?;
        if self.is_complete() {
            return Err(AppError::Conflict(format!(
                "Session {} has no unfinished test cases",
                self.id
            )));
        }

        *self.counter_mut(outcome) += 1;
        self.test_cases_completed += 1;
        self.progress_percentage =
            progress_percentage(self.test_cases_completed, self.test_cases_total);
        self.updated_at = now;

        if self.is_complete() {
            self.transition(SessionStatus::Completed, now)?;
            self.actual_end = Some(now);
        }
        Ok(())
    }

    pub fn apply(&mut self, change: CounterChange, now: DateTime<Utc>) -> AppResult<()> {
        match change {
            CounterChange::Record(outcome) => self.record_outcome(outcome, now),
            CounterChange::Revert(outcome) => self.revert_outcome(outcome, now),
        }
    }

    /// Roll back the contribution of an execution that is being reset.
    /// A completed session reopens.
    pub fn revert_outcome(&mut self, outcome: Outcome, now: DateTime<Utc>) -> AppResult<()> {
        let counted = *self.counter_mut(outcome);
        if counted <= 0 || self.test_cases_completed <= 0 {
            return Err(AppError::Conflict(format!(
                "Session {} has no {} result to roll back",
                self.id,
                outcome.as_str()
            )));
        }
        *self.counter_mut(outcome) -= 1;
        self.test_cases_completed -= 1;
        self.progress_percentage =
            progress_percentage(self.test_cases_completed, self.test_cases_total);
        self.updated_at = now;

        if self.status == SessionStatus::Completed {
            self.transition(SessionStatus::InProgress, now)?;
            self.actual_end = None;
        }
        Ok(())
    }
}

/// A change to the outcome counters, applied to the freshly locked session
/// row in the same transaction as the execution write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterChange {
    Record(Outcome),
    Revert(Outcome),
}

/// Where to move within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(tag = "to", rename_all = "snake_case")]
pub enum NavigationTarget {
    Previous,
    Next,
    Index { index: i32 },
}

impl NavigationTarget {
    /// Resolve to an index in `0..total`.
    pub fn resolve(&self, current: i32, total: i32) -> AppResult<i32> {
        let target = match self {
            Self::Previous => current - 1,
            Self::Next => current + 1,
            Self::Index { index } => *index,
        };
        if target < 0 || target >= total {
            return Err(AppError::InvalidInput(format!(
                "Test case index {} is outside 0..{}",
                target, total
            )));
        }
        Ok(target)
    }
}

/// Request to start a session for a suite.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Open the next unfinished case after each finalization (default true).
    #[serde(default)]
    pub auto_advance: Option<bool>,
}

/// One row of the session's run order with its execution, if opened.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionCaseView {
    pub index: i32,
    pub case: CaseRef,
    pub title: String,
    pub execution: Option<Execution>,
}

/// Full view of a session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSnapshot {
    pub session: RunSession,
    pub cases: Vec<SessionCaseView>,
    pub current_execution: Option<Execution>,
}
