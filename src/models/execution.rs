//! Execution domain model: one run of one test case inside a session.
//!
//! The execution's status is the only state flag. `in_progress` executions
//! are editable; terminal ones are read-only until an explicit reset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::session::RunSession;
use super::test_case::CaseRef;
use crate::error::{AppError, AppResult};

/// Execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    InProgress,
    Passed,
    Failed,
    Blocked,
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Blocked => "blocked",
            Self::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(Self::InProgress),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "blocked" => Some(Self::Blocked),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// The outcome a terminal status records, `None` while in progress.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::InProgress => None,
            Self::Passed => Some(Outcome::Passed),
            Self::Failed => Some(Outcome::Failed),
            Self::Blocked => Some(Outcome::Blocked),
            Self::Skipped => Some(Outcome::Skipped),
        }
    }

    /// Allowed execution transitions: finalize out of `in_progress`, reset
    /// back into it.
    pub fn can_transition_to(&self, next: ExecutionStatus) -> bool {
        match (self, next) {
            (Self::InProgress, next) => next.is_terminal() || next == Self::InProgress,
            (_, Self::InProgress) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Blocked,
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }

    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Passed => ExecutionStatus::Passed,
            Self::Failed => ExecutionStatus::Failed,
            Self::Blocked => ExecutionStatus::Blocked,
            Self::Skipped => ExecutionStatus::Skipped,
        }
    }

    /// Every outcome except `passed` needs a reason.
    pub fn requires_reason(&self) -> bool {
        !matches!(self, Self::Passed)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::Blocked => "Blocked",
            Self::Skipped => "Skipped",
        }
    }
}

/// A step marked as failed, with the tester's reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailedStep {
    pub step_number: i32,
    pub reason: String,
}

/// Details supplied when finalizing an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct FinalizeDetails {
    /// Failure reason for `failed`, explanation for `blocked`/`skipped`.
    #[serde(default)]
    pub reason: Option<String>,
    /// Replaces the execution notes when present.
    #[serde(default)]
    pub notes: Option<String>,
}

impl FinalizeDetails {
    /// The trimmed reason, or an error when the outcome needs one and none was given.
    pub fn validated_reason(&self, outcome: Outcome) -> AppResult<Option<String>> {
        let reason = self
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        if outcome.requires_reason() && reason.is_none() {
            let field = if outcome == Outcome::Failed {
                "failure_reason"
            } else {
                "reason"
            };
            return Err(AppError::InvalidInput(format!(
                "A {} is required to mark a test case as {}",
                field,
                outcome.as_str()
            )));
        }
        Ok(reason)
    }
}

/// One run of one test case inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Execution {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub case: CaseRef,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Sorted, unique step numbers.
    pub completed_steps: Vec<i32>,
    pub failed_steps: Vec<FailedStep>,
    pub execution_notes: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Execution {
    /// A blank execution for a case visited for the first time.
    pub fn open(session: &RunSession, case: CaseRef, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: session.user_id,
            session_id: session.id,
            case,
            status: ExecutionStatus::InProgress,
            started_at: now,
            completed_at: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            execution_notes: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check a status change against the transition table.
    fn ensure_can_move_to(&self, next: ExecutionStatus) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Execution {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        Ok(())
    }

    fn ensure_editable(&self) -> AppResult<()> {
        if self.is_read_only() {
            return Err(AppError::Conflict(format!(
                "Execution {} is {} and read-only",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Flip membership of `step_number` in the completed set.
    /// Returns whether the step is now completed.
    pub fn toggle_step(&mut self, step_number: i32, now: DateTime<Utc>) -> AppResult<bool> {
        self.ensure_editable()?;
        let completed = match self.completed_steps.binary_search(&step_number) {
            Ok(pos) => {
                self.completed_steps.remove(pos);
                false
            }
            Err(pos) => {
                self.completed_steps.insert(pos, step_number);
                true
            }
        };
        self.updated_at = now;
        Ok(completed)
    }

    /// Insert or replace the failure entry for `step_number`.
    pub fn mark_step_failed(
        &mut self,
        step_number: i32,
        reason: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_editable()?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "A reason is required to mark step {} as failed",
                step_number
            )));
        }

        match self
            .failed_steps
            .iter_mut()
            .find(|f| f.step_number == step_number)
        {
            Some(existing) => existing.reason = reason.to_string(),
            None => {
                self.failed_steps.push(FailedStep {
                    step_number,
                    reason: reason.to_string(),
                });
                self.failed_steps.sort_by_key(|f| f.step_number);
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// Remove the failure entry for `step_number`. Returns whether one existed.
    pub fn clear_step_failure(&mut self, step_number: i32, now: DateTime<Utc>) -> AppResult<bool> {
        self.ensure_editable()?;
        let before = self.failed_steps.len();
        self.failed_steps.retain(|f| f.step_number != step_number);
        self.updated_at = now;
        Ok(self.failed_steps.len() != before)
    }

    pub fn set_notes(&mut self, notes: Option<String>, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_editable()?;
        self.execution_notes = notes.filter(|n| !n.trim().is_empty());
        self.updated_at = now;
        Ok(())
    }

    /// Move to a terminal status. Validation happens before any field changes,
    /// so a rejected call leaves the execution untouched.
    pub fn finalize(
        &mut self,
        outcome: Outcome,
        details: &FinalizeDetails,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_can_move_to(outcome.status())?;
        let reason = details.validated_reason(outcome)?;

        let notes = details
            .notes
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.execution_notes.clone());

        match outcome {
            Outcome::Failed => {
                self.failure_reason = reason;
                self.execution_notes = notes;
            }
            Outcome::Blocked | Outcome::Skipped => {
                let reason = reason.unwrap_or_default();
                let line = format!("{}: {}", outcome.label(), reason);
                self.failure_reason = None;
                self.execution_notes = Some(match notes {
                    Some(existing) => format!("{}\n\n{}", existing, line),
                    None => line,
                });
            }
            Outcome::Passed => {
                self.failure_reason = None;
                self.execution_notes = notes;
            }
        }

        self.status = outcome.status();
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Return to a blank `in_progress` state, discarding steps, notes and
    /// failure reason. Returns the outcome that was discarded, if any.
    pub fn reset(&mut self, now: DateTime<Utc>) -> AppResult<Option<Outcome>> {
        self.ensure_can_move_to(ExecutionStatus::InProgress)?;
        let previous = self.status.outcome();
        self.status = ExecutionStatus::InProgress;
        self.started_at = now;
        self.completed_at = None;
        self.completed_steps.clear();
        self.failed_steps.clear();
        self.execution_notes = None;
        self.failure_reason = None;
        self.updated_at = now;
        Ok(previous)
    }
}

/// Request to finalize an execution.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FinalizeRequest {
    pub outcome: Outcome,
    #[serde(flatten)]
    pub details: FinalizeDetails,
}

/// Request to reset an execution. Destructive, so it must be confirmed.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ResetRequest {
    #[serde(default)]
    pub confirm: bool,
}

/// Request to mark a step as failed.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MarkStepFailedRequest {
    pub reason: String,
}

/// Request to replace execution notes.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateNotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of a finalization: the sealed execution, the updated session and,
/// when auto-advance opened one, the next execution.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinalizeResponse {
    pub execution: Execution,
    pub session: RunSession,
    pub next_execution: Option<Execution>,
}

/// Result of a reset.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResetResponse {
    pub execution: Execution,
    pub session: RunSession,
    /// Outcome whose session counter was rolled back, if the execution was finalized.
    pub rolled_back: Option<Outcome>,
}
