//! Per-test executor.
//!
//! Every mutation follows the same shape: claim the execution in the
//! in-flight registry, load and authorize, apply the change to the domain
//! model, persist. Finalize and reset persist the execution together with
//! its session in one transaction.

pub mod shortcuts;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    CounterChange, CurrentUser, Execution, FinalizeRequest, FinalizeResponse,
    ResetRequest, ResetResponse, RunSession, SessionStatus,
};
use crate::repository::{CatalogRepository, RunRepository};

use super::ensure_owner;
use super::guard::InFlight;
use super::session::{SessionController, next_open_index};

pub struct Executor {
    catalog: Arc<dyn CatalogRepository>,
    runs: Arc<dyn RunRepository>,
    sessions: Arc<SessionController>,
    in_flight: InFlight,
}

impl Executor {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        runs: Arc<dyn RunRepository>,
        sessions: Arc<SessionController>,
        in_flight: InFlight,
    ) -> Self {
        Self {
            catalog,
            runs,
            sessions,
            in_flight,
        }
    }

    pub async fn get(&self, user: &CurrentUser, execution_id: Uuid) -> AppResult<Execution> {
        self.owned_execution(user, execution_id).await
    }

    async fn owned_execution(&self, user: &CurrentUser, id: Uuid) -> AppResult<Execution> {
        let execution = self
            .runs
            .get_execution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution {} not found", id)))?;
        ensure_owner(user, execution.user_id, "Execution", id)?;
        Ok(execution)
    }

    /// Execution and its session, with the session required to be running.
    async fn editable(&self, user: &CurrentUser, id: Uuid) -> AppResult<(Execution, RunSession)> {
        let execution = self.owned_execution(user, id).await?;
        let session = self.sessions.owned_session(user, execution.session_id).await?;
        session.ensure_in_progress()?;
        Ok((execution, session))
    }

    async fn ensure_step_exists(&self, execution: &Execution, step_number: i32) -> AppResult<()> {
        let case = self
            .catalog
            .get_test_case(execution.case)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test case {} not found", execution.case)))?;
        if !case.has_step(step_number) {
            return Err(AppError::InvalidInput(format!(
                "Test case has no step {}",
                step_number
            )));
        }
        Ok(())
    }

    pub async fn toggle_step(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        step_number: i32,
    ) -> AppResult<Execution> {
        let _claim = self.in_flight.acquire(execution_id)?;
        let (mut execution, _) = self.editable(user, execution_id).await?;
        self.ensure_step_exists(&execution, step_number).await?;

        execution.toggle_step(step_number, Utc::now())?;
        self.runs.update_execution(&execution).await?;
        Ok(execution)
    }

    pub async fn mark_step_failed(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        step_number: i32,
        reason: &str,
    ) -> AppResult<Execution> {
        let _claim = self.in_flight.acquire(execution_id)?;
        let (mut execution, _) = self.editable(user, execution_id).await?;
        self.ensure_step_exists(&execution, step_number).await?;

        execution.mark_step_failed(step_number, reason, Utc::now())?;
        self.runs.update_execution(&execution).await?;
        Ok(execution)
    }

    pub async fn clear_step_failure(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        step_number: i32,
    ) -> AppResult<Execution> {
        let _claim = self.in_flight.acquire(execution_id)?;
        let (mut execution, _) = self.editable(user, execution_id).await?;

        if execution.clear_step_failure(step_number, Utc::now())? {
            self.runs.update_execution(&execution).await?;
        }
        Ok(execution)
    }

    pub async fn set_notes(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        notes: Option<String>,
    ) -> AppResult<Execution> {
        let _claim = self.in_flight.acquire(execution_id)?;
        let (mut execution, _) = self.editable(user, execution_id).await?;

        execution.set_notes(notes, Utc::now())?;
        self.runs.update_execution(&execution).await?;
        Ok(execution)
    }

    /// Seal an execution with an outcome and count it in its session.
    ///
    /// Nothing is written unless both the execution and the session update
    /// commit. With auto-advance on, the next unfinished case is opened.
    pub async fn finalize(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        req: FinalizeRequest,
    ) -> AppResult<FinalizeResponse> {
        req.details.validated_reason(req.outcome)?;

        let _claim = self.in_flight.acquire(execution_id)?;
        let (mut execution, _) = self.editable(user, execution_id).await?;

        let now = Utc::now();
        execution.finalize(req.outcome, &req.details, now)?;
        let mut session = self
            .runs
            .commit_execution(&execution, Some(CounterChange::Record(req.outcome)), now)
            .await?;

        info!(
            execution_id = %execution.id,
            session_id = %session.id,
            outcome = req.outcome.as_str(),
            completed = session.test_cases_completed,
            total = session.test_cases_total,
            progress = session.progress_percentage,
            "Execution finalized"
        );
        if session.status == SessionStatus::Completed {
            info!(session_id = %session.id, "Session completed");
        }

        let next_execution = if session.status == SessionStatus::InProgress && session.auto_advance
        {
            match self.advance(&mut session).await {
                Ok(next) => next,
                Err(e) => {
                    // The finalization itself is already committed
                    warn!(session_id = %session.id, error = %e, "Auto-advance failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(FinalizeResponse {
            execution,
            session,
            next_execution,
        })
    }

    /// Open the next unfinished case after the current one.
    async fn advance(&self, session: &mut RunSession) -> AppResult<Option<Execution>> {
        let executions = self.runs.list_executions(session.id).await?;
        let current = session.current_index.max(0) as usize;
        let Some(index) = next_open_index(&session.case_order, &executions, current) else {
            return Ok(None);
        };

        let next = self
            .sessions
            .open_or_create(session, session.case_order[index])
            .await?;
        let now = Utc::now();
        self.runs
            .set_current_index(session.id, index as i32, now)
            .await?;
        session.current_index = index as i32;
        session.updated_at = now;
        Ok(Some(next))
    }

    /// Return an execution to a blank `in_progress` state.
    ///
    /// A finalized execution's contribution to the session counters is
    /// rolled back in the same transaction, reopening a completed session.
    pub async fn reset(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        req: ResetRequest,
    ) -> AppResult<ResetResponse> {
        if !req.confirm {
            return Err(AppError::InvalidInput(
                "Reset discards all progress on this test case and must be confirmed".to_string(),
            ));
        }

        let _claim = self.in_flight.acquire(execution_id)?;
        let mut execution = self.owned_execution(user, execution_id).await?;
        let session = self
            .sessions
            .owned_session(user, execution.session_id)
            .await?;
        if !matches!(
            session.status,
            SessionStatus::InProgress | SessionStatus::Completed
        ) {
            return Err(AppError::Conflict(format!(
                "Session {} is {}; resume it before resetting",
                session.id, session.status
            )));
        }

        let now = Utc::now();
        let rolled_back = execution.reset(now)?;
        let session = self
            .runs
            .commit_execution(&execution, rolled_back.map(CounterChange::Revert), now)
            .await?;

        info!(
            execution_id = %execution.id,
            session_id = %session.id,
            rolled_back = rolled_back.map(|o| o.as_str()),
            completed = session.test_cases_completed,
            "Execution reset"
        );

        Ok(ResetResponse {
            execution,
            session,
            rolled_back,
        })
    }
}
