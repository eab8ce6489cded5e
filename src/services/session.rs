//! Execution session controller.
//!
//! Owns the lifecycle of a run session: start, navigation between cases,
//! pause/resume, and the lazy creation of one execution per visited case.
//! The counters belong to the executor's transactional commit; this module
//! only writes the cursor and the status.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    CaseRef, CurrentUser, Execution, NavigationTarget, RunSession, SessionCaseView,
    SessionSnapshot, SessionStatus, StartSessionRequest,
};
use crate::repository::{CatalogRepository, RunRepository};

use super::{ensure_owner, optional_text};

pub struct SessionController {
    catalog: Arc<dyn CatalogRepository>,
    runs: Arc<dyn RunRepository>,
}

impl SessionController {
    pub fn new(catalog: Arc<dyn CatalogRepository>, runs: Arc<dyn RunRepository>) -> Self {
        Self { catalog, runs }
    }

    /// Start a run of a suite and open its first case.
    pub async fn start(
        &self,
        user: &CurrentUser,
        suite_id: Uuid,
        req: StartSessionRequest,
    ) -> AppResult<SessionSnapshot> {
        let suite = self
            .catalog
            .get_suite(suite_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Suite {} not found", suite_id)))?;
        ensure_owner(user, suite.user_id, "Suite", suite_id)?;

        let entries = self.catalog.list_suite_cases(suite_id).await?;
        if entries.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Suite {} has no test cases to run",
                suite_id
            )));
        }

        let now = Utc::now();
        let name = optional_text(req.name)
            .unwrap_or_else(|| format!("{} - {}", suite.name, now.format("%Y-%m-%d %H:%M")));
        let session = RunSession::start(
            user.user_id,
            suite_id,
            name,
            entries.iter().map(|e| e.case).collect(),
            req.auto_advance.unwrap_or(true),
            now,
        );
        self.runs.insert_session(&session).await?;

        self.open_or_create(&session, session.case_order[0]).await?;

        info!(
            session_id = %session.id,
            suite_id = %suite_id,
            total = session.test_cases_total,
            "Session started"
        );
        self.snapshot(session).await
    }

    /// Current state of a session with its cases in run order.
    pub async fn get(&self, user: &CurrentUser, session_id: Uuid) -> AppResult<SessionSnapshot> {
        let session = self.owned_session(user, session_id).await?;
        self.snapshot(session).await
    }

    /// Move to another case and open its execution.
    ///
    /// Completed sessions can still be browsed; their executions are read-only.
    pub async fn navigate(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
        target: NavigationTarget,
    ) -> AppResult<SessionSnapshot> {
        let mut session = self.owned_session(user, session_id).await?;
        if !matches!(
            session.status,
            SessionStatus::InProgress | SessionStatus::Completed
        ) {
            return Err(AppError::Conflict(format!(
                "Session {} is {}; resume it before navigating",
                session.id, session.status
            )));
        }

        let index = target.resolve(session.current_index, session.case_order.len() as i32)?;
        let case = session.case_order[index as usize];

        if session.status == SessionStatus::Completed {
            self.runs
                .find_execution(session.id, case)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("No execution of {} in session {}", case, session.id))
                })?;
        } else {
            self.open_or_create(&session, case).await?;
        }

        let now = Utc::now();
        self.runs.set_current_index(session.id, index, now).await?;
        session.current_index = index;
        session.updated_at = now;

        self.snapshot(session).await
    }

    pub async fn pause(&self, user: &CurrentUser, session_id: Uuid) -> AppResult<RunSession> {
        let mut session = self.owned_session(user, session_id).await?;
        let from = session.status;
        session.pause(Utc::now())?;
        self.store_transition(&session, from).await?;
        info!(session_id = %session.id, index = session.current_index, "Session paused");
        Ok(session)
    }

    /// Resume at the same index.
    pub async fn resume(&self, user: &CurrentUser, session_id: Uuid) -> AppResult<SessionSnapshot> {
        let mut session = self.owned_session(user, session_id).await?;
        let from = session.status;
        session.resume(Utc::now())?;
        self.store_transition(&session, from).await?;

        if let Some(&case) = session.case_order.get(session.current_index as usize) {
            self.open_or_create(&session, case).await?;
        }

        info!(session_id = %session.id, index = session.current_index, "Session resumed");
        self.snapshot(session).await
    }

    /// Persist a status change made on a loaded copy, failing if the stored
    /// status moved on in the meantime.
    async fn store_transition(&self, session: &RunSession, from: SessionStatus) -> AppResult<()> {
        let changed = self
            .runs
            .transition_session(session.id, from, session.status, session.updated_at)
            .await?;
        if !changed {
            return Err(AppError::Conflict(format!(
                "Session {} changed while moving from {} to {}; reload and retry",
                session.id, from, session.status
            )));
        }
        Ok(())
    }

    pub(crate) async fn owned_session(
        &self,
        user: &CurrentUser,
        session_id: Uuid,
    ) -> AppResult<RunSession> {
        let session = self
            .runs
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;
        ensure_owner(user, session.user_id, "Session", session_id)?;
        Ok(session)
    }

    /// The execution for (session, case), created on first visit.
    ///
    /// Creation races resolve through the unique (session, case) index: the
    /// loser re-reads the winner's row.
    pub(crate) async fn open_or_create(
        &self,
        session: &RunSession,
        case: CaseRef,
    ) -> AppResult<Execution> {
        if let Some(existing) = self.runs.find_execution(session.id, case).await? {
            return Ok(existing);
        }

        let execution = Execution::open(session, case, Utc::now());
        match self.runs.insert_execution(&execution).await {
            Ok(()) => {
                info!(
                    execution_id = %execution.id,
                    session_id = %session.id,
                    case = %case,
                    "Execution opened"
                );
                Ok(execution)
            }
            Err(AppError::Conflict(_)) => self
                .runs
                .find_execution(session.id, case)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict(format!(
                        "Execution of {} in session {} is being created",
                        case, session.id
                    ))
                }),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn snapshot(&self, session: RunSession) -> AppResult<SessionSnapshot> {
        let titles: HashMap<CaseRef, String> = self
            .catalog
            .get_test_cases(&session.case_order)
            .await?
            .into_iter()
            .map(|c| (c.case_ref(), c.title().to_string()))
            .collect();
        let mut executions: HashMap<CaseRef, Execution> = self
            .runs
            .list_executions(session.id)
            .await?
            .into_iter()
            .map(|e| (e.case, e))
            .collect();

        let cases: Vec<SessionCaseView> = session
            .case_order
            .iter()
            .enumerate()
            .map(|(index, case)| SessionCaseView {
                index: index as i32,
                case: *case,
                title: titles.get(case).cloned().unwrap_or_default(),
                execution: executions.remove(case),
            })
            .collect();

        let current_execution = cases
            .get(session.current_index as usize)
            .and_then(|c| c.execution.clone());

        Ok(SessionSnapshot {
            session,
            cases,
            current_execution,
        })
    }
}

/// Index of the next case to open after `current`: the first one in run
/// order, wrapping around, without a finalized execution.
pub fn next_open_index(
    case_order: &[CaseRef],
    executions: &[Execution],
    current: usize,
) -> Option<usize> {
    let total = case_order.len();
    if total == 0 {
        return None;
    }
    let finished: Vec<CaseRef> = executions
        .iter()
        .filter(|e| e.status.is_terminal())
        .map(|e| e.case)
        .collect();

    (1..=total)
        .map(|offset| (current + offset) % total)
        .find(|&i| !finished.contains(&case_order[i]))
}
