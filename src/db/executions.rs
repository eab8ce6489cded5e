//! Database queries for executions, and the `RunRepository` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entity::execution::{self, ActiveModel, Entity as ExecutionEntity};
use crate::entity::run_session::{self, Entity as Session};
use crate::error::{AppError, AppResult};
use crate::models::{
    CaseKind, CaseRef, CounterChange, Execution, ExecutionStatus, FailedStep, ReportFilter,
    RunSession, SessionStatus,
};
use crate::repository::RunRepository;

use super::sessions::{counters_active_model, lock_session, update_error};
use super::{DbPool, from_json, parse_column, read_error, to_json, write_error};

impl TryFrom<execution::Model> for Execution {
    type Error = AppError;

    fn try_from(m: execution::Model) -> AppResult<Self> {
        let mut completed_steps: Vec<i32> = from_json("completed_steps", m.completed_steps)?;
        completed_steps.sort_unstable();
        completed_steps.dedup();
        let failed_steps: Vec<FailedStep> = from_json("failed_steps", m.failed_steps)?;

        Ok(Execution {
            id: m.id,
            user_id: m.user_id,
            session_id: m.session_id,
            case: CaseRef::from_columns(m.test_case_id, m.platform_test_case_id)?,
            status: parse_column("execution status", &m.status, ExecutionStatus::parse)?,
            started_at: m.started_at,
            completed_at: m.completed_at,
            completed_steps,
            failed_steps,
            execution_notes: m.execution_notes,
            failure_reason: m.failure_reason,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

fn execution_active_model(e: &Execution) -> AppResult<ActiveModel> {
    let (test_case_id, platform_test_case_id) = e.case.to_columns();
    Ok(ActiveModel {
        id: Set(e.id),
        user_id: Set(e.user_id),
        session_id: Set(e.session_id),
        test_case_id: Set(test_case_id),
        platform_test_case_id: Set(platform_test_case_id),
        status: Set(e.status.as_str().to_string()),
        started_at: Set(e.started_at),
        completed_at: Set(e.completed_at),
        completed_steps: Set(to_json("completed_steps", &e.completed_steps)?),
        failed_steps: Set(to_json("failed_steps", &e.failed_steps)?),
        execution_notes: Set(e.execution_notes.clone()),
        failure_reason: Set(e.failure_reason.clone()),
        created_at: Set(e.created_at),
        updated_at: Set(e.updated_at),
        deleted_at: Set(None),
    })
}

#[async_trait]
impl RunRepository for DbPool {
    async fn insert_session(&self, session: &RunSession) -> AppResult<()> {
        self.insert_session_row(session).await
    }

    async fn get_session(&self, id: Uuid) -> AppResult<Option<RunSession>> {
        self.get_session_row(id).await
    }

    async fn set_current_index(
        &self,
        session_id: Uuid,
        index: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.set_session_index(session_id, index, now).await
    }

    async fn transition_session(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.compare_and_set_status(session_id, from, to, now).await
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        suite_id: Option<Uuid>,
    ) -> AppResult<Vec<RunSession>> {
        self.list_session_rows(user_id, suite_id).await
    }

    async fn insert_execution(&self, e: &Execution) -> AppResult<()> {
        execution_active_model(e)?
            .insert(self.connection())
            .await
            .map_err(|err| write_error("insert execution", err))?;
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<Execution>> {
        ExecutionEntity::find_by_id(id)
            .filter(execution::Column::DeletedAt.is_null())
            .one(self.connection())
            .await
            .map_err(|e| read_error("get execution", e))?
            .map(Execution::try_from)
            .transpose()
    }

    async fn find_execution(
        &self,
        session_id: Uuid,
        case: CaseRef,
    ) -> AppResult<Option<Execution>> {
        let case_column = match case.kind {
            CaseKind::Regular => execution::Column::TestCaseId,
            CaseKind::CrossPlatform => execution::Column::PlatformTestCaseId,
        };

        ExecutionEntity::find()
            .filter(execution::Column::SessionId.eq(session_id))
            .filter(case_column.eq(case.id))
            .filter(execution::Column::DeletedAt.is_null())
            .one(self.connection())
            .await
            .map_err(|e| read_error("find execution", e))?
            .map(Execution::try_from)
            .transpose()
    }

    async fn list_executions(&self, session_id: Uuid) -> AppResult<Vec<Execution>> {
        ExecutionEntity::find()
            .filter(execution::Column::SessionId.eq(session_id))
            .filter(execution::Column::DeletedAt.is_null())
            .order_by_asc(execution::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list executions", e))?
            .into_iter()
            .map(Execution::try_from)
            .collect()
    }

    async fn update_execution(&self, e: &Execution) -> AppResult<()> {
        execution_active_model(e)?
            .update(self.connection())
            .await
            .map_err(|err| update_error("Execution", e.id, err))?;
        Ok(())
    }

    async fn commit_execution(
        &self,
        e: &Execution,
        change: Option<CounterChange>,
        now: DateTime<Utc>,
    ) -> AppResult<RunSession> {
        let txn = self
            .connection()
            .begin()
            .await
            .map_err(|err| AppError::Database(format!("Failed to begin transaction: {}", err)))?;

        // Concurrent finalizes in the same session serialize on this lock
        let mut session = lock_session(&txn, e.session_id).await?;
        if let Some(change) = change {
            session.apply(change, now)?;
            counters_active_model(&session)
                .update(&txn)
                .await
                .map_err(|err| update_error("Session", session.id, err))?;
        }

        execution_active_model(e)?
            .update(&txn)
            .await
            .map_err(|err| update_error("Execution", e.id, err))?;

        // Dropping `txn` on an error path above rolls back
        txn.commit()
            .await
            .map_err(|err| AppError::Database(format!("Failed to commit transaction: {}", err)))?;

        debug!(
            execution_id = %e.id,
            session_id = %session.id,
            status = %e.status,
            completed = session.test_cases_completed,
            "Committed execution and session"
        );
        Ok(session)
    }

    async fn list_finalized_executions(
        &self,
        user_id: Uuid,
        filter: &ReportFilter,
    ) -> AppResult<Vec<Execution>> {
        let mut query = ExecutionEntity::find()
            .filter(execution::Column::UserId.eq(user_id))
            .filter(execution::Column::DeletedAt.is_null())
            .filter(execution::Column::Status.ne(ExecutionStatus::InProgress.as_str()));

        if let Some(from) = filter.from_date {
            query = query.filter(execution::Column::CompletedAt.gte(from));
        }
        if let Some(to) = filter.to_date {
            query = query.filter(execution::Column::CompletedAt.lte(to));
        }
        if let Some(suite_id) = filter.suite_id {
            query = query
                .inner_join(Session)
                .filter(run_session::Column::SuiteId.eq(suite_id));
        }

        query
            .order_by_asc(execution::Column::CompletedAt)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list finalized executions", e))?
            .into_iter()
            .map(Execution::try_from)
            .collect()
    }
}
