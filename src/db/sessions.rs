//! Database queries for run sessions.
//!
//! Outside of `commit_execution` the counters are never written: cursor moves
//! and status changes update their own columns only.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entity::run_session::{self, ActiveModel, Entity as Session};
use crate::error::{AppError, AppResult};
use crate::models::{CaseRef, RunSession, SessionStatus};

use super::{DbPool, from_json, parse_column, read_error, to_json, write_error};

impl TryFrom<run_session::Model> for RunSession {
    type Error = AppError;

    fn try_from(m: run_session::Model) -> AppResult<Self> {
        let case_order: Vec<CaseRef> = from_json("case_order", m.case_order)?;
        Ok(RunSession {
            id: m.id,
            user_id: m.user_id,
            suite_id: m.suite_id,
            name: m.name,
            status: parse_column("session status", &m.status, SessionStatus::parse)?,
            test_cases_total: m.test_cases_total,
            test_cases_completed: m.test_cases_completed,
            progress_percentage: m.progress_percentage,
            passed_cases: m.passed_cases,
            failed_cases: m.failed_cases,
            blocked_cases: m.blocked_cases,
            skipped_cases: m.skipped_cases,
            current_index: m.current_index,
            auto_advance: m.auto_advance,
            case_order,
            actual_start: m.actual_start,
            actual_end: m.actual_end,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

fn session_active_model(s: &RunSession) -> AppResult<ActiveModel> {
    Ok(ActiveModel {
        id: Set(s.id),
        user_id: Set(s.user_id),
        suite_id: Set(s.suite_id),
        name: Set(s.name.clone()),
        status: Set(s.status.as_str().to_string()),
        test_cases_total: Set(s.test_cases_total),
        test_cases_completed: Set(s.test_cases_completed),
        progress_percentage: Set(s.progress_percentage),
        passed_cases: Set(s.passed_cases),
        failed_cases: Set(s.failed_cases),
        blocked_cases: Set(s.blocked_cases),
        skipped_cases: Set(s.skipped_cases),
        current_index: Set(s.current_index),
        auto_advance: Set(s.auto_advance),
        case_order: Set(to_json("case_order", &s.case_order)?),
        actual_start: Set(s.actual_start),
        actual_end: Set(s.actual_end),
        created_at: Set(s.created_at),
        updated_at: Set(s.updated_at),
    })
}

/// Only the columns an outcome change touches.
pub(super) fn counters_active_model(s: &RunSession) -> ActiveModel {
    ActiveModel {
        id: Set(s.id),
        status: Set(s.status.as_str().to_string()),
        test_cases_completed: Set(s.test_cases_completed),
        progress_percentage: Set(s.progress_percentage),
        passed_cases: Set(s.passed_cases),
        failed_cases: Set(s.failed_cases),
        blocked_cases: Set(s.blocked_cases),
        skipped_cases: Set(s.skipped_cases),
        actual_end: Set(s.actual_end),
        updated_at: Set(s.updated_at),
        ..Default::default()
    }
}

/// Map an update error; a missing row becomes `NotFound`.
pub(super) fn update_error(what: &str, id: Uuid, err: DbErr) -> AppError {
    match err {
        DbErr::RecordNotUpdated => AppError::NotFound(format!("{} {} not found", what, id)),
        other => write_error(&format!("update {}", what.to_lowercase()), other),
    }
}

/// Read a session and hold its row lock until the transaction ends.
pub(super) async fn lock_session<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<RunSession> {
    Session::find_by_id(id)
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(|e| read_error("lock session", e))?
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))
        .and_then(RunSession::try_from)
}

impl DbPool {
    pub(super) async fn insert_session_row(&self, session: &RunSession) -> AppResult<()> {
        session_active_model(session)?
            .insert(self.connection())
            .await
            .map_err(|e| write_error("insert session", e))?;
        Ok(())
    }

    pub(super) async fn get_session_row(&self, id: Uuid) -> AppResult<Option<RunSession>> {
        Session::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| read_error("get session", e))?
            .map(RunSession::try_from)
            .transpose()
    }

    pub(super) async fn set_session_index(
        &self,
        id: Uuid,
        index: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = Session::update_many()
            .col_expr(run_session::Column::CurrentIndex, Expr::value(index))
            .col_expr(run_session::Column::UpdatedAt, Expr::value(now))
            .filter(run_session::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| write_error("move session cursor", e))?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Session {} not found", id)));
        }
        Ok(())
    }

    /// `UPDATE .. SET status = to WHERE status = from`; false when another
    /// writer moved the session first.
    pub(super) async fn compare_and_set_status(
        &self,
        id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = Session::update_many()
            .col_expr(run_session::Column::Status, Expr::value(to.as_str()))
            .col_expr(run_session::Column::UpdatedAt, Expr::value(now))
            .filter(run_session::Column::Id.eq(id))
            .filter(run_session::Column::Status.eq(from.as_str()))
            .exec(self.connection())
            .await
            .map_err(|e| write_error("update session status", e))?;
        Ok(result.rows_affected == 1)
    }

    pub(super) async fn list_session_rows(
        &self,
        user_id: Uuid,
        suite_id: Option<Uuid>,
    ) -> AppResult<Vec<RunSession>> {
        let mut query = Session::find().filter(run_session::Column::UserId.eq(user_id));
        if let Some(suite_id) = suite_id {
            query = query.filter(run_session::Column::SuiteId.eq(suite_id));
        }

        query
            .order_by_desc(run_session::Column::Id) // UUIDv7, newest first
            .all(self.connection())
            .await
            .map_err(|e| read_error("list sessions", e))?
            .into_iter()
            .map(RunSession::try_from)
            .collect()
    }
}
