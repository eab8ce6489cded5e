//! Data-access ports.
//!
//! Services depend on these traits rather than on `DbPool` or `Storage`
//! directly. The server wires the PostgreSQL and S3 implementations; tests
//! substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Attachment, CaseRef, CombinedTestCase, CounterChange, Execution, Project, ReportFilter,
    RunSession, SessionStatus, Suite, SuiteTestCase,
};

/// Projects, test cases and suites.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_project(&self, project: &Project) -> AppResult<()>;

    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>>;

    async fn list_projects(&self, user_id: Uuid) -> AppResult<Vec<Project>>;

    async fn insert_test_case(&self, case: &CombinedTestCase) -> AppResult<()>;

    async fn get_test_case(&self, case: CaseRef) -> AppResult<Option<CombinedTestCase>>;

    /// Fetch several cases at once. Missing references are omitted.
    async fn get_test_cases(&self, refs: &[CaseRef]) -> AppResult<Vec<CombinedTestCase>>;

    async fn list_test_cases(&self, project_id: Uuid) -> AppResult<Vec<CombinedTestCase>>;

    async fn insert_suite(&self, suite: &Suite) -> AppResult<()>;

    async fn get_suite(&self, id: Uuid) -> AppResult<Option<Suite>>;

    async fn list_suites(&self, user_id: Uuid, project_id: Option<Uuid>) -> AppResult<Vec<Suite>>;

    /// Fails with `Conflict` if the case is already in the suite.
    async fn insert_suite_case(&self, entry: &SuiteTestCase) -> AppResult<()>;

    /// Entries of a suite in run order.
    async fn list_suite_cases(&self, suite_id: Uuid) -> AppResult<Vec<SuiteTestCase>>;
}

/// Sessions and executions.
#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn insert_session(&self, session: &RunSession) -> AppResult<()>;

    async fn get_session(&self, id: Uuid) -> AppResult<Option<RunSession>>;

    /// Move the session cursor. No other column is written.
    async fn set_current_index(
        &self,
        session_id: Uuid,
        index: i32,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Change the status only if it is still `from`. Returns whether it changed.
    async fn transition_session(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn list_sessions(&self, user_id: Uuid, suite_id: Option<Uuid>)
    -> AppResult<Vec<RunSession>>;

    /// Fails with `Conflict` if the session already has an execution for the case.
    async fn insert_execution(&self, execution: &Execution) -> AppResult<()>;

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<Execution>>;

    async fn find_execution(&self, session_id: Uuid, case: CaseRef)
    -> AppResult<Option<Execution>>;

    async fn list_executions(&self, session_id: Uuid) -> AppResult<Vec<Execution>>;

    async fn update_execution(&self, execution: &Execution) -> AppResult<()>;

    /// Persist an execution and apply `change` to its session in one
    /// transaction. The change is applied to the session row as re-read under
    /// lock, never to a caller's copy; if it is rejected nothing is written.
    /// Returns the session as committed.
    async fn commit_execution(
        &self,
        execution: &Execution,
        change: Option<CounterChange>,
        now: DateTime<Utc>,
    ) -> AppResult<RunSession>;

    /// Terminal executions of a user matching the filter.
    async fn list_finalized_executions(
        &self,
        user_id: Uuid,
        filter: &ReportFilter,
    ) -> AppResult<Vec<Execution>>;
}

/// Attachment metadata rows.
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    async fn insert_attachment(&self, attachment: &Attachment) -> AppResult<()>;

    async fn get_attachment(&self, id: Uuid) -> AppResult<Option<Attachment>>;

    async fn list_attachments(&self, execution_id: Uuid) -> AppResult<Vec<Attachment>>;

    /// Returns whether a row was deleted.
    async fn delete_attachment(&self, id: Uuid) -> AppResult<bool>;
}

/// Private object storage for evidence files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()>;

    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Time-limited GET URL for a private object.
    async fn signed_url(&self, key: &str, expires_in: Duration) -> AppResult<String>;
}
