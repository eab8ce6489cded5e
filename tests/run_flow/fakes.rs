//! In-memory implementations of the data-access ports.
//!
//! Each fake can be told to fail specific writes so the tests can check
//! that a failed step leaves nothing half-written. `yield_on_read` makes
//! session and execution reads give way to the scheduler, so requests joined
//! in one test interleave between their read and their write.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tcm_lib::error::{AppError, AppResult};
use tcm_lib::models::catalog::sort_run_order;
use tcm_lib::models::{
    Attachment, CaseRef, CombinedTestCase, CounterChange, Execution, Project, ReportFilter,
    RunSession, SessionStatus, Suite, SuiteTestCase,
};
use tcm_lib::repository::{AttachmentRepository, CatalogRepository, ObjectStore, RunRepository};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    projects: Vec<Project>,
    cases: Vec<CombinedTestCase>,
    suites: Vec<Suite>,
    suite_cases: Vec<SuiteTestCase>,
    sessions: HashMap<Uuid, RunSession>,
    executions: Vec<Execution>,
    attachments: Vec<Attachment>,
}

/// Catalog, runs and attachment rows behind one lock.
#[derive(Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
    pub fail_commit: AtomicBool,
    pub fail_attachment_insert: AtomicBool,
    pub yield_on_read: AtomicBool,
}

impl MemoryDb {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    async fn give_way(&self) {
        if self.yield_on_read.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    pub fn session(&self, id: Uuid) -> RunSession {
        self.tables().sessions[&id].clone()
    }

    pub fn executions_of(&self, session_id: Uuid) -> Vec<Execution> {
        self.tables()
            .executions
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn attachment_count(&self) -> usize {
        self.tables().attachments.len()
    }

    /// Rewrite an execution's completion time, for date-range reports.
    pub fn backdate_execution(&self, id: Uuid, completed_at: chrono::DateTime<chrono::Utc>) {
        let mut tables = self.tables();
        if let Some(e) = tables.executions.iter_mut().find(|e| e.id == id) {
            e.completed_at = Some(completed_at);
        }
    }
}

fn injected(what: &str) -> AppError {
    AppError::Database(format!("injected failure: {}", what))
}

#[async_trait]
impl CatalogRepository for MemoryDb {
    async fn insert_project(&self, project: &Project) -> AppResult<()> {
        self.tables().projects.push(project.clone());
        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        Ok(self.tables().projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects(&self, user_id: Uuid) -> AppResult<Vec<Project>> {
        Ok(self
            .tables()
            .projects
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_test_case(&self, case: &CombinedTestCase) -> AppResult<()> {
        self.tables().cases.push(case.clone());
        Ok(())
    }

    async fn get_test_case(&self, case: CaseRef) -> AppResult<Option<CombinedTestCase>> {
        Ok(self
            .tables()
            .cases
            .iter()
            .find(|c| c.case_ref() == case)
            .cloned())
    }

    async fn get_test_cases(&self, refs: &[CaseRef]) -> AppResult<Vec<CombinedTestCase>> {
        let tables = self.tables();
        Ok(refs
            .iter()
            .filter_map(|r| tables.cases.iter().find(|c| c.case_ref() == *r).cloned())
            .collect())
    }

    async fn list_test_cases(&self, project_id: Uuid) -> AppResult<Vec<CombinedTestCase>> {
        Ok(self
            .tables()
            .cases
            .iter()
            .filter(|c| c.project_id() == project_id)
            .cloned()
            .collect())
    }

    async fn insert_suite(&self, suite: &Suite) -> AppResult<()> {
        self.tables().suites.push(suite.clone());
        Ok(())
    }

    async fn get_suite(&self, id: Uuid) -> AppResult<Option<Suite>> {
        Ok(self.tables().suites.iter().find(|s| s.id == id).cloned())
    }

    async fn list_suites(&self, user_id: Uuid, project_id: Option<Uuid>) -> AppResult<Vec<Suite>> {
        Ok(self
            .tables()
            .suites
            .iter()
            .filter(|s| s.user_id == user_id)
            .filter(|s| project_id.is_none_or(|p| s.project_id == p))
            .cloned()
            .collect())
    }

    async fn insert_suite_case(&self, entry: &SuiteTestCase) -> AppResult<()> {
        let mut tables = self.tables();
        if tables
            .suite_cases
            .iter()
            .any(|e| e.suite_id == entry.suite_id && e.case == entry.case)
        {
            return Err(AppError::Conflict("duplicate suite entry".to_string()));
        }
        tables.suite_cases.push(entry.clone());
        Ok(())
    }

    async fn list_suite_cases(&self, suite_id: Uuid) -> AppResult<Vec<SuiteTestCase>> {
        let mut entries: Vec<SuiteTestCase> = self
            .tables()
            .suite_cases
            .iter()
            .filter(|e| e.suite_id == suite_id)
            .cloned()
            .collect();
        sort_run_order(&mut entries);
        Ok(entries)
    }
}

#[async_trait]
impl RunRepository for MemoryDb {
    async fn insert_session(&self, session: &RunSession) -> AppResult<()> {
        self.tables().sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> AppResult<Option<RunSession>> {
        let session = self.tables().sessions.get(&id).cloned();
        self.give_way().await;
        Ok(session)
    }

    async fn set_current_index(
        &self,
        session_id: Uuid,
        index: i32,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<()> {
        let mut tables = self.tables();
        let Some(row) = tables.sessions.get_mut(&session_id) else {
            return Err(AppError::NotFound(format!("Session {} not found", session_id)));
        };
        row.current_index = index;
        row.updated_at = now;
        Ok(())
    }

    async fn transition_session(
        &self,
        session_id: Uuid,
        from: SessionStatus,
        to: SessionStatus,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<bool> {
        let mut tables = self.tables();
        let Some(row) = tables.sessions.get_mut(&session_id) else {
            return Err(AppError::NotFound(format!("Session {} not found", session_id)));
        };
        if row.status != from {
            return Ok(false);
        }
        row.status = to;
        row.updated_at = now;
        Ok(true)
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        suite_id: Option<Uuid>,
    ) -> AppResult<Vec<RunSession>> {
        Ok(self
            .tables()
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| suite_id.is_none_or(|id| s.suite_id == id))
            .cloned()
            .collect())
    }

    async fn insert_execution(&self, execution: &Execution) -> AppResult<()> {
        let mut tables = self.tables();
        if tables
            .executions
            .iter()
            .any(|e| e.session_id == execution.session_id && e.case == execution.case)
        {
            return Err(AppError::Conflict("duplicate execution".to_string()));
        }
        tables.executions.push(execution.clone());
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> AppResult<Option<Execution>> {
        let execution = self.tables().executions.iter().find(|e| e.id == id).cloned();
        self.give_way().await;
        Ok(execution)
    }

    async fn find_execution(
        &self,
        session_id: Uuid,
        case: CaseRef,
    ) -> AppResult<Option<Execution>> {
        Ok(self
            .tables()
            .executions
            .iter()
            .find(|e| e.session_id == session_id && e.case == case)
            .cloned())
    }

    async fn list_executions(&self, session_id: Uuid) -> AppResult<Vec<Execution>> {
        Ok(self.executions_of(session_id))
    }

    async fn update_execution(&self, execution: &Execution) -> AppResult<()> {
        let mut tables = self.tables();
        match tables.executions.iter_mut().find(|e| e.id == execution.id) {
            Some(row) => {
                *row = execution.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Execution {} not found",
                execution.id
            ))),
        }
    }

    async fn commit_execution(
        &self,
        execution: &Execution,
        change: Option<CounterChange>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<RunSession> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(injected("commit"));
        }
        let mut tables = self.tables();
        let Some(mut session) = tables.sessions.get(&execution.session_id).cloned() else {
            return Err(AppError::NotFound(format!(
                "Session {} not found",
                execution.session_id
            )));
        };
        if let Some(change) = change {
            session.apply(change, now)?;
        }
        let Some(row) = tables.executions.iter_mut().find(|e| e.id == execution.id) else {
            return Err(AppError::NotFound(format!(
                "Execution {} not found",
                execution.id
            )));
        };
        *row = execution.clone();
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn list_finalized_executions(
        &self,
        user_id: Uuid,
        filter: &ReportFilter,
    ) -> AppResult<Vec<Execution>> {
        let tables = self.tables();
        Ok(tables
            .executions
            .iter()
            .filter(|e| e.user_id == user_id && e.status.is_terminal())
            .filter(|e| {
                filter.suite_id.is_none_or(|suite_id| {
                    tables
                        .sessions
                        .get(&e.session_id)
                        .is_some_and(|s| s.suite_id == suite_id)
                })
            })
            .filter(|e| match (filter.from_date, e.completed_at) {
                (Some(from), Some(at)) => at >= from,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|e| match (filter.to_date, e.completed_at) {
                (Some(to), Some(at)) => at <= to,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AttachmentRepository for MemoryDb {
    async fn insert_attachment(&self, attachment: &Attachment) -> AppResult<()> {
        if self.fail_attachment_insert.load(Ordering::SeqCst) {
            return Err(injected("attachment insert"));
        }
        self.tables().attachments.push(attachment.clone());
        Ok(())
    }

    async fn get_attachment(&self, id: Uuid) -> AppResult<Option<Attachment>> {
        Ok(self.tables().attachments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_attachments(&self, execution_id: Uuid) -> AppResult<Vec<Attachment>> {
        Ok(self
            .tables()
            .attachments
            .iter()
            .filter(|a| a.execution_id == execution_id)
            .cloned()
            .collect())
    }

    async fn delete_attachment(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables();
        let before = tables.attachments.len();
        tables.attachments.retain(|a| a.id != id);
        Ok(tables.attachments.len() != before)
    }
}

/// Object store keeping bytes in a map.
#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl MemoryObjects {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(d, _)| d.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> AppResult<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected failure: put".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected failure: delete".to_string()));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> AppResult<String> {
        Ok(format!(
            "https://evidence.test/{}?X-Amz-Expires={}",
            key,
            expires_in.as_secs()
        ))
    }
}
