//! Projects, test cases and suites.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::catalog::sort_run_order;
use crate::models::test_case::normalize_steps;
use crate::models::{
    AddSuiteCaseRequest, CaseKind, CaseRef, CombinedTestCase, CreateProjectRequest,
    CreateSuiteRequest, CreateTestCaseRequest, CrossPlatformCase, CurrentUser, ListSuitesQuery,
    Project, RegularCase, Suite, SuiteDetail, SuiteEntryDetail, SuiteTestCase,
};
use crate::repository::CatalogRepository;

use super::{ensure_owner, optional_text, required_text};

const MAX_NAME_LEN: usize = 200;
const MAX_TITLE_LEN: usize = 500;

pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    pub async fn create_project(
        &self,
        user: &CurrentUser,
        req: CreateProjectRequest,
    ) -> AppResult<Project> {
        let project = Project {
            id: Uuid::now_v7(),
            user_id: user.user_id,
            name: required_text("name", &req.name, MAX_NAME_LEN)?,
            description: optional_text(req.description),
            created_at: Utc::now(),
        };
        self.catalog.insert_project(&project).await?;
        info!(project_id = %project.id, user_id = %user.user_id, "Project created");
        Ok(project)
    }

    pub async fn list_projects(&self, user: &CurrentUser) -> AppResult<Vec<Project>> {
        self.catalog.list_projects(user.user_id).await
    }

    async fn owned_project(&self, user: &CurrentUser, id: Uuid) -> AppResult<Project> {
        let project = self
            .catalog
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;
        ensure_owner(user, project.user_id, "Project", id)?;
        Ok(project)
    }

    pub async fn create_test_case(
        &self,
        user: &CurrentUser,
        project_id: Uuid,
        req: CreateTestCaseRequest,
    ) -> AppResult<CombinedTestCase> {
        let title = required_text("title", &req.title, MAX_TITLE_LEN)?;
        let test_steps = normalize_steps(req.test_steps)?;
        self.owned_project(user, project_id).await?;

        let id = Uuid::now_v7();
        let created_at = Utc::now();
        let case = match req.case_type {
            CaseKind::Regular => CombinedTestCase::Regular(RegularCase {
                id,
                user_id: user.user_id,
                project_id,
                title,
                description: optional_text(req.description),
                test_steps,
                expected_result: optional_text(req.expected_result),
                priority: req.priority,
                created_at,
            }),
            CaseKind::CrossPlatform => {
                let platform = req.platform.ok_or_else(|| {
                    AppError::InvalidInput(
                        "platform is required for cross-platform test cases".to_string(),
                    )
                })?;
                CombinedTestCase::CrossPlatform(CrossPlatformCase {
                    id,
                    user_id: user.user_id,
                    project_id,
                    title,
                    description: optional_text(req.description),
                    platform,
                    preconditions: optional_text(req.preconditions),
                    test_steps,
                    expected_result: optional_text(req.expected_result),
                    priority: req.priority,
                    created_at,
                })
            }
        };

        self.catalog.insert_test_case(&case).await?;
        info!(case = %case.case_ref(), project_id = %project_id, "Test case created");
        Ok(case)
    }

    pub async fn list_test_cases(
        &self,
        user: &CurrentUser,
        project_id: Uuid,
    ) -> AppResult<Vec<CombinedTestCase>> {
        self.owned_project(user, project_id).await?;
        self.catalog.list_test_cases(project_id).await
    }

    pub async fn get_test_case(
        &self,
        user: &CurrentUser,
        case: CaseRef,
    ) -> AppResult<CombinedTestCase> {
        let found = self
            .catalog
            .get_test_case(case)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test case {} not found", case)))?;
        ensure_owner(user, found.user_id(), "Test case", case.id)?;
        Ok(found)
    }

    pub async fn create_suite(
        &self,
        user: &CurrentUser,
        req: CreateSuiteRequest,
    ) -> AppResult<Suite> {
        let name = required_text("name", &req.name, MAX_NAME_LEN)?;
        self.owned_project(user, req.project_id).await?;

        let suite = Suite {
            id: Uuid::now_v7(),
            user_id: user.user_id,
            project_id: req.project_id,
            name,
            description: optional_text(req.description),
            created_at: Utc::now(),
        };
        self.catalog.insert_suite(&suite).await?;
        info!(suite_id = %suite.id, project_id = %suite.project_id, "Suite created");
        Ok(suite)
    }

    pub async fn list_suites(
        &self,
        user: &CurrentUser,
        query: ListSuitesQuery,
    ) -> AppResult<Vec<Suite>> {
        self.catalog.list_suites(user.user_id, query.project_id).await
    }

    /// Load a suite, checking ownership.
    pub async fn owned_suite(&self, user: &CurrentUser, id: Uuid) -> AppResult<Suite> {
        let suite = self
            .catalog
            .get_suite(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Suite {} not found", id)))?;
        ensure_owner(user, suite.user_id, "Suite", id)?;
        Ok(suite)
    }

    pub async fn get_suite(&self, user: &CurrentUser, id: Uuid) -> AppResult<SuiteDetail> {
        let suite = self.owned_suite(user, id).await?;
        let entries = self.catalog.list_suite_cases(id).await?;
        let refs: Vec<CaseRef> = entries.iter().map(|e| e.case).collect();
        let mut cases: HashMap<CaseRef, CombinedTestCase> = self
            .catalog
            .get_test_cases(&refs)
            .await?
            .into_iter()
            .map(|c| (c.case_ref(), c))
            .collect();

        // Entries whose case row is gone are left out
        let details: Vec<SuiteEntryDetail> = entries
            .into_iter()
            .filter_map(|entry| {
                cases.remove(&entry.case).map(|test_case| SuiteEntryDetail { entry, test_case })
            })
            .collect();

        let estimated_duration_minutes = details
            .iter()
            .filter_map(|d| d.entry.estimated_duration_minutes)
            .sum();

        Ok(SuiteDetail {
            suite,
            cases: details,
            estimated_duration_minutes,
        })
    }

    pub async fn add_case(
        &self,
        user: &CurrentUser,
        suite_id: Uuid,
        req: AddSuiteCaseRequest,
    ) -> AppResult<SuiteTestCase> {
        let case = CaseRef::from_columns(req.test_case_id, req.platform_test_case_id)?;
        if let Some(minutes) = req.estimated_duration_minutes
            && minutes < 0
        {
            return Err(AppError::InvalidInput(
                "estimated_duration_minutes must not be negative".to_string(),
            ));
        }

        self.owned_suite(user, suite_id).await?;
        self.get_test_case(user, case).await?;

        let mut entries = self.catalog.list_suite_cases(suite_id).await?;
        if entries.iter().any(|e| e.case == case) {
            return Err(AppError::Conflict(format!(
                "Test case {} is already in suite {}",
                case, suite_id
            )));
        }

        let sequence_order = match req.sequence_order {
            Some(order) => order,
            None => entries.iter().map(|e| e.sequence_order).max().map_or(0, |m| m + 1),
        };

        let entry = SuiteTestCase {
            id: Uuid::now_v7(),
            suite_id,
            case,
            sequence_order,
            priority: req.priority,
            estimated_duration_minutes: req.estimated_duration_minutes,
            created_at: Utc::now(),
        };
        self.catalog.insert_suite_case(&entry).await?;

        entries.push(entry.clone());
        sort_run_order(&mut entries);
        info!(
            suite_id = %suite_id,
            case = %case,
            position = entries.iter().position(|e| e.id == entry.id).unwrap_or_default(),
            "Test case added to suite"
        );
        Ok(entry)
    }
}
