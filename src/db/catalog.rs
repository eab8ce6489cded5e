//! Database queries for projects, test cases and suites.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::entity::platform_test_case::{self as platform_case, Entity as PlatformCase};
use crate::entity::project::{self, Entity as ProjectEntity};
use crate::entity::suite::{self, Entity as SuiteEntity};
use crate::entity::suite_test_case::{self as suite_case, Entity as SuiteCase};
use crate::entity::test_case::{self as regular_case, Entity as RegularCaseEntity};
use crate::error::AppResult;
use crate::models::catalog::sort_run_order;
use crate::models::{
    CaseKind, CaseRef, CombinedTestCase, CrossPlatformCase, Platform, Priority, Project,
    RegularCase, Suite, SuiteTestCase,
};
use crate::repository::CatalogRepository;

use super::{DbPool, from_json, parse_column, read_error, to_json, write_error};

impl From<project::Model> for Project {
    fn from(m: project::Model) -> Self {
        Project {
            id: m.id,
            user_id: m.user_id,
            name: m.name,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

impl From<suite::Model> for Suite {
    fn from(m: suite::Model) -> Self {
        Suite {
            id: m.id,
            user_id: m.user_id,
            project_id: m.project_id,
            name: m.name,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

impl TryFrom<regular_case::Model> for CombinedTestCase {
    type Error = crate::error::AppError;

    fn try_from(m: regular_case::Model) -> AppResult<Self> {
        Ok(CombinedTestCase::Regular(RegularCase {
            id: m.id,
            user_id: m.user_id,
            project_id: m.project_id,
            title: m.title,
            description: m.description,
            test_steps: from_json("test_steps", m.test_steps)?,
            expected_result: m.expected_result,
            priority: parse_column("priority", &m.priority, Priority::parse)?,
            created_at: m.created_at,
        }))
    }
}

impl TryFrom<platform_case::Model> for CombinedTestCase {
    type Error = crate::error::AppError;

    fn try_from(m: platform_case::Model) -> AppResult<Self> {
        Ok(CombinedTestCase::CrossPlatform(CrossPlatformCase {
            id: m.id,
            user_id: m.user_id,
            project_id: m.project_id,
            title: m.title,
            description: m.description,
            platform: parse_column("platform", &m.platform, Platform::parse)?,
            preconditions: m.preconditions,
            test_steps: from_json("test_steps", m.test_steps)?,
            expected_result: m.expected_result,
            priority: parse_column("priority", &m.priority, Priority::parse)?,
            created_at: m.created_at,
        }))
    }
}

impl TryFrom<suite_case::Model> for SuiteTestCase {
    type Error = crate::error::AppError;

    fn try_from(m: suite_case::Model) -> AppResult<Self> {
        Ok(SuiteTestCase {
            id: m.id,
            suite_id: m.suite_id,
            case: CaseRef::from_columns(m.test_case_id, m.platform_test_case_id)?,
            sequence_order: m.sequence_order,
            priority: parse_column("priority", &m.priority, Priority::parse)?,
            estimated_duration_minutes: m.estimated_duration_minutes,
            created_at: m.created_at,
        })
    }
}

#[async_trait]
impl CatalogRepository for DbPool {
    async fn insert_project(&self, p: &Project) -> AppResult<()> {
        let model = project::ActiveModel {
            id: Set(p.id),
            user_id: Set(p.user_id),
            name: Set(p.name.clone()),
            description: Set(p.description.clone()),
            created_at: Set(p.created_at),
            updated_at: Set(p.created_at),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| write_error("insert project", e))?;

        Ok(())
    }

    async fn get_project(&self, id: Uuid) -> AppResult<Option<Project>> {
        let result = ProjectEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| read_error("get project", e))?;

        Ok(result.map(Project::from))
    }

    async fn list_projects(&self, user_id: Uuid) -> AppResult<Vec<Project>> {
        let result = ProjectEntity::find()
            .filter(project::Column::UserId.eq(user_id))
            .order_by_asc(project::Column::Id) // UUIDv7 is time-ordered
            .all(self.connection())
            .await
            .map_err(|e| read_error("list projects", e))?;

        Ok(result.into_iter().map(Project::from).collect())
    }

    async fn insert_test_case(&self, case: &CombinedTestCase) -> AppResult<()> {
        match case {
            CombinedTestCase::Regular(c) => {
                let model = regular_case::ActiveModel {
                    id: Set(c.id),
                    user_id: Set(c.user_id),
                    project_id: Set(c.project_id),
                    title: Set(c.title.clone()),
                    description: Set(c.description.clone()),
                    test_steps: Set(to_json("test_steps", &c.test_steps)?),
                    expected_result: Set(c.expected_result.clone()),
                    priority: Set(c.priority.as_str().to_string()),
                    created_at: Set(c.created_at),
                    updated_at: Set(c.created_at),
                };
                model
                    .insert(self.connection())
                    .await
                    .map_err(|e| write_error("insert test case", e))?;
            }
            CombinedTestCase::CrossPlatform(c) => {
                let model = platform_case::ActiveModel {
                    id: Set(c.id),
                    user_id: Set(c.user_id),
                    project_id: Set(c.project_id),
                    title: Set(c.title.clone()),
                    description: Set(c.description.clone()),
                    platform: Set(c.platform.as_str().to_string()),
                    preconditions: Set(c.preconditions.clone()),
                    test_steps: Set(to_json("test_steps", &c.test_steps)?),
                    expected_result: Set(c.expected_result.clone()),
                    priority: Set(c.priority.as_str().to_string()),
                    created_at: Set(c.created_at),
                    updated_at: Set(c.created_at),
                };
                model
                    .insert(self.connection())
                    .await
                    .map_err(|e| write_error("insert cross-platform test case", e))?;
            }
        }

        Ok(())
    }

    async fn get_test_case(&self, case: CaseRef) -> AppResult<Option<CombinedTestCase>> {
        match case.kind {
            CaseKind::Regular => RegularCaseEntity::find_by_id(case.id)
                .one(self.connection())
                .await
                .map_err(|e| read_error("get test case", e))?
                .map(CombinedTestCase::try_from)
                .transpose(),
            CaseKind::CrossPlatform => PlatformCase::find_by_id(case.id)
                .one(self.connection())
                .await
                .map_err(|e| read_error("get cross-platform test case", e))?
                .map(CombinedTestCase::try_from)
                .transpose(),
        }
    }

    async fn get_test_cases(&self, refs: &[CaseRef]) -> AppResult<Vec<CombinedTestCase>> {
        let ids_of = |kind: CaseKind| -> Vec<Uuid> {
            refs.iter().filter(|r| r.kind == kind).map(|r| r.id).collect()
        };
        let regular_ids = ids_of(CaseKind::Regular);
        let platform_ids = ids_of(CaseKind::CrossPlatform);

        let mut found: HashMap<CaseRef, CombinedTestCase> = HashMap::with_capacity(refs.len());

        if !regular_ids.is_empty() {
            let rows = RegularCaseEntity::find()
                .filter(regular_case::Column::Id.is_in(regular_ids))
                .all(self.connection())
                .await
                .map_err(|e| read_error("get test cases", e))?;
            for row in rows {
                let case = CombinedTestCase::try_from(row)?;
                found.insert(case.case_ref(), case);
            }
        }

        if !platform_ids.is_empty() {
            let rows = PlatformCase::find()
                .filter(platform_case::Column::Id.is_in(platform_ids))
                .all(self.connection())
                .await
                .map_err(|e| read_error("get cross-platform test cases", e))?;
            for row in rows {
                let case = CombinedTestCase::try_from(row)?;
                found.insert(case.case_ref(), case);
            }
        }

        // Preserve the caller's order
        Ok(refs.iter().filter_map(|r| found.remove(r)).collect())
    }

    async fn list_test_cases(&self, project_id: Uuid) -> AppResult<Vec<CombinedTestCase>> {
        let regular = RegularCaseEntity::find()
            .filter(regular_case::Column::ProjectId.eq(project_id))
            .order_by_asc(regular_case::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list test cases", e))?;

        let platform = PlatformCase::find()
            .filter(platform_case::Column::ProjectId.eq(project_id))
            .order_by_asc(platform_case::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list cross-platform test cases", e))?;

        let mut cases = regular
            .into_iter()
            .map(CombinedTestCase::try_from)
            .chain(platform.into_iter().map(CombinedTestCase::try_from))
            .collect::<AppResult<Vec<_>>>()?;
        cases.sort_by_key(|c| c.case_ref().id);

        Ok(cases)
    }

    async fn insert_suite(&self, s: &Suite) -> AppResult<()> {
        let model = suite::ActiveModel {
            id: Set(s.id),
            user_id: Set(s.user_id),
            project_id: Set(s.project_id),
            name: Set(s.name.clone()),
            description: Set(s.description.clone()),
            created_at: Set(s.created_at),
            updated_at: Set(s.created_at),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| write_error("insert suite", e))?;

        Ok(())
    }

    async fn get_suite(&self, id: Uuid) -> AppResult<Option<Suite>> {
        let result = SuiteEntity::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| read_error("get suite", e))?;

        Ok(result.map(Suite::from))
    }

    async fn list_suites(&self, user_id: Uuid, project_id: Option<Uuid>) -> AppResult<Vec<Suite>> {
        let mut query = SuiteEntity::find().filter(suite::Column::UserId.eq(user_id));
        if let Some(project_id) = project_id {
            query = query.filter(suite::Column::ProjectId.eq(project_id));
        }

        let result = query
            .order_by_asc(suite::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list suites", e))?;

        Ok(result.into_iter().map(Suite::from).collect())
    }

    async fn insert_suite_case(&self, entry: &SuiteTestCase) -> AppResult<()> {
        let (test_case_id, platform_test_case_id) = entry.case.to_columns();
        let model = suite_case::ActiveModel {
            id: Set(entry.id),
            suite_id: Set(entry.suite_id),
            test_case_id: Set(test_case_id),
            platform_test_case_id: Set(platform_test_case_id),
            sequence_order: Set(entry.sequence_order),
            priority: Set(entry.priority.as_str().to_string()),
            estimated_duration_minutes: Set(entry.estimated_duration_minutes),
            created_at: Set(entry.created_at),
        };

        model
            .insert(self.connection())
            .await
            .map_err(|e| write_error("add test case to suite", e))?;

        Ok(())
    }

    async fn list_suite_cases(&self, suite_id: Uuid) -> AppResult<Vec<SuiteTestCase>> {
        let rows = SuiteCase::find()
            .filter(suite_case::Column::SuiteId.eq(suite_id))
            .order_by_asc(suite_case::Column::SequenceOrder)
            .all(self.connection())
            .await
            .map_err(|e| read_error("list suite cases", e))?;

        let mut entries = rows
            .into_iter()
            .map(SuiteTestCase::try_from)
            .collect::<AppResult<Vec<_>>>()?;
        sort_run_order(&mut entries);

        Ok(entries)
    }
}
