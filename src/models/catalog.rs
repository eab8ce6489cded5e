//! Project and suite models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::test_case::{CaseRef, CombinedTestCase, Priority};

/// A project groups test cases and suites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A suite: an ordered list of test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Suite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Membership of a test case in a suite. Defines run order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SuiteTestCase {
    pub id: Uuid,
    pub suite_id: Uuid,
    pub case: CaseRef,
    pub sequence_order: i32,
    pub priority: Priority,
    pub estimated_duration_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Sort suite entries into run order: ascending `sequence_order`, then
/// creation time, then id (UUIDv7 is time-ordered).
pub fn sort_run_order(entries: &mut [SuiteTestCase]) {
    entries.sort_by(|a, b| {
        a.sequence_order
            .cmp(&b.sequence_order)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

/// Request to create a project.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProjectRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to create a suite.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateSuiteRequest {
    pub project_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to add a test case to a suite.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddSuiteCaseRequest {
    #[serde(default)]
    pub test_case_id: Option<Uuid>,
    #[serde(default)]
    pub platform_test_case_id: Option<Uuid>,
    /// Defaults to one past the current last position.
    #[serde(default)]
    pub sequence_order: Option<i32>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub estimated_duration_minutes: Option<i32>,
}

/// Query parameters for listing suites.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListSuitesQuery {
    pub project_id: Option<Uuid>,
}

/// A suite entry resolved to its test case.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuiteEntryDetail {
    #[serde(flatten)]
    pub entry: SuiteTestCase,
    #[schema(value_type = Object)]
    pub test_case: CombinedTestCase,
}

/// A suite with its cases in run order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuiteDetail {
    #[serde(flatten)]
    pub suite: Suite,
    pub cases: Vec<SuiteEntryDetail>,
    pub estimated_duration_minutes: i32,
}
