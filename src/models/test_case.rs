//! Test case domain models.
//!
//! Regular and cross-platform cases live in separate tables but flow through
//! suites, executions and attachments together. `CombinedTestCase` carries an
//! explicit `case_type` discriminant and `CaseRef` identifies one of them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Which table a test case lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Regular,
    CrossPlatform,
}

impl CaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::CrossPlatform => "cross_platform",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(Self::Regular),
            "cross_platform" | "cross-platform" | "platform" => Some(Self::CrossPlatform),
            _ => None,
        }
    }
}

impl std::fmt::Display for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to exactly one test case of either kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub struct CaseRef {
    pub kind: CaseKind,
    pub id: Uuid,
}

impl CaseRef {
    pub fn regular(id: Uuid) -> Self {
        Self {
            kind: CaseKind::Regular,
            id,
        }
    }

    pub fn cross_platform(id: Uuid) -> Self {
        Self {
            kind: CaseKind::CrossPlatform,
            id,
        }
    }

    /// Build a reference from the two nullable foreign key columns.
    ///
    /// Exactly one of them must be set.
    pub fn from_columns(
        test_case_id: Option<Uuid>,
        platform_test_case_id: Option<Uuid>,
    ) -> AppResult<Self> {
        match (test_case_id, platform_test_case_id) {
            (Some(id), None) => Ok(Self::regular(id)),
            (None, Some(id)) => Ok(Self::cross_platform(id)),
            (Some(_), Some(_)) => Err(AppError::InvalidInput(
                "Only one of test_case_id and platform_test_case_id may be set".to_string(),
            )),
            (None, None) => Err(AppError::InvalidInput(
                "One of test_case_id or platform_test_case_id is required".to_string(),
            )),
        }
    }

    /// Split into `(test_case_id, platform_test_case_id)` columns.
    pub fn to_columns(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self.kind {
            CaseKind::Regular => (Some(self.id), None),
            CaseKind::CrossPlatform => (None, Some(self.id)),
        }
    }
}

impl std::fmt::Display for CaseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Test case priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Target platform of a cross-platform case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Web,
    Android,
    Ios,
    Desktop,
    Api,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Desktop => "desktop",
            Self::Api => "api",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "web" => Some(Self::Web),
            "android" => Some(Self::Android),
            "ios" => Some(Self::Ios),
            "desktop" => Some(Self::Desktop),
            "api" => Some(Self::Api),
            _ => None,
        }
    }
}

/// One step of a test case (stored as JSONB).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestStep {
    pub step_number: i32,
    pub action: String,
    #[serde(default)]
    pub expected: String,
}

/// Renumber steps 1..=n in the given order and reject blank actions.
pub fn normalize_steps(steps: Vec<TestStep>) -> AppResult<Vec<TestStep>> {
    steps
        .into_iter()
        .enumerate()
        .map(|(i, step)| {
            let action = step.action.trim().to_string();
            if action.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Step {} has an empty action",
                    i + 1
                )));
            }
            Ok(TestStep {
                step_number: i as i32 + 1,
                action,
                expected: step.expected.trim().to_string(),
            })
        })
        .collect()
}

/// A regular test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegularCase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub test_steps: Vec<TestStep>,
    pub expected_result: Option<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// A cross-platform test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CrossPlatformCase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub platform: Platform,
    pub preconditions: Option<String>,
    pub test_steps: Vec<TestStep>,
    pub expected_result: Option<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

/// Either kind of test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "case_type", rename_all = "snake_case")]
pub enum CombinedTestCase {
    Regular(RegularCase),
    CrossPlatform(CrossPlatformCase),
}

impl CombinedTestCase {
    pub fn case_ref(&self) -> CaseRef {
        match self {
            Self::Regular(c) => CaseRef::regular(c.id),
            Self::CrossPlatform(c) => CaseRef::cross_platform(c.id),
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            Self::Regular(c) => c.user_id,
            Self::CrossPlatform(c) => c.user_id,
        }
    }

    pub fn project_id(&self) -> Uuid {
        match self {
            Self::Regular(c) => c.project_id,
            Self::CrossPlatform(c) => c.project_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Regular(c) => &c.title,
            Self::CrossPlatform(c) => &c.title,
        }
    }

    pub fn steps(&self) -> &[TestStep] {
        match self {
            Self::Regular(c) => &c.test_steps,
            Self::CrossPlatform(c) => &c.test_steps,
        }
    }

    pub fn expected_result(&self) -> Option<&str> {
        match self {
            Self::Regular(c) => c.expected_result.as_deref(),
            Self::CrossPlatform(c) => c.expected_result.as_deref(),
        }
    }

    pub fn has_step(&self, step_number: i32) -> bool {
        self.steps().iter().any(|s| s.step_number == step_number)
    }
}

/// Request to create a test case of either kind.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTestCaseRequest {
    pub case_type: CaseKind,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
    #[serde(default)]
    pub expected_result: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Required for cross-platform cases.
    #[serde(default)]
    pub platform: Option<Platform>,
    #[serde(default)]
    pub preconditions: Option<String>,
}
