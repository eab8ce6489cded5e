//! Issue tracker integration DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Request to file issues for a batch of failed executions.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssueBatchRequest {
    pub execution_ids: Vec<Uuid>,
    /// Optional labels applied to every issue.
    #[serde(default)]
    pub labels: Vec<String>,
}

/// One issue as sent to the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueDraft {
    /// Correlates tracker results back to executions.
    pub reference: Uuid,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// Per-item result reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IssueResult {
    pub execution_id: Uuid,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IssueBatchResponse {
    pub results: Vec<IssueResult>,
    pub created: usize,
    pub failed: usize,
}
