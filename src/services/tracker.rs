//! Issue tracker integration.
//!
//! Files one issue per failed execution by POSTing a batch to the configured
//! tracker endpoint. The tracker answers with a result per item, keyed by
//! the `reference` we sent.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TrackerSettings;
use crate::error::{AppError, AppResult};
use crate::models::{
    CurrentUser, Execution, ExecutionStatus, IssueBatchRequest, IssueBatchResponse, IssueDraft,
    IssueResult,
};
use crate::repository::{CatalogRepository, RunRepository};

/// HTTP connect timeout for tracker calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP total timeout for tracker calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound on executions per batch.
pub const MAX_BATCH_SIZE: usize = 50;

#[derive(Serialize)]
struct TrackerBatch<'a> {
    issues: &'a [IssueDraft],
}

#[derive(Deserialize)]
struct TrackerBatchResponse {
    results: Vec<TrackerItemResult>,
}

#[derive(Deserialize)]
struct TrackerItemResult {
    reference: Uuid,
    success: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct TrackerService {
    catalog: Arc<dyn CatalogRepository>,
    runs: Arc<dyn RunRepository>,
    endpoint: Option<String>,
    token: Option<SecretString>,
    http_client: reqwest::Client,
}

impl TrackerService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        runs: Arc<dyn RunRepository>,
        settings: &TrackerSettings,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Integration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            catalog,
            runs,
            endpoint: settings.url.clone(),
            token: settings.token.clone(),
            http_client,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// File issues for a batch of executions.
    ///
    /// Ineligible executions (missing, owned by someone else, not failed)
    /// come back as failed items without reaching the tracker.
    pub async fn create_issues(
        &self,
        user: &CurrentUser,
        req: IssueBatchRequest,
    ) -> AppResult<IssueBatchResponse> {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return Err(AppError::Unavailable(
                "Issue tracker integration is not configured".to_string(),
            ));
        };
        if req.execution_ids.is_empty() {
            return Err(AppError::InvalidInput(
                "execution_ids must not be empty".to_string(),
            ));
        }
        if req.execution_ids.len() > MAX_BATCH_SIZE {
            return Err(AppError::InvalidInput(format!(
                "At most {} executions per batch",
                MAX_BATCH_SIZE
            )));
        }

        let mut results: Vec<IssueResult> = Vec::with_capacity(req.execution_ids.len());
        let mut drafts: Vec<IssueDraft> = Vec::new();
        for id in &req.execution_ids {
            match self.draft_for(user, *id, &req.labels).await? {
                Ok(draft) => drafts.push(draft),
                Err(reason) => results.push(failed_item(*id, reason)),
            }
        }

        if !drafts.is_empty() {
            let mut answered = self.send(endpoint, &drafts).await?;
            for draft in &drafts {
                let result = match answered.remove(&draft.reference) {
                    Some(item) if item.success => IssueResult {
                        execution_id: draft.reference,
                        success: true,
                        issue_url: item.url,
                        error: None,
                    },
                    Some(item) => failed_item(
                        draft.reference,
                        item.error.unwrap_or_else(|| "Tracker rejected the issue".to_string()),
                    ),
                    None => failed_item(draft.reference, "No result from tracker".to_string()),
                };
                results.push(result);
            }
        }

        // Report in request order
        let order: HashMap<Uuid, usize> = req
            .execution_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        results.sort_by_key(|r| order.get(&r.execution_id).copied().unwrap_or(usize::MAX));

        let created = results.iter().filter(|r| r.success).count();
        let failed = results.len() - created;
        info!(user_id = %user.user_id, created, failed, "Issue batch processed");

        Ok(IssueBatchResponse {
            results,
            created,
            failed,
        })
    }

    /// The draft for one execution, or the reason it is not eligible.
    async fn draft_for(
        &self,
        user: &CurrentUser,
        id: Uuid,
        labels: &[String],
    ) -> AppResult<Result<IssueDraft, String>> {
        let Some(execution) = self.runs.get_execution(id).await? else {
            return Ok(Err("Execution not found".to_string()));
        };
        if execution.user_id != user.user_id {
            return Ok(Err("Execution belongs to another user".to_string()));
        }
        if execution.status != ExecutionStatus::Failed {
            return Ok(Err(format!(
                "Only failed executions can be filed (status: {})",
                execution.status
            )));
        }

        let title = self
            .catalog
            .get_test_case(execution.case)
            .await?
            .map(|c| c.title().to_string())
            .unwrap_or_else(|| execution.case.to_string());

        Ok(Ok(build_draft(&execution, &title, labels)))
    }

    async fn send(
        &self,
        endpoint: &str,
        drafts: &[IssueDraft],
    ) -> AppResult<HashMap<Uuid, TrackerItemResult>> {
        let mut request = self
            .http_client
            .post(endpoint)
            .json(&TrackerBatch { issues: drafts });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "Tracker request failed");
            AppError::Integration(format!("Tracker request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Tracker rejected issue batch");
            return Err(AppError::Integration(format!(
                "Tracker responded with {}",
                status
            )));
        }

        let body: TrackerBatchResponse = response.json().await.map_err(|e| {
            AppError::Integration(format!("Invalid tracker response: {}", e))
        })?;

        Ok(body
            .results
            .into_iter()
            .map(|item| (item.reference, item))
            .collect())
    }
}

fn failed_item(execution_id: Uuid, error: String) -> IssueResult {
    IssueResult {
        execution_id,
        success: false,
        issue_url: None,
        error: Some(error),
    }
}

/// Issue text for a failed execution.
pub fn build_draft(execution: &Execution, case_title: &str, labels: &[String]) -> IssueDraft {
    let mut body = format!(
        "Test case: {}\nExecution: {}\nSession: {}\n",
        case_title, execution.id, execution.session_id
    );
    if let Some(completed_at) = execution.completed_at {
        body.push_str(&format!("Failed at: {}\n", completed_at.to_rfc3339()));
    }
    if let Some(reason) = &execution.failure_reason {
        body.push_str(&format!("\nFailure reason:\n{}\n", reason));
    }
    if !execution.failed_steps.is_empty() {
        body.push_str("\nFailed steps:\n");
        for step in &execution.failed_steps {
            body.push_str(&format!("- Step {}: {}\n", step.step_number, step.reason));
        }
    }
    if let Some(notes) = &execution.execution_notes {
        body.push_str(&format!("\nNotes:\n{}\n", notes));
    }

    IssueDraft {
        reference: execution.id,
        title: format!("[Test failure] {}", case_title),
        body,
        labels: labels.to_vec(),
    }
}
