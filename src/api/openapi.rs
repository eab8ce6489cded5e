//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Test Case Manager",
        version = "0.1.0",
        description = "Manual test execution: suites, run sessions, step tracking, evidence and reports"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Catalog endpoints
        api::projects::create_project,
        api::projects::list_projects,
        api::projects::create_test_case,
        api::projects::list_test_cases,
        api::projects::get_test_case,
        api::suites::create_suite,
        api::suites::list_suites,
        api::suites::get_suite,
        api::suites::add_suite_case,
        // Session endpoints
        api::suites::start_session,
        api::sessions::get_session,
        api::sessions::navigate,
        api::sessions::pause,
        api::sessions::resume,
        // Execution endpoints
        api::executions::get_execution,
        api::executions::toggle_step,
        api::executions::mark_step_failed,
        api::executions::clear_step_failure,
        api::executions::set_notes,
        api::executions::finalize,
        api::executions::reset,
        // Evidence endpoints
        api::executions::upload_attachment,
        api::executions::capture_attachment,
        api::executions::list_attachments,
        api::attachments::get_signed_url,
        api::attachments::delete_attachment,
        // Report endpoints
        api::reports::suite_stats,
        api::reports::case_performance,
        api::reports::daily_trends,
        api::reports::failure_frequency,
        // Issue tracker
        api::issues::create_issues,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Catalog
            models::Project,
            models::CreateProjectRequest,
            models::CaseKind,
            models::CaseRef,
            models::Priority,
            models::Platform,
            models::TestStep,
            models::RegularCase,
            models::CrossPlatformCase,
            models::CreateTestCaseRequest,
            models::Suite,
            models::SuiteTestCase,
            models::CreateSuiteRequest,
            models::AddSuiteCaseRequest,
            models::SuiteEntryDetail,
            models::SuiteDetail,
            // Sessions
            models::SessionStatus,
            models::RunSession,
            models::NavigationTarget,
            models::StartSessionRequest,
            models::SessionCaseView,
            models::SessionSnapshot,
            // Executions
            models::ExecutionStatus,
            models::Outcome,
            models::FailedStep,
            models::Execution,
            models::FinalizeRequest,
            models::FinalizeResponse,
            models::ResetRequest,
            models::ResetResponse,
            models::MarkStepFailedRequest,
            models::UpdateNotesRequest,
            // Evidence
            models::Attachment,
            models::CaptureRequest,
            models::SignedUrlResponse,
            // Reports
            models::OutcomeCounts,
            models::SuiteStats,
            models::CasePerformance,
            models::DailyTrend,
            models::FailureFrequency,
            // Issues
            models::IssueBatchRequest,
            models::IssueResult,
            models::IssueBatchResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Catalog", description = "Projects, test cases and suites"),
        (name = "Sessions", description = "Run sessions and navigation"),
        (name = "Executions", description = "Per-test step tracking and outcomes"),
        (name = "Evidence", description = "Screenshot and image attachments"),
        (name = "Reports", description = "Aggregated run statistics"),
        (name = "Issues", description = "Issue tracker integration")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add bearer token security scheme.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
