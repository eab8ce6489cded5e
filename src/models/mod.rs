//! Domain models and DTOs for the test case manager.

pub mod attachment;
pub mod catalog;
pub mod execution;
pub mod issue;
pub mod report;
pub mod session;
pub mod test_case;

// Re-export commonly used types
pub use attachment::{
    Attachment, AttachmentMetadata, CaptureRequest, EvidenceFile, ImageType, SignedUrlResponse,
    ValidatedUpload,
};
pub use catalog::{
    AddSuiteCaseRequest, CreateProjectRequest, CreateSuiteRequest, ListSuitesQuery, Project,
    Suite, SuiteDetail, SuiteEntryDetail, SuiteTestCase,
};
pub use execution::{
    Execution, ExecutionStatus, FailedStep, FinalizeDetails, FinalizeRequest, FinalizeResponse,
    MarkStepFailedRequest, Outcome, ResetRequest, ResetResponse, UpdateNotesRequest,
};
pub use issue::{IssueBatchRequest, IssueBatchResponse, IssueDraft, IssueResult};
pub use report::{
    CasePerformance, DailyTrend, FailureFrequency, OutcomeCounts, ReportFilter, SuiteStats,
};
pub use session::{
    CounterChange, NavigationTarget, RunSession, SessionCaseView, SessionSnapshot, SessionStatus,
    StartSessionRequest,
};
pub use test_case::{
    CaseKind, CaseRef, CombinedTestCase, CreateTestCaseRequest, CrossPlatformCase, Platform,
    Priority, RegularCase, TestStep,
};

/// Authenticated caller, resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: uuid::Uuid,
}
