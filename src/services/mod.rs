//! Business logic services.
//!
//! Services hold their data-access ports as trait objects and are shared
//! across workers as `web::Data`.

pub mod catalog;
pub mod evidence;
pub mod executor;
pub mod guard;
pub mod reporting;
pub mod session;
pub mod storage;
pub mod tracker;

pub use catalog::CatalogService;
pub use evidence::EvidenceService;
pub use executor::Executor;
pub use guard::InFlight;
pub use reporting::ReportingService;
pub use session::SessionController;
pub use storage::Storage;
pub use tracker::TrackerService;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::CurrentUser;

/// Reject access to a row owned by another user.
pub(crate) fn ensure_owner(user: &CurrentUser, owner: Uuid, what: &str, id: Uuid) -> AppResult<()> {
    if user.user_id != owner {
        return Err(AppError::Forbidden(format!(
            "{} {} belongs to another user",
            what, id
        )));
    }
    Ok(())
}

/// Trimmed, non-blank text or `InvalidInput` naming the field.
pub(crate) fn required_text(field: &str, value: &str, max_len: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidInput(format!("{} is required", field)));
    }
    if value.chars().count() > max_len {
        return Err(AppError::InvalidInput(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(value.to_string())
}

/// Trimmed optional text; blank becomes `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
