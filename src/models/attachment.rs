//! Evidence attachment models and upload validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::test_case::CaseRef;
use crate::error::{AppError, AppResult};

/// Image types accepted as evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageType {
    pub const ALLOWED_MIME_TYPES: [&'static str; 4] =
        ["image/png", "image/jpeg", "image/gif", "image/webp"];

    /// Match a MIME type against the allow-list. Parameters (`; charset=...`) are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }
}

/// Stored evidence file linked to one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Attachment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub execution_id: Uuid,
    pub case: CaseRef,
    pub step_number: Option<i32>,
    pub description: Option<String>,
    /// Original file name as supplied by the client.
    pub file_name: String,
    /// Object key in the evidence bucket.
    pub storage_path: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub checksum_sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Metadata accompanying an upload, before validation.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AttachmentMetadata {
    #[serde(default)]
    pub test_case_id: Option<Uuid>,
    #[serde(default)]
    pub platform_test_case_id: Option<Uuid>,
    #[serde(default)]
    pub step_number: Option<i32>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A file submitted as evidence.
#[derive(Debug, Clone)]
pub struct EvidenceFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An upload that passed every check that needs no I/O.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub case: CaseRef,
    pub image_type: ImageType,
    pub step_number: Option<i32>,
    pub description: Option<String>,
}

/// Validate type, size and foreign keys of an upload. Performs no I/O.
pub fn validate_upload(
    file: &EvidenceFile,
    metadata: &AttachmentMetadata,
    max_size: usize,
) -> AppResult<ValidatedUpload> {
    let case = CaseRef::from_columns(metadata.test_case_id, metadata.platform_test_case_id)?;

    let image_type = ImageType::from_mime(&file.content_type).ok_or_else(|| {
        AppError::UnsupportedMediaType(format!(
            "'{}' is not allowed. Allowed: {}",
            file.content_type,
            ImageType::ALLOWED_MIME_TYPES.join(", ")
        ))
    })?;

    if file.data.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "File '{}' is empty",
            file.file_name
        )));
    }

    if file.data.len() > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size {} exceeds maximum {} bytes",
            file.data.len(),
            max_size
        )));
    }

    if let Some(step) = metadata.step_number
        && step < 1
    {
        return Err(AppError::InvalidInput(format!(
            "Step number {} must be positive",
            step
        )));
    }

    Ok(ValidatedUpload {
        case,
        image_type,
        step_number: metadata.step_number,
        description: metadata
            .description
            .clone()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    })
}

/// Evidence captured by the browser extension as a data URL.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CaptureRequest {
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(flatten)]
    pub metadata: AttachmentMetadata,
}

/// A time-limited download URL.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SignedUrlResponse {
    pub attachment_id: Uuid,
    pub url: String,
    pub expires_in_secs: u64,
}
