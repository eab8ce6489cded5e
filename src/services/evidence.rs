//! Evidence uploader.
//!
//! Uploads are validated before any I/O, stored under a per-user key in the
//! private bucket, then recorded as attachment rows. A failed insert rolls
//! the stored object back.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::attachment::validate_upload;
use crate::models::{
    Attachment, AttachmentMetadata, CaptureRequest, CurrentUser, EvidenceFile, Execution,
    SignedUrlResponse,
};
use crate::repository::{AttachmentRepository, ObjectStore, RunRepository};

use super::ensure_owner;
use super::storage::Storage;

pub struct EvidenceService {
    runs: Arc<dyn RunRepository>,
    attachments: Arc<dyn AttachmentRepository>,
    objects: Arc<dyn ObjectStore>,
    max_size: usize,
    signed_url_ttl: Duration,
}

impl EvidenceService {
    pub fn new(
        runs: Arc<dyn RunRepository>,
        attachments: Arc<dyn AttachmentRepository>,
        objects: Arc<dyn ObjectStore>,
        max_size: usize,
        signed_url_ttl: Duration,
    ) -> Self {
        Self {
            runs,
            attachments,
            objects,
            max_size,
            signed_url_ttl,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    async fn owned_execution(&self, user: &CurrentUser, id: Uuid) -> AppResult<Execution> {
        let execution = self
            .runs
            .get_execution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Execution {} not found", id)))?;
        ensure_owner(user, execution.user_id, "Execution", id)?;
        Ok(execution)
    }

    async fn owned_attachment(&self, user: &CurrentUser, id: Uuid) -> AppResult<Attachment> {
        let attachment = self
            .attachments
            .get_attachment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attachment {} not found", id)))?;
        ensure_owner(user, attachment.user_id, "Attachment", id)?;
        Ok(attachment)
    }

    /// Attach one image to an execution. Allowed in any execution status.
    pub async fn upload(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        file: EvidenceFile,
        metadata: AttachmentMetadata,
    ) -> AppResult<Attachment> {
        let upload = validate_upload(&file, &metadata, self.max_size)?;

        let execution = self.owned_execution(user, execution_id).await?;
        if execution.case != upload.case {
            return Err(AppError::InvalidInput(format!(
                "Execution {} runs {}, not {}",
                execution.id, execution.case, upload.case
            )));
        }

        let storage_path = Storage::evidence_key(
            user.user_id,
            execution.id,
            Uuid::now_v7(),
            upload.image_type,
        );
        let attachment = Attachment {
            id: Uuid::now_v7(),
            user_id: user.user_id,
            execution_id: execution.id,
            case: upload.case,
            step_number: upload.step_number,
            description: upload.description,
            file_name: sanitize_file_name(&file.file_name, upload.image_type.extension()),
            storage_path,
            content_type: upload.image_type.mime().to_string(),
            size_bytes: file.data.len() as i64,
            checksum_sha256: hex::encode(Sha256::digest(&file.data)),
            created_at: Utc::now(),
        };

        store_then_record(
            self.objects.as_ref(),
            self.attachments.as_ref(),
            &attachment,
            file.data,
        )
        .await?;

        info!(
            attachment_id = %attachment.id,
            execution_id = %execution.id,
            size = attachment.size_bytes,
            content_type = %attachment.content_type,
            "Evidence uploaded"
        );
        Ok(attachment)
    }

    /// Upload a screenshot delivered by the browser extension as a data URL.
    pub async fn capture(
        &self,
        user: &CurrentUser,
        execution_id: Uuid,
        req: CaptureRequest,
    ) -> AppResult<Attachment> {
        let file = decode_data_url(&req.data_url, req.file_name, self.max_size)?;
        self.upload(user, execution_id, file, req.metadata).await
    }

    pub async fn list(&self, user: &CurrentUser, execution_id: Uuid) -> AppResult<Vec<Attachment>> {
        let execution = self.owned_execution(user, execution_id).await?;
        self.attachments.list_attachments(execution.id).await
    }

    pub async fn signed_url(
        &self,
        user: &CurrentUser,
        attachment_id: Uuid,
    ) -> AppResult<SignedUrlResponse> {
        let attachment = self.owned_attachment(user, attachment_id).await?;
        let url = self
            .objects
            .signed_url(&attachment.storage_path, self.signed_url_ttl)
            .await?;

        Ok(SignedUrlResponse {
            attachment_id: attachment.id,
            url,
            expires_in_secs: self.signed_url_ttl.as_secs(),
        })
    }

    /// Delete the row, then the object. A failed object delete only leaves
    /// an unreferenced object behind and is logged.
    pub async fn delete(&self, user: &CurrentUser, attachment_id: Uuid) -> AppResult<()> {
        let attachment = self.owned_attachment(user, attachment_id).await?;

        if !self.attachments.delete_attachment(attachment.id).await? {
            return Err(AppError::NotFound(format!(
                "Attachment {} not found",
                attachment_id
            )));
        }

        match self.objects.delete(&attachment.storage_path).await {
            Ok(()) => info!(
                attachment_id = %attachment.id,
                key = %attachment.storage_path,
                "Attachment deleted"
            ),
            Err(e) => warn!(
                attachment_id = %attachment.id,
                key = %attachment.storage_path,
                error = %e,
                "Attachment row deleted but object removal failed"
            ),
        }
        Ok(())
    }
}

/// Upload the object, then insert its row. When the insert fails the object
/// is deleted again; the outcome of that delete is logged and the insert
/// error is returned.
pub async fn store_then_record(
    objects: &dyn ObjectStore,
    attachments: &dyn AttachmentRepository,
    attachment: &Attachment,
    data: Vec<u8>,
) -> AppResult<()> {
    objects
        .put(&attachment.storage_path, data, &attachment.content_type)
        .await?;

    let Err(insert_err) = attachments.insert_attachment(attachment).await else {
        return Ok(());
    };

    match objects.delete(&attachment.storage_path).await {
        Ok(()) => info!(
            key = %attachment.storage_path,
            error = %insert_err,
            "Attachment insert failed; stored object rolled back"
        ),
        Err(rollback_err) => error!(
            key = %attachment.storage_path,
            error = %insert_err,
            rollback_error = %rollback_err,
            "Attachment insert failed and stored object could not be removed"
        ),
    }
    Err(insert_err)
}

/// Decode `data:<mime>;base64,<payload>` into an evidence file.
///
/// The encoded length is checked against the size ceiling before decoding.
pub fn decode_data_url(
    data_url: &str,
    file_name: Option<String>,
    max_size: usize,
) -> AppResult<EvidenceFile> {
    let rest = data_url
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| AppError::InvalidInput("Capture must be a data: URL".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::InvalidInput("Malformed data URL".to_string()))?;
    let content_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::InvalidInput("Capture data URL must be base64".to_string()))?;

    // 4 encoded characters carry 3 bytes
    if payload.len() / 4 * 3 > max_size + 3 {
        return Err(AppError::PayloadTooLarge(format!(
            "Capture exceeds maximum {} bytes",
            max_size
        )));
    }

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::InvalidInput(format!("Invalid base64 payload: {}", e)))?;

    Ok(EvidenceFile {
        file_name: file_name.unwrap_or_else(|| "capture".to_string()),
        content_type: content_type.to_string(),
        data,
    })
}

/// Keep the client's file name readable but free of path components.
fn sanitize_file_name(name: &str, extension: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .take(200)
        .collect();

    if cleaned.is_empty() {
        format!("evidence.{}", extension)
    } else {
        cleaned
    }
}
