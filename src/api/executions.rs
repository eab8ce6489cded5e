//! Execution API handlers: step tracking, finalization, reset and evidence.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::StreamExt;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{
    Attachment, AttachmentMetadata, CaptureRequest, EvidenceFile, Execution, FinalizeRequest,
    FinalizeResponse, MarkStepFailedRequest, ResetRequest, ResetResponse, UpdateNotesRequest,
};
use crate::services::{EvidenceService, Executor};

/// Get one execution.
#[utoipa::path(
    get,
    path = "/api/v1/executions/{execution_id}",
    tag = "Executions",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    responses(
        (status = 200, description = "Execution", body = Execution),
        (status = 404, description = "Execution not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_execution(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let execution = executor.get(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(execution))
}

/// Toggle a step between done and not done.
#[utoipa::path(
    post,
    path = "/api/v1/executions/{execution_id}/steps/{step_number}/toggle",
    tag = "Executions",
    params(
        ("execution_id" = Uuid, Path, description = "Execution UUID"),
        ("step_number" = i32, Path, description = "1-based step number")
    ),
    responses(
        (status = 200, description = "Updated execution", body = Execution),
        (status = 400, description = "No such step", body = crate::error::ErrorResponse),
        (status = 409, description = "Execution is read-only or busy", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn toggle_step(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<(Uuid, i32)>,
) -> AppResult<HttpResponse> {
    let (execution_id, step_number) = path.into_inner();
    let execution = executor
        .toggle_step(&auth.user, execution_id, step_number)
        .await?;
    Ok(HttpResponse::Ok().json(execution))
}

/// Mark a step as failed, replacing any earlier reason.
#[utoipa::path(
    put,
    path = "/api/v1/executions/{execution_id}/steps/{step_number}/failure",
    tag = "Executions",
    params(
        ("execution_id" = Uuid, Path, description = "Execution UUID"),
        ("step_number" = i32, Path, description = "1-based step number")
    ),
    request_body = MarkStepFailedRequest,
    responses(
        (status = 200, description = "Updated execution", body = Execution),
        (status = 400, description = "Missing reason", body = crate::error::ErrorResponse),
        (status = 409, description = "Execution is read-only or busy", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn mark_step_failed(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<(Uuid, i32)>,
    body: web::Json<MarkStepFailedRequest>,
) -> AppResult<HttpResponse> {
    let (execution_id, step_number) = path.into_inner();
    let execution = executor
        .mark_step_failed(&auth.user, execution_id, step_number, &body.reason)
        .await?;
    Ok(HttpResponse::Ok().json(execution))
}

/// Clear a step's failure entry.
#[utoipa::path(
    delete,
    path = "/api/v1/executions/{execution_id}/steps/{step_number}/failure",
    tag = "Executions",
    params(
        ("execution_id" = Uuid, Path, description = "Execution UUID"),
        ("step_number" = i32, Path, description = "1-based step number")
    ),
    responses(
        (status = 200, description = "Updated execution", body = Execution),
        (status = 409, description = "Execution is read-only or busy", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn clear_step_failure(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<(Uuid, i32)>,
) -> AppResult<HttpResponse> {
    let (execution_id, step_number) = path.into_inner();
    let execution = executor
        .clear_step_failure(&auth.user, execution_id, step_number)
        .await?;
    Ok(HttpResponse::Ok().json(execution))
}

/// Replace the execution notes.
#[utoipa::path(
    put,
    path = "/api/v1/executions/{execution_id}/notes",
    tag = "Executions",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    request_body = UpdateNotesRequest,
    responses(
        (status = 200, description = "Updated execution", body = Execution),
        (status = 409, description = "Execution is read-only or busy", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn set_notes(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateNotesRequest>,
) -> AppResult<HttpResponse> {
    let execution = executor
        .set_notes(&auth.user, path.into_inner(), body.into_inner().notes)
        .await?;
    Ok(HttpResponse::Ok().json(execution))
}

/// Finalize an execution as passed, failed, blocked or skipped.
#[utoipa::path(
    post,
    path = "/api/v1/executions/{execution_id}/finalize",
    tag = "Executions",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    request_body = FinalizeRequest,
    responses(
        (status = 200, description = "Execution finalized", body = FinalizeResponse),
        (status = 400, description = "Missing reason", body = crate::error::ErrorResponse),
        (status = 409, description = "Already finalized, session not running, or busy", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn finalize(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<Uuid>,
    body: web::Json<FinalizeRequest>,
) -> AppResult<HttpResponse> {
    let response = executor
        .finalize(&auth.user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Reset an execution to a blank in-progress state. Requires `confirm: true`.
#[utoipa::path(
    post,
    path = "/api/v1/executions/{execution_id}/reset",
    tag = "Executions",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    request_body = ResetRequest,
    responses(
        (status = 200, description = "Execution reset", body = ResetResponse),
        (status = 400, description = "Not confirmed", body = crate::error::ErrorResponse),
        (status = 409, description = "Session paused or execution busy", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn reset(
    auth: AuthenticatedUser,
    executor: web::Data<Executor>,
    path: web::Path<Uuid>,
    body: web::Json<ResetRequest>,
) -> AppResult<HttpResponse> {
    let response = executor
        .reset(&auth.user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Upload an image as evidence.
///
/// Multipart form with one `file` part plus text parts `test_case_id` or
/// `platform_test_case_id`, and optionally `step_number` and `description`.
#[utoipa::path(
    post,
    path = "/api/v1/executions/{execution_id}/attachments",
    tag = "Evidence",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    responses(
        (status = 201, description = "Attachment stored", body = Attachment),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 413, description = "File too large", body = crate::error::ErrorResponse),
        (status = 415, description = "File type not allowed", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn upload_attachment(
    auth: AuthenticatedUser,
    evidence: web::Data<EvidenceService>,
    path: web::Path<Uuid>,
    mut payload: Multipart,
) -> AppResult<HttpResponse> {
    let max_size = evidence.max_size();
    let mut file: Option<EvidenceFile> = None;
    let mut metadata = AttachmentMetadata::default();

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::InvalidInput(format!("Multipart error: {}", e)))?;

        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();

        // Collect field data, stopping as soon as the ceiling is crossed
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| AppError::InvalidInput(format!("Read error: {}", e)))?;
            if data.len() + chunk.len() > max_size {
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds maximum {} bytes",
                    max_size
                )));
            }
            data.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "file" => {
                if file.is_some() {
                    return Err(AppError::InvalidInput(
                        "Only one file per upload".to_string(),
                    ));
                }
                file = Some(EvidenceFile {
                    file_name: filename.unwrap_or_default(),
                    content_type,
                    data,
                });
            }
            "test_case_id" => metadata.test_case_id = Some(parse_uuid_field(&name, &data)?),
            "platform_test_case_id" => {
                metadata.platform_test_case_id = Some(parse_uuid_field(&name, &data)?)
            }
            "step_number" => {
                let text = text_field(&name, &data)?;
                metadata.step_number = Some(text.parse().map_err(|_| {
                    AppError::InvalidInput(format!("step_number '{}' is not a number", text))
                })?);
            }
            "description" => metadata.description = Some(text_field(&name, &data)?),
            _ => {}
        }
    }

    let file =
        file.ok_or_else(|| AppError::InvalidInput("Missing 'file' part in upload".to_string()))?;
    let attachment = evidence
        .upload(&auth.user, path.into_inner(), file, metadata)
        .await?;
    Ok(HttpResponse::Created().json(attachment))
}

fn text_field(name: &str, data: &[u8]) -> AppResult<String> {
    std::str::from_utf8(data)
        .map(|s| s.trim().to_string())
        .map_err(|_| AppError::InvalidInput(format!("Field '{}' is not valid UTF-8", name)))
}

fn parse_uuid_field(name: &str, data: &[u8]) -> AppResult<Uuid> {
    let text = text_field(name, data)?;
    Uuid::parse_str(&text)
        .map_err(|_| AppError::InvalidInput(format!("Field '{}' is not a UUID", name)))
}

/// Upload a screenshot captured by the browser extension.
#[utoipa::path(
    post,
    path = "/api/v1/executions/{execution_id}/attachments/capture",
    tag = "Evidence",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    request_body = CaptureRequest,
    responses(
        (status = 201, description = "Attachment stored", body = Attachment),
        (status = 400, description = "Malformed data URL", body = crate::error::ErrorResponse),
        (status = 413, description = "Capture too large", body = crate::error::ErrorResponse),
        (status = 415, description = "Image type not allowed", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn capture_attachment(
    auth: AuthenticatedUser,
    evidence: web::Data<EvidenceService>,
    path: web::Path<Uuid>,
    body: web::Json<CaptureRequest>,
) -> AppResult<HttpResponse> {
    let attachment = evidence
        .capture(&auth.user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(attachment))
}

/// List an execution's attachments.
#[utoipa::path(
    get,
    path = "/api/v1/executions/{execution_id}/attachments",
    tag = "Evidence",
    params(("execution_id" = Uuid, Path, description = "Execution UUID")),
    responses(
        (status = 200, description = "Attachments", body = Vec<Attachment>),
        (status = 404, description = "Execution not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_attachments(
    auth: AuthenticatedUser,
    evidence: web::Data<EvidenceService>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let attachments = evidence.list(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(attachments))
}

/// Configure execution routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/executions/{execution_id}").route(web::get().to(get_execution)))
        .service(
            web::resource("/executions/{execution_id}/steps/{step_number}/toggle")
                .route(web::post().to(toggle_step)),
        )
        .service(
            web::resource("/executions/{execution_id}/steps/{step_number}/failure")
                .route(web::put().to(mark_step_failed))
                .route(web::delete().to(clear_step_failure)),
        )
        .service(web::resource("/executions/{execution_id}/notes").route(web::put().to(set_notes)))
        .service(
            web::resource("/executions/{execution_id}/finalize").route(web::post().to(finalize)),
        )
        .service(web::resource("/executions/{execution_id}/reset").route(web::post().to(reset)))
        .service(
            web::resource("/executions/{execution_id}/attachments")
                .route(web::get().to(list_attachments))
                .route(web::post().to(upload_attachment)),
        )
        .service(
            web::resource("/executions/{execution_id}/attachments/capture")
                .route(web::post().to(capture_attachment)),
        );
}
