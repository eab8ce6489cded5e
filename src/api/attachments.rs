//! Attachment download and deletion handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::SignedUrlResponse;
use crate::services::EvidenceService;

/// Get a time-limited download URL for an attachment.
#[utoipa::path(
    get,
    path = "/api/v1/attachments/{attachment_id}/url",
    tag = "Evidence",
    params(("attachment_id" = Uuid, Path, description = "Attachment UUID")),
    responses(
        (status = 200, description = "Signed URL", body = SignedUrlResponse),
        (status = 403, description = "Attachment belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_signed_url(
    auth: AuthenticatedUser,
    evidence: web::Data<EvidenceService>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let response = evidence.signed_url(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Delete an attachment and its stored object.
#[utoipa::path(
    delete,
    path = "/api/v1/attachments/{attachment_id}",
    tag = "Evidence",
    params(("attachment_id" = Uuid, Path, description = "Attachment UUID")),
    responses(
        (status = 204, description = "Attachment deleted"),
        (status = 403, description = "Attachment belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Attachment not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn delete_attachment(
    auth: AuthenticatedUser,
    evidence: web::Data<EvidenceService>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    evidence.delete(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/attachments/{attachment_id}").route(web::delete().to(delete_attachment)),
    )
    .service(
        web::resource("/attachments/{attachment_id}/url").route(web::get().to(get_signed_url)),
    );
}
