//! Issue tracker handler.

use actix_web::{HttpResponse, web};

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::{IssueBatchRequest, IssueBatchResponse};
use crate::services::TrackerService;

/// File tracker issues for failed executions.
///
/// Each item succeeds or fails on its own; results come back in request order.
#[utoipa::path(
    post,
    path = "/api/v1/issues/batch",
    tag = "Issues",
    request_body = IssueBatchRequest,
    responses(
        (status = 200, description = "Per-item results", body = IssueBatchResponse),
        (status = 400, description = "Empty or oversized batch", body = crate::error::ErrorResponse),
        (status = 502, description = "Tracker unreachable", body = crate::error::ErrorResponse),
        (status = 503, description = "Tracker not configured", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_issues(
    auth: AuthenticatedUser,
    tracker: web::Data<TrackerService>,
    body: web::Json<IssueBatchRequest>,
) -> AppResult<HttpResponse> {
    let response = tracker.create_issues(&auth.user, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/issues/batch").route(web::post().to(create_issues)));
}
