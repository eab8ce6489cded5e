//! Run session API handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::{NavigationTarget, RunSession, SessionSnapshot};
use crate::services::SessionController;

/// Session with its cases in run order and the current execution.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}",
    tag = "Sessions",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionSnapshot),
        (status = 403, description = "Session belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_session(
    auth: AuthenticatedUser,
    sessions: web::Data<SessionController>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let snapshot = sessions.get(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Move to the previous, next or an explicit case.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/navigate",
    tag = "Sessions",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    request_body = NavigationTarget,
    responses(
        (status = 200, description = "Session snapshot at the new index", body = SessionSnapshot),
        (status = 400, description = "Index out of range", body = crate::error::ErrorResponse),
        (status = 409, description = "Session is paused", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn navigate(
    auth: AuthenticatedUser,
    sessions: web::Data<SessionController>,
    path: web::Path<Uuid>,
    body: web::Json<NavigationTarget>,
) -> AppResult<HttpResponse> {
    let snapshot = sessions
        .navigate(&auth.user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Pause a running session.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/pause",
    tag = "Sessions",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session paused", body = RunSession),
        (status = 409, description = "Session is not in progress", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn pause(
    auth: AuthenticatedUser,
    sessions: web::Data<SessionController>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let session = sessions.pause(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// Resume a paused session at the same case.
#[utoipa::path(
    post,
    path = "/api/v1/sessions/{session_id}/resume",
    tag = "Sessions",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session resumed", body = SessionSnapshot),
        (status = 409, description = "Session is not paused", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn resume(
    auth: AuthenticatedUser,
    sessions: web::Data<SessionController>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let snapshot = sessions.resume(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Configure session routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/sessions/{session_id}").route(web::get().to(get_session)))
        .service(web::resource("/sessions/{session_id}/navigate").route(web::post().to(navigate)))
        .service(web::resource("/sessions/{session_id}/pause").route(web::post().to(pause)))
        .service(web::resource("/sessions/{session_id}/resume").route(web::post().to(resume)));
}
