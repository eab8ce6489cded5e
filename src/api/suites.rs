//! Suite API handlers, including starting a run of a suite.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::{
    AddSuiteCaseRequest, CreateSuiteRequest, ListSuitesQuery, SessionSnapshot,
    StartSessionRequest, Suite, SuiteDetail, SuiteTestCase,
};
use crate::services::{CatalogService, SessionController};

/// Create a suite in one of the caller's projects.
#[utoipa::path(
    post,
    path = "/api/v1/suites",
    tag = "Catalog",
    request_body = CreateSuiteRequest,
    responses(
        (status = 201, description = "Suite created", body = Suite),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_suite(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    body: web::Json<CreateSuiteRequest>,
) -> AppResult<HttpResponse> {
    let suite = catalog.create_suite(&auth.user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(suite))
}

/// List the caller's suites.
#[utoipa::path(
    get,
    path = "/api/v1/suites",
    tag = "Catalog",
    params(("project_id" = Option<Uuid>, Query, description = "Only suites of this project")),
    responses(
        (status = 200, description = "Suites", body = Vec<Suite>),
    ),
    security(("bearer" = []))
)]
pub async fn list_suites(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    query: web::Query<ListSuitesQuery>,
) -> AppResult<HttpResponse> {
    let suites = catalog.list_suites(&auth.user, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(suites))
}

/// Get a suite with its cases in run order.
#[utoipa::path(
    get,
    path = "/api/v1/suites/{suite_id}",
    tag = "Catalog",
    params(("suite_id" = Uuid, Path, description = "Suite UUID")),
    responses(
        (status = 200, description = "Suite with ordered cases", body = SuiteDetail),
        (status = 403, description = "Suite belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Suite not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_suite(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let detail = catalog.get_suite(&auth.user, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Add a test case to a suite.
#[utoipa::path(
    post,
    path = "/api/v1/suites/{suite_id}/cases",
    tag = "Catalog",
    params(("suite_id" = Uuid, Path, description = "Suite UUID")),
    request_body = AddSuiteCaseRequest,
    responses(
        (status = 201, description = "Case added", body = SuiteTestCase),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 404, description = "Suite or test case not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Case already in suite", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn add_suite_case(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
    body: web::Json<AddSuiteCaseRequest>,
) -> AppResult<HttpResponse> {
    let entry = catalog
        .add_case(&auth.user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(entry))
}

/// Start a run session for a suite.
///
/// The first case's execution is opened immediately.
#[utoipa::path(
    post,
    path = "/api/v1/suites/{suite_id}/sessions",
    tag = "Sessions",
    params(("suite_id" = Uuid, Path, description = "Suite UUID")),
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session started", body = SessionSnapshot),
        (status = 400, description = "Suite has no test cases", body = crate::error::ErrorResponse),
        (status = 404, description = "Suite not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn start_session(
    auth: AuthenticatedUser,
    sessions: web::Data<SessionController>,
    path: web::Path<Uuid>,
    body: Option<web::Json<StartSessionRequest>>,
) -> AppResult<HttpResponse> {
    let req = body.map(|b| b.into_inner()).unwrap_or_default();
    let snapshot = sessions.start(&auth.user, path.into_inner(), req).await?;
    Ok(HttpResponse::Created().json(snapshot))
}

/// Configure suite routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/suites")
            .route(web::get().to(list_suites))
            .route(web::post().to(create_suite)),
    )
    .service(web::resource("/suites/{suite_id}").route(web::get().to(get_suite)))
    .service(web::resource("/suites/{suite_id}/cases").route(web::post().to(add_suite_case)))
    .service(web::resource("/suites/{suite_id}/sessions").route(web::post().to(start_session)));
}
