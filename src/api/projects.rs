//! Project and test case API handlers.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{CaseKind, CaseRef, CreateProjectRequest, CreateTestCaseRequest, Project};
use crate::services::CatalogService;

/// Create a project.
#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Catalog",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_project(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    body: web::Json<CreateProjectRequest>,
) -> AppResult<HttpResponse> {
    let project = catalog.create_project(&auth.user, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

/// List the caller's projects.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Catalog",
    responses(
        (status = 200, description = "Projects", body = Vec<Project>),
        (status = 401, description = "Unauthorized", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_projects(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
) -> AppResult<HttpResponse> {
    let projects = catalog.list_projects(&auth.user).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Create a regular or cross-platform test case.
///
/// Steps are renumbered 1..n in the order given.
#[utoipa::path(
    post,
    path = "/api/v1/projects/{project_id}/test-cases",
    tag = "Catalog",
    params(("project_id" = Uuid, Path, description = "Project UUID")),
    request_body = CreateTestCaseRequest,
    responses(
        (status = 201, description = "Test case created", body = Object),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Project belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn create_test_case(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
    body: web::Json<CreateTestCaseRequest>,
) -> AppResult<HttpResponse> {
    let case = catalog
        .create_test_case(&auth.user, path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(case))
}

/// List a project's test cases of both kinds.
#[utoipa::path(
    get,
    path = "/api/v1/projects/{project_id}/test-cases",
    tag = "Catalog",
    params(("project_id" = Uuid, Path, description = "Project UUID")),
    responses(
        (status = 200, description = "Test cases, tagged by case_type", body = Vec<Object>),
        (status = 403, description = "Project belongs to another user", body = crate::error::ErrorResponse),
        (status = 404, description = "Project not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn list_test_cases(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let cases = catalog
        .list_test_cases(&auth.user, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(cases))
}

/// Get one test case.
#[utoipa::path(
    get,
    path = "/api/v1/test-cases/{kind}/{id}",
    tag = "Catalog",
    params(
        ("kind" = String, Path, description = "regular or cross_platform"),
        ("id" = Uuid, Path, description = "Test case UUID")
    ),
    responses(
        (status = 200, description = "Test case", body = Object),
        (status = 400, description = "Unknown kind", body = crate::error::ErrorResponse),
        (status = 404, description = "Test case not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn get_test_case(
    auth: AuthenticatedUser,
    catalog: web::Data<CatalogService>,
    path: web::Path<(String, Uuid)>,
) -> AppResult<HttpResponse> {
    let (kind, id) = path.into_inner();
    let kind = CaseKind::parse(&kind)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown test case kind '{}'", kind)))?;

    let case = catalog
        .get_test_case(&auth.user, CaseRef { kind, id })
        .await?;
    Ok(HttpResponse::Ok().json(case))
}

/// Configure project and test case routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/projects")
            .route(web::get().to(list_projects))
            .route(web::post().to(create_project)),
    )
    .service(
        web::resource("/projects/{project_id}/test-cases")
            .route(web::get().to(list_test_cases))
            .route(web::post().to(create_test_case)),
    )
    .service(web::resource("/test-cases/{kind}/{id}").route(web::get().to(get_test_case)));
}
