//! Reporting API handlers. All reports only cover the caller's own runs.

use actix_web::{HttpResponse, web};

use crate::auth::AuthenticatedUser;
use crate::error::AppResult;
use crate::models::{CasePerformance, DailyTrend, FailureFrequency, ReportFilter, SuiteStats};
use crate::services::ReportingService;

/// Session and outcome totals, optionally for one suite and date range.
#[utoipa::path(
    get,
    path = "/api/v1/reports/suite-stats",
    tag = "Reports",
    params(
        ("suite_id" = Option<uuid::Uuid>, Query, description = "Restrict to one suite"),
        ("from_date" = Option<String>, Query, description = "Inclusive lower bound (RFC 3339)"),
        ("to_date" = Option<String>, Query, description = "Inclusive upper bound (RFC 3339)")
    ),
    responses(
        (status = 200, description = "Suite statistics", body = SuiteStats),
        (status = 400, description = "Invalid query", body = crate::error::ErrorResponse),
    ),
    security(("bearer" = []))
)]
pub async fn suite_stats(
    auth: AuthenticatedUser,
    reporting: web::Data<ReportingService>,
    query: web::Query<ReportFilter>,
) -> AppResult<HttpResponse> {
    let stats = reporting.suite_stats(&auth.user, &query).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Per-case run history.
#[utoipa::path(
    get,
    path = "/api/v1/reports/case-performance",
    tag = "Reports",
    params(
        ("suite_id" = Option<uuid::Uuid>, Query, description = "Restrict to one suite"),
        ("from_date" = Option<String>, Query, description = "Inclusive lower bound (RFC 3339)"),
        ("to_date" = Option<String>, Query, description = "Inclusive upper bound (RFC 3339)")
    ),
    responses(
        (status = 200, description = "Case performance", body = Vec<CasePerformance>),
    ),
    security(("bearer" = []))
)]
pub async fn case_performance(
    auth: AuthenticatedUser,
    reporting: web::Data<ReportingService>,
    query: web::Query<ReportFilter>,
) -> AppResult<HttpResponse> {
    let rows = reporting.case_performance(&auth.user, &query).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Outcome counts per UTC day.
#[utoipa::path(
    get,
    path = "/api/v1/reports/daily-trends",
    tag = "Reports",
    params(
        ("suite_id" = Option<uuid::Uuid>, Query, description = "Restrict to one suite"),
        ("from_date" = Option<String>, Query, description = "Inclusive lower bound (RFC 3339)"),
        ("to_date" = Option<String>, Query, description = "Inclusive upper bound (RFC 3339)")
    ),
    responses(
        (status = 200, description = "Daily trends", body = Vec<DailyTrend>),
    ),
    security(("bearer" = []))
)]
pub async fn daily_trends(
    auth: AuthenticatedUser,
    reporting: web::Data<ReportingService>,
    query: web::Query<ReportFilter>,
) -> AppResult<HttpResponse> {
    let rows = reporting.daily_trends(&auth.user, &query).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Most frequently failing cases.
#[utoipa::path(
    get,
    path = "/api/v1/reports/failure-frequency",
    tag = "Reports",
    params(
        ("suite_id" = Option<uuid::Uuid>, Query, description = "Restrict to one suite"),
        ("from_date" = Option<String>, Query, description = "Inclusive lower bound (RFC 3339)"),
        ("to_date" = Option<String>, Query, description = "Inclusive upper bound (RFC 3339)"),
        ("limit" = Option<usize>, Query, description = "Number of cases (default 10, max 100)")
    ),
    responses(
        (status = 200, description = "Failure frequency", body = Vec<FailureFrequency>),
    ),
    security(("bearer" = []))
)]
pub async fn failure_frequency(
    auth: AuthenticatedUser,
    reporting: web::Data<ReportingService>,
    query: web::Query<ReportFilter>,
) -> AppResult<HttpResponse> {
    let rows = reporting.failure_frequency(&auth.user, &query).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/reports/suite-stats").route(web::get().to(suite_stats)))
        .service(web::resource("/reports/case-performance").route(web::get().to(case_performance)))
        .service(web::resource("/reports/daily-trends").route(web::get().to(daily_trends)))
        .service(
            web::resource("/reports/failure-frequency").route(web::get().to(failure_frequency)),
        );
}
