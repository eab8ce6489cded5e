//! API endpoint modules.

pub mod attachments;
pub mod executions;
pub mod health;
pub mod issues;
pub mod openapi;
pub mod projects;
pub mod reports;
pub mod sessions;
pub mod suites;

use actix_web::web;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;

/// Register every authenticated route. Mounted under `/api/v1`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.configure(projects::configure_routes)
        .configure(suites::configure_routes)
        .configure(sessions::configure_routes)
        .configure(executions::configure_routes)
        .configure(attachments::configure_routes)
        .configure(reports::configure_routes)
        .configure(issues::configure_routes);
}
