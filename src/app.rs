//! Service wiring shared by the server binary and the HTTP tests.

use std::sync::Arc;
use std::time::Duration;

use actix_web::web;

use crate::auth::JwtKeys;
use crate::config::{Config, TrackerSettings};
use crate::error::AppResult;
use crate::repository::{AttachmentRepository, CatalogRepository, ObjectStore, RunRepository};
use crate::services::{
    CatalogService, EvidenceService, Executor, InFlight, ReportingService, SessionController,
    TrackerService,
};

/// Headroom for the JSON envelope around a base64 capture.
const JSON_ENVELOPE_BYTES: usize = 64 * 1024;

/// Data-access implementations the services run against.
#[derive(Clone)]
pub struct Ports {
    pub catalog: Arc<dyn CatalogRepository>,
    pub runs: Arc<dyn RunRepository>,
    pub attachments: Arc<dyn AttachmentRepository>,
    pub objects: Arc<dyn ObjectStore>,
}

/// The parts of `Config` the services need.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub max_attachment_size: usize,
    pub signed_url_ttl: Duration,
    pub tracker: TrackerSettings,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attachment_size: config.max_attachment_size,
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_secs),
            tracker: config.tracker.clone(),
        }
    }
}

/// Every service, wrapped for registration as app data.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: web::Data<CatalogService>,
    pub sessions: web::Data<SessionController>,
    pub executor: web::Data<Executor>,
    pub evidence: web::Data<EvidenceService>,
    pub reporting: web::Data<ReportingService>,
    pub tracker: web::Data<TrackerService>,
    pub jwt: web::Data<JwtKeys>,
    max_attachment_size: usize,
}

impl AppServices {
    pub fn build(ports: Ports, settings: &ServiceSettings, jwt: JwtKeys) -> AppResult<Self> {
        // The executor advances through the same controller the handlers use
        let sessions = Arc::new(SessionController::new(
            ports.catalog.clone(),
            ports.runs.clone(),
        ));
        let executor = Executor::new(
            ports.catalog.clone(),
            ports.runs.clone(),
            sessions.clone(),
            InFlight::default(),
        );
        let evidence = EvidenceService::new(
            ports.runs.clone(),
            ports.attachments.clone(),
            ports.objects.clone(),
            settings.max_attachment_size,
            settings.signed_url_ttl,
        );
        let tracker = TrackerService::new(
            ports.catalog.clone(),
            ports.runs.clone(),
            &settings.tracker,
        )?;

        Ok(Self {
            catalog: web::Data::new(CatalogService::new(ports.catalog.clone())),
            sessions: web::Data::from(sessions),
            executor: web::Data::new(executor),
            evidence: web::Data::new(evidence),
            reporting: web::Data::new(ReportingService::new(ports.catalog, ports.runs)),
            tracker: web::Data::new(tracker),
            jwt: web::Data::new(jwt),
            max_attachment_size: settings.max_attachment_size,
        })
    }

    /// Register services and body limits, then mount the API under `/api/v1`.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let json_limit = self.max_attachment_size.saturating_mul(4) / 3 + JSON_ENVELOPE_BYTES;

        cfg.app_data(self.catalog.clone())
            .app_data(self.sessions.clone())
            .app_data(self.executor.clone())
            .app_data(self.evidence.clone())
            .app_data(self.reporting.clone())
            .app_data(self.tracker.clone())
            .app_data(self.jwt.clone())
            .app_data(web::JsonConfig::default().limit(json_limit))
            .service(
                web::scope("/api/v1")
                    .configure(crate::api::configure_health_routes)
                    .configure(crate::api::configure_routes),
            );
    }
}
