//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_projects;
mod m20261001_000002_create_test_cases;
mod m20261001_000003_create_platform_test_cases;
mod m20261001_000004_create_suites;
mod m20261001_000005_create_test_suite_cases;
mod m20261001_000006_create_test_run_sessions;
mod m20261001_000007_create_test_executions;
mod m20261001_000008_create_test_attachments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_projects::Migration),
            Box::new(m20261001_000002_create_test_cases::Migration),
            Box::new(m20261001_000003_create_platform_test_cases::Migration),
            Box::new(m20261001_000004_create_suites::Migration),
            Box::new(m20261001_000005_create_test_suite_cases::Migration),
            Box::new(m20261001_000006_create_test_run_sessions::Migration),
            Box::new(m20261001_000007_create_test_executions::Migration),
            Box::new(m20261001_000008_create_test_attachments::Migration),
        ]
    }
}
