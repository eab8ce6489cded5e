//! Migration: Create test_suite_cases join table.
//!
//! Each row references exactly one regular or cross-platform case.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                CREATE TABLE test_suite_cases (
                    id UUID PRIMARY KEY,
                    suite_id UUID NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
                    test_case_id UUID REFERENCES test_cases(id) ON DELETE CASCADE,
                    platform_test_case_id UUID REFERENCES platform_test_cases(id) ON DELETE CASCADE,
                    sequence_order INTEGER NOT NULL DEFAULT 0,
                    priority VARCHAR(20) NOT NULL DEFAULT 'medium'
                        CHECK (priority IN ('low', 'medium', 'high', 'critical')),
                    estimated_duration_minutes INTEGER
                        CHECK (estimated_duration_minutes IS NULL OR estimated_duration_minutes >= 0),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    CONSTRAINT chk_test_suite_cases_one_case
                        CHECK ((test_case_id IS NULL) <> (platform_test_case_id IS NULL))
                );

                -- A case appears at most once per suite
                CREATE UNIQUE INDEX idx_test_suite_cases_unique_case
                    ON test_suite_cases(suite_id, COALESCE(test_case_id, platform_test_case_id));

                -- Run order lookup
                CREATE INDEX idx_test_suite_cases_order ON test_suite_cases(suite_id, sequence_order);
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                DROP TABLE IF EXISTS test_suite_cases CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
