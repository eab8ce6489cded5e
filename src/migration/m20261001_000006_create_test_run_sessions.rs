//! Migration: Create test_run_sessions table.

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
                CREATE TABLE test_run_sessions (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL,
                    suite_id UUID NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
                    name VARCHAR(200) NOT NULL,
                    status VARCHAR(20) NOT NULL DEFAULT 'in_progress'
                        CHECK (status IN ('in_progress', 'paused', 'completed', 'aborted')),

                    -- Aggregate progress
                    test_cases_total INTEGER NOT NULL CHECK (test_cases_total >= 0),
                    test_cases_completed INTEGER NOT NULL DEFAULT 0
                        CHECK (test_cases_completed >= 0 AND test_cases_completed <= test_cases_total),
                    progress_percentage INTEGER NOT NULL DEFAULT 0
                        CHECK (progress_percentage BETWEEN 0 AND 100),
                    passed_cases INTEGER NOT NULL DEFAULT 0,
                    failed_cases INTEGER NOT NULL DEFAULT 0,
                    blocked_cases INTEGER NOT NULL DEFAULT 0,
                    skipped_cases INTEGER NOT NULL DEFAULT 0,

                    current_index INTEGER NOT NULL DEFAULT 0,
                    auto_advance BOOLEAN NOT NULL DEFAULT TRUE,
                    -- Run order captured at start: [{"kind": ..., "id": ...}]
                    case_order JSONB NOT NULL DEFAULT '[]'::jsonb,
                    actual_start TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    actual_end TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_test_run_sessions_user_id ON test_run_sessions(user_id);
                CREATE INDEX idx_test_run_sessions_suite_id ON test_run_sessions(suite_id);

                CREATE TRIGGER update_test_run_sessions_updated_at
                    BEFORE UPDATE ON test_run_sessions
                    FOR EACH ROW
                    EXECUTE FUNCTION update_updated_at_column();
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
                DROP TRIGGER IF EXISTS update_test_run_sessions_updated_at ON test_run_sessions;
                DROP TABLE IF EXISTS test_run_sessions CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
