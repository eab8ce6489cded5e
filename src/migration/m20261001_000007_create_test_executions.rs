//! Migration: Create test_executions table.
//!
//! One active execution per (session, test case).

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
                CREATE TABLE test_executions (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL,
                    session_id UUID NOT NULL REFERENCES test_run_sessions(id) ON DELETE CASCADE,
                    test_case_id UUID REFERENCES test_cases(id) ON DELETE CASCADE,
                    platform_test_case_id UUID REFERENCES platform_test_cases(id) ON DELETE CASCADE,
                    status VARCHAR(20) NOT NULL DEFAULT 'in_progress'
                        CHECK (status IN ('in_progress', 'passed', 'failed', 'blocked', 'skipped')),
                    started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    completed_at TIMESTAMPTZ,
                    completed_steps JSONB NOT NULL DEFAULT '[]'::jsonb,
                    failed_steps JSONB NOT NULL DEFAULT '[]'::jsonb,
                    execution_notes TEXT,
                    failure_reason TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    deleted_at TIMESTAMPTZ,

                    CONSTRAINT chk_test_executions_one_case
                        CHECK ((test_case_id IS NULL) <> (platform_test_case_id IS NULL))
                );

                -- Exactly one active execution per (session, case)
                CREATE UNIQUE INDEX idx_test_executions_session_case
                    ON test_executions(session_id, COALESCE(test_case_id, platform_test_case_id))
                    WHERE deleted_at IS NULL;

                -- Report queries over finalized executions
                CREATE INDEX idx_test_executions_user_completed
                    ON test_executions(user_id, completed_at)
                    WHERE deleted_at IS NULL AND status <> 'in_progress';

                CREATE TRIGGER update_test_executions_updated_at
                    BEFORE UPDATE ON test_executions
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
                DROP TRIGGER IF EXISTS update_test_executions_updated_at ON test_executions;
                DROP TABLE IF EXISTS test_executions CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
