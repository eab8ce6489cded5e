//! Migration: Create test_attachments table (evidence files).

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
                CREATE TABLE test_attachments (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL,
                    execution_id UUID NOT NULL REFERENCES test_executions(id) ON DELETE CASCADE,
                    test_case_id UUID REFERENCES test_cases(id) ON DELETE CASCADE,
                    platform_test_case_id UUID REFERENCES platform_test_cases(id) ON DELETE CASCADE,
                    step_number INTEGER CHECK (step_number IS NULL OR step_number >= 1),
                    description TEXT,

                    -- File info
                    file_name VARCHAR(500) NOT NULL,
                    storage_path VARCHAR(1000) NOT NULL UNIQUE, -- full object key
                    content_type VARCHAR(100) NOT NULL
                        CHECK (content_type IN ('image/png', 'image/jpeg', 'image/gif', 'image/webp')),
                    size_bytes BIGINT NOT NULL CHECK (size_bytes > 0),
                    checksum_sha256 CHAR(64) NOT NULL,

                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

                    CONSTRAINT chk_test_attachments_one_case
                        CHECK ((test_case_id IS NULL) <> (platform_test_case_id IS NULL))
                );

                CREATE INDEX idx_test_attachments_execution_id ON test_attachments(execution_id);
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
                DROP TABLE IF EXISTS test_attachments CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
