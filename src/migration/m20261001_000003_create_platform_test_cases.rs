//! Migration: Create platform_test_cases table (cross-platform cases).

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
                CREATE TABLE platform_test_cases (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    title VARCHAR(500) NOT NULL,
                    description TEXT,
                    platform VARCHAR(20) NOT NULL
                        CHECK (platform IN ('web', 'android', 'ios', 'desktop', 'api')),
                    preconditions TEXT,
                    test_steps JSONB NOT NULL DEFAULT '[]'::jsonb,
                    expected_result TEXT,
                    priority VARCHAR(20) NOT NULL DEFAULT 'medium'
                        CHECK (priority IN ('low', 'medium', 'high', 'critical')),
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_platform_test_cases_project_id ON platform_test_cases(project_id);
                CREATE INDEX idx_platform_test_cases_user_id ON platform_test_cases(user_id);

                CREATE TRIGGER update_platform_test_cases_updated_at
                    BEFORE UPDATE ON platform_test_cases
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
                DROP TRIGGER IF EXISTS update_platform_test_cases_updated_at ON platform_test_cases;
                DROP TABLE IF EXISTS platform_test_cases CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
