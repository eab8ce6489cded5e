//! Migration: Create suites table.

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
                CREATE TABLE suites (
                    id UUID PRIMARY KEY,
                    user_id UUID NOT NULL,
                    project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    name VARCHAR(200) NOT NULL,
                    description TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                );

                CREATE INDEX idx_suites_user_id ON suites(user_id);
                CREATE INDEX idx_suites_project_id ON suites(project_id);

                CREATE TRIGGER update_suites_updated_at
                    BEFORE UPDATE ON suites
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
                DROP TRIGGER IF EXISTS update_suites_updated_at ON suites;
                DROP TABLE IF EXISTS suites CASCADE;
                "#,
            )
            .await?;

        Ok(())
    }
}
