//! Test run session entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_run_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub suite_id: Uuid,
    pub name: String,
    /// in_progress, paused, completed, aborted
    pub status: String,
    pub test_cases_total: i32,
    pub test_cases_completed: i32,
    pub progress_percentage: i32,
    pub passed_cases: i32,
    pub failed_cases: i32,
    pub blocked_cases: i32,
    pub skipped_cases: i32,
    pub current_index: i32,
    pub auto_advance: bool,
    /// Case references in run order, fixed when the session starts
    #[sea_orm(column_type = "JsonBinary")]
    pub case_order: JsonValue,
    pub actual_start: DateTimeUtc,
    pub actual_end: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::suite::Entity",
        from = "Column::SuiteId",
        to = "super::suite::Column::Id",
        on_delete = "Cascade"
    )]
    Suite,
    #[sea_orm(has_many = "super::execution::Entity")]
    Executions,
}

impl Related<super::suite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suite.def()
    }
}

impl Related<super::execution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Executions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
