//! Test execution entity for SeaORM.
//!
//! One active row per (session, test case); see the partial unique index.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_executions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub test_case_id: Option<Uuid>,
    pub platform_test_case_id: Option<Uuid>,
    /// in_progress, passed, failed, blocked, skipped
    pub status: String,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
    /// Sorted step numbers: [1, 2, ...]
    #[sea_orm(column_type = "JsonBinary")]
    pub completed_steps: JsonValue,
    /// [{step_number, reason}]
    #[sea_orm(column_type = "JsonBinary")]
    pub failed_steps: JsonValue,
    pub execution_notes: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::run_session::Entity",
        from = "Column::SessionId",
        to = "super::run_session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,
    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachments,
}

impl Related<super::run_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
