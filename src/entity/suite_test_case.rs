//! Suite membership entity for SeaORM.
//!
//! Exactly one of `test_case_id` / `platform_test_case_id` is set (CHECK constraint).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_suite_cases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub suite_id: Uuid,
    pub test_case_id: Option<Uuid>,
    pub platform_test_case_id: Option<Uuid>,
    pub sequence_order: i32,
    pub priority: String,
    pub estimated_duration_minutes: Option<i32>,
    pub created_at: DateTimeUtc,
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
}

impl Related<super::suite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suite.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
