//! Project entity for SeaORM.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test_case::Entity")]
    TestCases,
    #[sea_orm(has_many = "super::platform_test_case::Entity")]
    PlatformTestCases,
    #[sea_orm(has_many = "super::suite::Entity")]
    Suites,
}

impl Related<super::test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestCases.def()
    }
}

impl Related<super::platform_test_case::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlatformTestCases.def()
    }
}

impl Related<super::suite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Suites.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
