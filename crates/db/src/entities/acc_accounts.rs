//! `SeaORM` Entity for acc_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "acc_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub id_chart: i64,
    pub code: String,
    pub label: String,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::acc_charts::Entity",
        from = "Column::IdChart",
        to = "super::acc_charts::Column::Id"
    )]
    Chart,
}

impl Related<super::acc_charts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
