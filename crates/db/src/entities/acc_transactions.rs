//! `SeaORM` Entity for acc_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "acc_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "type")]
    pub transaction_type: i32,
    pub status: i32,
    pub label: String,
    pub notes: Option<String>,
    pub reference: Option<String>,
    pub date: Date,
    pub validated: bool,
    pub hash: Option<String>,
    pub prev_hash: Option<String>,
    pub id_year: i64,
    pub id_creator: Option<i64>,
    pub id_related: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::acc_years::Entity",
        from = "Column::IdYear",
        to = "super::acc_years::Column::Id"
    )]
    Year,
    #[sea_orm(has_many = "super::acc_transactions_lines::Entity")]
    Lines,
}

impl Related<super::acc_years::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Year.def()
    }
}

impl Related<super::acc_transactions_lines::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
