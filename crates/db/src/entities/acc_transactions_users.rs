//! `SeaORM` Entity for acc_transactions_users table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "acc_transactions_users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_transaction: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub id_user: i64,
    pub id_service_user: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::acc_transactions::Entity",
        from = "Column::IdTransaction",
        to = "super::acc_transactions::Column::Id"
    )]
    Transaction,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::IdUser",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::acc_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
