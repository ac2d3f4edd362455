//! `SeaORM` Entity for acc_transactions_lines table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "acc_transactions_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub id_transaction: i64,
    pub id_account: i64,
    pub id_project: Option<i64>,
    pub label: Option<String>,
    pub reference: Option<String>,
    pub credit: i64,
    pub debit: i64,
    pub reconciled: bool,
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
        belongs_to = "super::acc_accounts::Entity",
        from = "Column::IdAccount",
        to = "super::acc_accounts::Column::Id"
    )]
    Account,
}

impl Related<super::acc_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl Related<super::acc_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
