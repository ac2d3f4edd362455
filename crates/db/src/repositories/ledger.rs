//! `SeaORM` implementation of the ledger store.
//!
//! Read queries are written once over [`ConnectionTrait`] and shared by the
//! pooled handle and by units of work, so reads inside a unit see its own
//! uncommitted writes. Units run at SERIALIZABLE isolation on PostgreSQL.

use std::collections::HashMap;

use compta_core::accounting::{
    Account, AccountPosition, Chart, LedgerRead, LedgerWrite, Line, LinkedUser, StoreError,
    TransactionRecord, TransactionStatus, TransactionStore, TransactionType, Year,
};
use compta_shared::types::{
    AccountId, ChartId, LineId, Money, ProjectId, ServiceUserId, TransactionId, UserId, YearId,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::debug;

use crate::entities::{
    acc_accounts, acc_charts, acc_projects, acc_transactions, acc_transactions_lines,
    acc_transactions_users, acc_years, users,
};

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaLedgerStore {
    db: DatabaseConnection,
}

impl SeaLedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// A unit of work wrapping one database transaction.
///
/// Dropping the unit without calling `commit` rolls the transaction back.
pub struct SeaLedgerUnit {
    txn: DatabaseTransaction,
}

fn db_err(err: DbErr) -> StoreError {
    StoreError::database(err.to_string())
}

macro_rules! impl_ledger_read {
    ($ty:ty, $conn:ident) => {
        impl LedgerRead for $ty {
            async fn find_year(&self, id: YearId) -> Result<Option<Year>, StoreError> {
                find_year(&self.$conn, id).await
            }

            async fn find_chart(&self, id: ChartId) -> Result<Option<Chart>, StoreError> {
                find_chart(&self.$conn, id).await
            }

            async fn find_accounts(
                &self,
                ids: &[AccountId],
            ) -> Result<HashMap<AccountId, Account>, StoreError> {
                find_accounts(&self.$conn, ids).await
            }

            async fn project_names(
                &self,
                ids: &[ProjectId],
            ) -> Result<HashMap<ProjectId, String>, StoreError> {
                project_names(&self.$conn, ids).await
            }

            async fn user_exists(&self, id: UserId) -> Result<bool, StoreError> {
                user_exists(&self.$conn, id).await
            }

            async fn transaction_exists(&self, id: TransactionId) -> Result<bool, StoreError> {
                transaction_exists(&self.$conn, id).await
            }

            async fn find_transaction(
                &self,
                id: TransactionId,
            ) -> Result<Option<TransactionRecord>, StoreError> {
                find_transaction(&self.$conn, id).await
            }

            async fn find_lines(&self, id: TransactionId) -> Result<Vec<Line>, StoreError> {
                find_lines(&self.$conn, id).await
            }

            async fn find_related_transactions(
                &self,
                id: TransactionId,
            ) -> Result<Vec<TransactionRecord>, StoreError> {
                find_related_transactions(&self.$conn, id).await
            }

            async fn linked_users(
                &self,
                id: TransactionId,
            ) -> Result<Vec<LinkedUser>, StoreError> {
                linked_users(&self.$conn, id).await
            }
        }
    };
}

impl_ledger_read!(SeaLedgerStore, db);
impl_ledger_read!(SeaLedgerUnit, txn);

impl TransactionStore for SeaLedgerStore {
    type Unit = SeaLedgerUnit;

    async fn begin(&self) -> Result<SeaLedgerUnit, StoreError> {
        let txn = if self.db.get_database_backend() == DbBackend::Postgres {
            self.db
                .begin_with_config(Some(IsolationLevel::Serializable), None)
                .await
        } else {
            self.db.begin().await
        }
        .map_err(db_err)?;

        debug!("Ledger unit opened");
        Ok(SeaLedgerUnit { txn })
    }
}

impl LedgerWrite for SeaLedgerUnit {
    async fn insert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> Result<TransactionId, StoreError> {
        let model = acc_transactions::ActiveModel {
            transaction_type: Set(record.transaction_type.code()),
            status: Set(i32::from(record.status.bits())),
            label: Set(record.label.clone()),
            notes: Set(record.notes.clone()),
            reference: Set(record.reference.clone()),
            date: Set(record.date),
            validated: Set(record.validated),
            hash: Set(record.hash.clone()),
            prev_hash: Set(record.prev_hash.clone()),
            id_year: Set(record.id_year.get()),
            id_creator: Set(record.id_creator.map(UserId::get)),
            id_related: Set(record.id_related.map(TransactionId::get)),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(db_err)?;

        debug!(transaction_id = model.id, "Inserted transaction row");
        Ok(TransactionId::new(model.id))
    }

    async fn update_transaction(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let id = record
            .id
            .ok_or_else(|| StoreError::database("cannot update a transaction without id"))?;

        acc_transactions::ActiveModel {
            id: Set(id.get()),
            transaction_type: Set(record.transaction_type.code()),
            status: Set(i32::from(record.status.bits())),
            label: Set(record.label.clone()),
            notes: Set(record.notes.clone()),
            reference: Set(record.reference.clone()),
            date: Set(record.date),
            validated: Set(record.validated),
            hash: Set(record.hash.clone()),
            prev_hash: Set(record.prev_hash.clone()),
            id_year: Set(record.id_year.get()),
            id_creator: Set(record.id_creator.map(UserId::get)),
            id_related: Set(record.id_related.map(TransactionId::get)),
        }
        .update(&self.txn)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_transaction(&self, id: TransactionId) -> Result<(), StoreError> {
        acc_transactions_users::Entity::delete_many()
            .filter(acc_transactions_users::Column::IdTransaction.eq(id.get()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        acc_transactions_lines::Entity::delete_many()
            .filter(acc_transactions_lines::Column::IdTransaction.eq(id.get()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        acc_transactions::Entity::delete_by_id(id.get())
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn insert_line(
        &self,
        id_transaction: TransactionId,
        line: &Line,
    ) -> Result<LineId, StoreError> {
        let id_account = line
            .id_account
            .ok_or_else(|| StoreError::database("cannot store a line without account"))?;

        let model = acc_transactions_lines::ActiveModel {
            id_transaction: Set(id_transaction.get()),
            id_account: Set(id_account.get()),
            id_project: Set(line.id_project.map(ProjectId::get)),
            label: Set(line.label.clone()),
            reference: Set(line.reference.clone()),
            credit: Set(line.credit.minor()),
            debit: Set(line.debit.minor()),
            reconciled: Set(line.reconciled),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(db_err)?;

        Ok(LineId::new(model.id))
    }

    async fn update_line(&self, line: &Line) -> Result<(), StoreError> {
        let (Some(id), Some(id_account)) = (line.id, line.id_account) else {
            return Err(StoreError::database("cannot update an unsaved line"));
        };

        // The owning transaction never changes.
        acc_transactions_lines::ActiveModel {
            id: Set(id.get()),
            id_account: Set(id_account.get()),
            id_project: Set(line.id_project.map(ProjectId::get)),
            label: Set(line.label.clone()),
            reference: Set(line.reference.clone()),
            credit: Set(line.credit.minor()),
            debit: Set(line.debit.minor()),
            reconciled: Set(line.reconciled),
            ..Default::default()
        }
        .update(&self.txn)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_line(&self, id: LineId) -> Result<(), StoreError> {
        acc_transactions_lines::Entity::delete_by_id(id.get())
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn link_user(
        &self,
        id: TransactionId,
        user: UserId,
        service: Option<ServiceUserId>,
    ) -> Result<(), StoreError> {
        acc_transactions_users::Entity::delete_many()
            .filter(acc_transactions_users::Column::IdTransaction.eq(id.get()))
            .filter(acc_transactions_users::Column::IdUser.eq(user.get()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;

        acc_transactions_users::ActiveModel {
            id_transaction: Set(id.get()),
            id_user: Set(user.get()),
            id_service_user: Set(service.map(ServiceUserId::get)),
        }
        .insert(&self.txn)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn unlink_users_except(
        &self,
        id: TransactionId,
        keep: &[UserId],
    ) -> Result<(), StoreError> {
        let mut query = acc_transactions_users::Entity::delete_many()
            .filter(acc_transactions_users::Column::IdTransaction.eq(id.get()))
            .filter(acc_transactions_users::Column::IdServiceUser.is_null());

        if !keep.is_empty() {
            query = query.filter(
                acc_transactions_users::Column::IdUser.is_not_in(keep.iter().map(|u| u.get())),
            );
        }

        query.exec(&self.txn).await.map_err(db_err)?;
        Ok(())
    }

    async fn unlink_service_user(
        &self,
        id: TransactionId,
        service: ServiceUserId,
    ) -> Result<(), StoreError> {
        acc_transactions_users::Entity::delete_many()
            .filter(acc_transactions_users::Column::IdTransaction.eq(id.get()))
            .filter(acc_transactions_users::Column::IdServiceUser.eq(service.get()))
            .exec(&self.txn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(db_err)?;
        debug!("Ledger unit committed");
        Ok(())
    }
}

async fn find_year<C: ConnectionTrait>(db: &C, id: YearId) -> Result<Option<Year>, StoreError> {
    let model = acc_years::Entity::find_by_id(id.get())
        .one(db)
        .await
        .map_err(db_err)?;

    Ok(model.map(|m| Year {
        id: YearId::new(m.id),
        label: m.label,
        start_date: m.start_date,
        end_date: m.end_date,
        closed: m.closed,
        id_chart: ChartId::new(m.id_chart),
    }))
}

async fn find_chart<C: ConnectionTrait>(db: &C, id: ChartId) -> Result<Option<Chart>, StoreError> {
    let found = acc_charts::Entity::find_by_id(id.get())
        .one(db)
        .await
        .map_err(db_err)?;
    if found.is_none() {
        return Ok(None);
    }

    let accounts = acc_accounts::Entity::find()
        .filter(acc_accounts::Column::IdChart.eq(id.get()))
        .order_by_asc(acc_accounts::Column::Code)
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(account_from_model)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Chart::new(id, accounts)))
}

async fn find_accounts<C: ConnectionTrait>(
    db: &C,
    ids: &[AccountId],
) -> Result<HashMap<AccountId, Account>, StoreError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    acc_accounts::Entity::find()
        .filter(acc_accounts::Column::Id.is_in(ids.iter().map(|a| a.get())))
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|m| account_from_model(m).map(|a| (a.id, a)))
        .collect()
}

async fn project_names<C: ConnectionTrait>(
    db: &C,
    ids: &[ProjectId],
) -> Result<HashMap<ProjectId, String>, StoreError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let projects = acc_projects::Entity::find()
        .filter(acc_projects::Column::Id.is_in(ids.iter().map(|p| p.get())))
        .all(db)
        .await
        .map_err(db_err)?;

    Ok(projects
        .into_iter()
        .map(|p| (ProjectId::new(p.id), p.label))
        .collect())
}

async fn user_exists<C: ConnectionTrait>(db: &C, id: UserId) -> Result<bool, StoreError> {
    let count = users::Entity::find_by_id(id.get())
        .count(db)
        .await
        .map_err(db_err)?;
    Ok(count > 0)
}

async fn transaction_exists<C: ConnectionTrait>(
    db: &C,
    id: TransactionId,
) -> Result<bool, StoreError> {
    let count = acc_transactions::Entity::find_by_id(id.get())
        .count(db)
        .await
        .map_err(db_err)?;
    Ok(count > 0)
}

async fn find_transaction<C: ConnectionTrait>(
    db: &C,
    id: TransactionId,
) -> Result<Option<TransactionRecord>, StoreError> {
    acc_transactions::Entity::find_by_id(id.get())
        .one(db)
        .await
        .map_err(db_err)?
        .map(record_from_model)
        .transpose()
}

async fn find_lines<C: ConnectionTrait>(db: &C, id: TransactionId) -> Result<Vec<Line>, StoreError> {
    let lines = acc_transactions_lines::Entity::find()
        .filter(acc_transactions_lines::Column::IdTransaction.eq(id.get()))
        .order_by_asc(acc_transactions_lines::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?;

    Ok(lines.into_iter().map(line_from_model).collect())
}

async fn find_related_transactions<C: ConnectionTrait>(
    db: &C,
    id: TransactionId,
) -> Result<Vec<TransactionRecord>, StoreError> {
    acc_transactions::Entity::find()
        .filter(acc_transactions::Column::IdRelated.eq(id.get()))
        .order_by_asc(acc_transactions::Column::Date)
        .order_by_asc(acc_transactions::Column::Id)
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(record_from_model)
        .collect()
}

async fn linked_users<C: ConnectionTrait>(
    db: &C,
    id: TransactionId,
) -> Result<Vec<LinkedUser>, StoreError> {
    let links = acc_transactions_users::Entity::find()
        .filter(acc_transactions_users::Column::IdTransaction.eq(id.get()))
        .order_by_asc(acc_transactions_users::Column::IdUser)
        .all(db)
        .await
        .map_err(db_err)?;
    if links.is_empty() {
        return Ok(Vec::new());
    }

    let names: HashMap<i64, String> = users::Entity::find()
        .filter(users::Column::Id.is_in(links.iter().map(|l| l.id_user)))
        .all(db)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    links
        .into_iter()
        .map(|link| {
            let name = names.get(&link.id_user).cloned().ok_or_else(|| {
                StoreError::corrupt(format!("linked user {} is missing", link.id_user))
            })?;
            Ok(LinkedUser {
                id_user: UserId::new(link.id_user),
                name,
                id_service_user: link.id_service_user.map(ServiceUserId::new),
            })
        })
        .collect()
}

fn account_from_model(model: acc_accounts::Model) -> Result<Account, StoreError> {
    let position = AccountPosition::from_code(model.position).ok_or_else(|| {
        StoreError::corrupt(format!(
            "account {} has unknown position {}",
            model.id, model.position
        ))
    })?;

    Ok(Account {
        id: AccountId::new(model.id),
        id_chart: ChartId::new(model.id_chart),
        code: model.code,
        label: model.label,
        position,
    })
}

fn record_from_model(model: acc_transactions::Model) -> Result<TransactionRecord, StoreError> {
    let transaction_type = TransactionType::from_code(model.transaction_type).ok_or_else(|| {
        StoreError::corrupt(format!(
            "transaction {} has unknown type {}",
            model.id, model.transaction_type
        ))
    })?;
    let bits = u8::try_from(model.status).map_err(|_| {
        StoreError::corrupt(format!(
            "transaction {} has invalid status {}",
            model.id, model.status
        ))
    })?;

    Ok(TransactionRecord {
        id: Some(TransactionId::new(model.id)),
        transaction_type,
        status: TransactionStatus::from_bits_truncate(bits),
        label: model.label,
        notes: model.notes,
        reference: model.reference,
        date: model.date,
        validated: model.validated,
        hash: model.hash,
        prev_hash: model.prev_hash,
        id_year: YearId::new(model.id_year),
        id_creator: model.id_creator.map(UserId::new),
        id_related: model.id_related.map(TransactionId::new),
    })
}

fn line_from_model(model: acc_transactions_lines::Model) -> Line {
    Line {
        id: Some(LineId::new(model.id)),
        id_transaction: Some(TransactionId::new(model.id_transaction)),
        id_account: Some(AccountId::new(model.id_account)),
        id_project: model.id_project.map(ProjectId::new),
        label: model.label,
        reference: model.reference,
        credit: Money::from_minor(model.credit),
        debit: Money::from_minor(model.debit),
        reconciled: model.reconciled,
    }
}
