//! Persistence seam for the engine.
//!
//! These traits are implemented by the db crate. `TransactionStore` is the
//! shared handle; `begin` opens a unit of work that sees and writes a
//! consistent state. Dropping a unit without `commit` discards its writes.

use std::collections::HashMap;
use std::future::Future;

use compta_shared::types::{
    AccountId, ChartId, LineId, ProjectId, ServiceUserId, TransactionId, UserId, YearId,
};
use serde::Serialize;
use thiserror::Error;

use super::account::{Account, Chart};
use super::line::Line;
use super::transaction::TransactionRecord;
use super::year::Year;

/// Persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The database rejected or failed an operation.
    #[error("database error: {0}")]
    Database(String),

    /// A stored row cannot be turned back into a domain value.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Create a database error.
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a corrupt-row error.
    #[must_use]
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}

/// A member linked to a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkedUser {
    /// Member id.
    pub id_user: UserId,
    /// Member display name.
    pub name: String,
    /// Service subscription the link belongs to, if any.
    pub id_service_user: Option<ServiceUserId>,
}

/// Read access to the ledger.
pub trait LedgerRead: Send + Sync {
    /// Find a fiscal year.
    fn find_year(
        &self,
        id: YearId,
    ) -> impl Future<Output = Result<Option<Year>, StoreError>> + Send;

    /// Find a chart with all its accounts.
    fn find_chart(
        &self,
        id: ChartId,
    ) -> impl Future<Output = Result<Option<Chart>, StoreError>> + Send;

    /// Accounts by id. Unknown ids are absent from the map.
    fn find_accounts(
        &self,
        ids: &[AccountId],
    ) -> impl Future<Output = Result<HashMap<AccountId, Account>, StoreError>> + Send;

    /// Project names by id. Unknown ids are absent from the map.
    fn project_names(
        &self,
        ids: &[ProjectId],
    ) -> impl Future<Output = Result<HashMap<ProjectId, String>, StoreError>> + Send;

    /// Returns true if the member exists.
    fn user_exists(&self, id: UserId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Returns true if the transaction exists.
    fn transaction_exists(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Find a transaction header.
    fn find_transaction(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<Option<TransactionRecord>, StoreError>> + Send;

    /// Lines of a transaction, in insertion order.
    fn find_lines(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<Vec<Line>, StoreError>> + Send;

    /// Transactions whose `id_related` points at `id`.
    fn find_related_transactions(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, StoreError>> + Send;

    /// Members linked to a transaction, ordered by member id.
    fn linked_users(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<Vec<LinkedUser>, StoreError>> + Send;
}

/// Writes performed inside a unit of work.
pub trait LedgerWrite: LedgerRead {
    /// Insert a transaction header and return its id.
    fn insert_transaction(
        &self,
        record: &TransactionRecord,
    ) -> impl Future<Output = Result<TransactionId, StoreError>> + Send;

    /// Update an existing transaction header.
    fn update_transaction(
        &self,
        record: &TransactionRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a transaction with its lines and user links.
    fn delete_transaction(
        &self,
        id: TransactionId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert a line and return its id.
    fn insert_line(
        &self,
        id_transaction: TransactionId,
        line: &Line,
    ) -> impl Future<Output = Result<LineId, StoreError>> + Send;

    /// Update a stored line.
    fn update_line(&self, line: &Line) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a stored line.
    fn delete_line(&self, id: LineId) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Link a member, replacing an existing link for the same member.
    fn link_user(
        &self,
        id: TransactionId,
        user: UserId,
        service: Option<ServiceUserId>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove links without a service whose member is not in `keep`.
    fn unlink_users_except(
        &self,
        id: TransactionId,
        keep: &[UserId],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the link created for a service subscription.
    fn unlink_service_user(
        &self,
        id: TransactionId,
        service: ServiceUserId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Make every write of the unit durable.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send
    where
        Self: Sized;
}

/// Shared store handle.
pub trait TransactionStore: LedgerRead {
    /// Unit of work type.
    type Unit: LedgerWrite;

    /// Open a unit of work.
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StoreError>> + Send;
}
