//! Transaction service: loading, importing and atomic writes.
//!
//! The aggregate itself is pure. This service supplies it with the year,
//! chart, account and member data it needs from the store, and wraps every
//! write in a single unit of work.

use std::collections::HashMap;
use std::sync::Arc;

use compta_shared::config::AccountingConfig;
use compta_shared::types::{
    AccountId, LineId, ProjectId, ServiceUserId, TransactionId, UserId, YearId,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::account::{Account, AccountSelector, Chart};
use super::check::CheckContext;
use super::diff::TransactionDiff;
use super::error::{LogicError, TransactionError, ValidationError};
use super::form::{FormInput, get_int};
use super::import::ImportContext;
use super::line::LineWithAccount;
use super::status::TransactionStatus;
use super::store::{LedgerRead, LedgerWrite, LinkedUser, StoreError, TransactionStore};
use super::transaction::{JournalEntry, PayoffSummary, Transaction, TransactionRecord};
use super::types::{TransactionType, TypeDetails};
use super::year::Year;
use crate::storage::{StorageService, StoredFile};

/// Orchestrates the transaction aggregate against a store.
pub struct TransactionService<S: TransactionStore> {
    store: Arc<S>,
    storage: Arc<StorageService>,
    settings: AccountingConfig,
}

impl<S: TransactionStore> TransactionService<S> {
    /// Create a new transaction service.
    #[must_use]
    pub fn new(store: Arc<S>, storage: Arc<StorageService>, settings: AccountingConfig) -> Self {
        Self {
            store,
            storage,
            settings,
        }
    }

    /// Load a stored transaction with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no transaction has this id.
    pub async fn load(&self, id: TransactionId) -> Result<Transaction, TransactionError> {
        let record = self
            .store
            .find_transaction(id)
            .await?
            .ok_or(TransactionError::NotFound(id))?;
        let lines = self.store.find_lines(id).await?;
        Ok(Transaction::from_record(record, lines))
    }

    // ========== Imports ==========

    /// Imports an advanced or simplified form.
    pub async fn import_form(
        &self,
        transaction: &mut Transaction,
        source: &FormInput,
    ) -> Result<(), TransactionError> {
        let chart = self.form_chart(transaction, source).await?;
        transaction.import_form(source, &self.import_context(chart.as_ref()))?;
        Ok(())
    }

    /// Imports the creation form.
    pub async fn import_from_new_form(
        &self,
        transaction: &mut Transaction,
        source: &FormInput,
    ) -> Result<(), TransactionError> {
        let chart = self.form_chart(transaction, source).await?;
        transaction.import_from_new_form(source, &self.import_context(chart.as_ref()))?;
        Ok(())
    }

    /// Imports an API payload with a symbolic type name.
    pub async fn import_from_api(
        &self,
        transaction: &mut Transaction,
        source: &FormInput,
    ) -> Result<(), TransactionError> {
        let chart = self.form_chart(transaction, source).await?;
        transaction.import_from_api(source, &self.import_context(chart.as_ref()))?;
        Ok(())
    }

    /// Imports a pay-off form. `pay_off_from` must have been called first.
    pub async fn import_from_payoff_form(
        &self,
        transaction: &mut Transaction,
        source: &FormInput,
    ) -> Result<(), TransactionError> {
        let chart = self.form_chart(transaction, source).await?;
        transaction.import_from_payoff_form(source, &self.import_context(chart.as_ref()))
    }

    /// Imports a deposit form.
    pub async fn import_from_deposit_form(
        &self,
        transaction: &mut Transaction,
        source: &FormInput,
    ) -> Result<(), TransactionError> {
        let chart = self.form_chart(transaction, source).await?;
        transaction.import_from_deposit_form(source, &self.import_context(chart.as_ref()))?;
        Ok(())
    }

    /// Imports an opening-balance form for `id_year`.
    pub async fn import_from_balance_form(
        &self,
        transaction: &mut Transaction,
        id_year: YearId,
        source: &FormInput,
    ) -> Result<(), TransactionError> {
        let year = find_year(&*self.store, id_year).await?;
        let chart = find_chart(&*self.store, &year).await?;
        transaction.import_from_balance_form(&year, &chart, source, self.settings)?;
        Ok(())
    }

    /// Attaches the stored debt or credit `related` to a new settlement.
    pub async fn pay_off_from(
        &self,
        transaction: &mut Transaction,
        related: TransactionId,
    ) -> Result<PayoffSummary, TransactionError> {
        let related = self.load(related).await?;
        Ok(transaction.pay_off_from(related))
    }

    // ========== Writes ==========

    /// Validates and stores the transaction with its lines in one unit.
    ///
    /// On success, ids are assigned and the persisted snapshot refreshed.
    /// On failure nothing is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for any failed check, the validated lock
    /// or a closed year.
    pub async fn save(
        &self,
        transaction: &mut Transaction,
    ) -> Result<TransactionId, TransactionError> {
        if transaction.validated && transaction.was_validated() {
            return Err(ValidationError::Validated.into());
        }

        let unit = self.store.begin().await?;
        debug!("Store unit opened for save");

        let year = match transaction.id_year {
            Some(id) => unit.find_year(id).await?,
            None => None,
        };

        if year.as_ref().is_some_and(|y| y.closed) {
            return Err(ValidationError::YearClosed.into());
        }

        let accounts = unit.find_accounts(&transaction.referenced_accounts()).await?;
        let creator_exists = match transaction.id_creator {
            Some(id) => unit.user_exists(id).await?,
            None => true,
        };
        let related_exists = match transaction.id_related {
            Some(id) => unit.transaction_exists(id).await?,
            None => true,
        };

        transaction.check_for_save(&CheckContext {
            year: year.as_ref(),
            accounts: &accounts,
            creator_exists,
            related_exists,
        })?;

        let mut record = transaction.to_record()?;
        if transaction.exists() {
            record.status.remove(TransactionStatus::ERROR);
        } else if matches!(
            record.transaction_type,
            TransactionType::Debt | TransactionType::Credit
        ) {
            record.status.insert(TransactionStatus::WAITING);
        }

        let id = match record.id {
            Some(id) => {
                unit.update_transaction(&record).await?;
                id
            }
            None => unit.insert_transaction(&record).await?,
        };

        let mut line_ids: Vec<LineId> = Vec::with_capacity(transaction.count_lines());
        for line in transaction.lines() {
            let line_id = match line.id {
                Some(line_id) => {
                    let unchanged = transaction
                        .persisted_lines()
                        .iter()
                        .any(|stored| stored == line);
                    if !unchanged {
                        unit.update_line(line).await?;
                    }
                    line_id
                }
                None => unit.insert_line(id, line).await?,
            };
            line_ids.push(line_id);
        }

        for line in transaction.removed_lines() {
            if let Some(line_id) = line.id {
                unit.delete_line(line_id).await?;
            }
        }

        unit.commit().await?;

        transaction.status = record.status;
        transaction.mark_saved(id, &line_ids);
        info!(
            transaction_id = %id,
            lines = line_ids.len(),
            transaction_type = transaction.type_name(),
            "Transaction saved"
        );

        Ok(id)
    }

    /// Deletes a stored transaction, its lines and its attachments.
    ///
    /// Attachments are removed after the commit; a failure there is logged.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the transaction is validated or its
    /// year is closed.
    pub async fn delete(&self, transaction: &Transaction) -> Result<(), TransactionError> {
        let id = transaction.id.ok_or(LogicError::NotPersisted)?;

        if transaction.validated || transaction.was_validated() {
            return Err(ValidationError::DeleteValidated.into());
        }

        let unit = self.store.begin().await?;
        debug!(transaction_id = %id, "Store unit opened for delete");

        if let Some(id_year) = transaction.id_year
            && unit.find_year(id_year).await?.is_some_and(|y| y.closed)
        {
            return Err(ValidationError::DeleteYearClosed.into());
        }

        unit.delete_transaction(id).await?;
        unit.commit().await?;
        info!(transaction_id = %id, "Transaction deleted");

        if let Some(dir) = transaction.attachments_dir()
            && let Err(e) = self.storage.delete_all(&dir).await
        {
            warn!(transaction_id = %id, error = %e, "Failed to delete attachments");
        }

        Ok(())
    }

    // ========== Views ==========

    /// Lines joined with their account and project.
    pub async fn lines_with_accounts(
        &self,
        transaction: &Transaction,
    ) -> Result<Vec<LineWithAccount>, TransactionError> {
        let (accounts, projects) = self.labels(transaction).await?;
        Ok(transaction.lines_with_accounts(&accounts, &projects))
    }

    /// Type inferred from the accounts of the lines.
    pub async fn find_type(
        &self,
        transaction: &Transaction,
    ) -> Result<TransactionType, TransactionError> {
        let accounts = self.accounts(transaction).await?;
        Ok(transaction.find_type_from_accounts(&accounts))
    }

    /// Slot metadata for every type, for form rendering.
    pub async fn types_details(
        &self,
        transaction: &Transaction,
        source: Option<&FormInput>,
    ) -> Result<Vec<TypeDetails>, TransactionError> {
        let mut ids = transaction.referenced_accounts();
        ids.extend(submitted_accounts(source));
        let accounts = self.store.find_accounts(&ids).await?;
        Ok(transaction.types_details(source, &accounts))
    }

    /// Unsaved copy bound to the year `target`.
    pub async fn duplicate(
        &self,
        transaction: &Transaction,
        target: YearId,
    ) -> Result<Transaction, TransactionError> {
        let year = find_year(&*self.store, target).await?;
        let chart = find_chart(&*self.store, &year).await?;
        let accounts = self.accounts(transaction).await?;
        Ok(transaction.duplicate(&year, &chart, &accounts))
    }

    /// Changes since the transaction was loaded or last saved.
    pub async fn diff(
        &self,
        transaction: &Transaction,
    ) -> Result<Option<TransactionDiff>, TransactionError> {
        let (accounts, projects) = self.labels(transaction).await?;
        Ok(transaction.diff(&accounts, &projects))
    }

    /// Header and joined lines for journal rendering.
    pub async fn journal(
        &self,
        transaction: &Transaction,
    ) -> Result<JournalEntry, TransactionError> {
        let (accounts, projects) = self.labels(transaction).await?;
        Ok(transaction.journal(&accounts, &projects))
    }

    /// Transactions that point at this one through `id_related`.
    pub async fn list_related_transactions(
        &self,
        transaction: &Transaction,
    ) -> Result<Vec<TransactionRecord>, TransactionError> {
        let id = transaction.id.ok_or(LogicError::NotPersisted)?;
        Ok(self.store.find_related_transactions(id).await?)
    }

    /// Attachment files of the transaction.
    pub async fn list_files(
        &self,
        transaction: &Transaction,
    ) -> Result<Vec<StoredFile>, TransactionError> {
        let dir = transaction
            .attachments_dir()
            .ok_or(LogicError::NotPersisted)?;
        Ok(self.storage.list(&dir).await?)
    }

    // ========== Linked users ==========

    /// Links a member, optionally through a service subscription.
    pub async fn link_to_user(
        &self,
        transaction: &Transaction,
        user: UserId,
        service: Option<ServiceUserId>,
    ) -> Result<(), TransactionError> {
        let id = transaction.id.ok_or(LogicError::NotPersisted)?;
        let unit = self.store.begin().await?;
        unit.link_user(id, user, service).await?;
        unit.commit().await?;
        Ok(())
    }

    /// Replaces the links made without a service by `users`.
    ///
    /// Returns false without writing when the set is unchanged.
    pub async fn update_linked_users(
        &self,
        transaction: &Transaction,
        users: &[UserId],
    ) -> Result<bool, TransactionError> {
        let id = transaction.id.ok_or(LogicError::NotPersisted)?;

        let mut wanted = users.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let unit = self.store.begin().await?;
        let existing = unit.linked_users(id).await?;
        let mut current: Vec<UserId> = existing
            .iter()
            .filter(|l| l.id_service_user.is_none())
            .map(|l| l.id_user)
            .collect();
        current.sort_unstable();

        if current == wanted {
            return Ok(false);
        }

        unit.unlink_users_except(id, &wanted).await?;
        for user in &wanted {
            if !existing.iter().any(|l| l.id_user == *user) {
                unit.link_user(id, *user, None).await?;
            }
        }
        unit.commit().await?;

        debug!(transaction_id = %id, users = wanted.len(), "Linked users updated");
        Ok(true)
    }

    /// Members linked to the transaction.
    pub async fn list_linked_users(
        &self,
        transaction: &Transaction,
    ) -> Result<Vec<LinkedUser>, TransactionError> {
        let id = transaction.id.ok_or(LogicError::NotPersisted)?;
        Ok(self.store.linked_users(id).await?)
    }

    /// Removes the link made for a service subscription.
    pub async fn unlink_service_user(
        &self,
        transaction: &Transaction,
        service: ServiceUserId,
    ) -> Result<(), TransactionError> {
        let id = transaction.id.ok_or(LogicError::NotPersisted)?;
        let unit = self.store.begin().await?;
        unit.unlink_service_user(id, service).await?;
        unit.commit().await?;
        Ok(())
    }

    // ========== Helpers ==========

    fn import_context<'a>(&self, chart: Option<&'a Chart>) -> ImportContext<'a> {
        ImportContext {
            chart,
            settings: self.settings,
        }
    }

    /// Chart of the year named by the form, or else by the transaction.
    async fn form_chart(
        &self,
        transaction: &Transaction,
        source: &FormInput,
    ) -> Result<Option<Chart>, TransactionError> {
        let Some(id_year) = get_int(source, "id_year")?
            .map(YearId::new)
            .or(transaction.id_year)
        else {
            return Ok(None);
        };

        let Some(year) = self.store.find_year(id_year).await? else {
            return Ok(None);
        };

        Ok(Some(find_chart(&*self.store, &year).await?))
    }

    async fn accounts(
        &self,
        transaction: &Transaction,
    ) -> Result<HashMap<AccountId, Account>, TransactionError> {
        Ok(self
            .store
            .find_accounts(&transaction.referenced_accounts())
            .await?)
    }

    async fn labels(
        &self,
        transaction: &Transaction,
    ) -> Result<(HashMap<AccountId, Account>, HashMap<ProjectId, String>), TransactionError> {
        let accounts = self.accounts(transaction).await?;
        let projects = self
            .store
            .project_names(&transaction.referenced_projects())
            .await?;
        Ok((accounts, projects))
    }
}

async fn find_year(reader: &impl LedgerRead, id: YearId) -> Result<Year, TransactionError> {
    reader
        .find_year(id)
        .await?
        .ok_or_else(|| ValidationError::YearNotFound(id).into())
}

async fn find_chart(reader: &impl LedgerRead, year: &Year) -> Result<Chart, TransactionError> {
    reader.find_chart(year.id_chart).await?.ok_or_else(|| {
        StoreError::corrupt(format!("chart {} of year {} is missing", year.id_chart, year.id))
            .into()
    })
}

/// Account ids picked in `simple[type][side]` selectors.
fn submitted_accounts(source: Option<&FormInput>) -> Vec<AccountId> {
    let Some(simple) = source
        .and_then(|s| s.get("simple"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    simple
        .values()
        .filter_map(Value::as_object)
        .flat_map(serde_json::Map::values)
        .filter_map(AccountSelector::from_value)
        .map(|s| s.id)
        .collect()
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
