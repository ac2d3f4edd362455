//! The transaction aggregate.
//!
//! A `Transaction` owns its active lines and the lines removed since it was
//! loaded. A snapshot of the persisted state is kept so that the validated
//! lock and `diff` compare by value instead of tracking assignments.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use compta_shared::types::{AccountId, LineId, Money, ProjectId, TransactionId, UserId, YearId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::account::{AccountLookup, AccountPosition, AccountSelector};
use super::error::ValidationError;
use super::line::{Line, LineFields, LineWithAccount};
use super::status::TransactionStatus;
use super::types::{Direction, SlotDetails, TransactionType, TypeDetails};

/// Maximum length of a transaction label.
pub const LABEL_MAX: usize = 200;
/// Maximum length of a transaction reference.
pub const REFERENCE_MAX: usize = 200;
/// Maximum length of transaction notes.
pub const NOTES_MAX: usize = 2000;

/// Stored shape of a transaction header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Row id, `None` before the first insert.
    pub id: Option<TransactionId>,
    /// Economic type.
    pub transaction_type: TransactionType,
    /// Status flags.
    pub status: TransactionStatus,
    /// Label.
    pub label: String,
    /// Free notes.
    pub notes: Option<String>,
    /// Accounting document reference.
    pub reference: Option<String>,
    /// Entry date.
    pub date: NaiveDate,
    /// Validation lock.
    pub validated: bool,
    /// Integrity chain hash, stored but not computed.
    pub hash: Option<String>,
    /// Previous hash of the integrity chain.
    pub prev_hash: Option<String>,
    /// Fiscal year.
    pub id_year: YearId,
    /// Creating member.
    pub id_creator: Option<UserId>,
    /// Settled or otherwise related transaction.
    pub id_related: Option<TransactionId>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    record: TransactionRecord,
    lines: Vec<Line>,
}

/// A balanced set of lines dated within one fiscal year.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Row id, `None` until saved.
    pub id: Option<TransactionId>,
    /// Economic type, `None` until imported.
    pub transaction_type: Option<TransactionType>,
    /// Status flags.
    pub status: TransactionStatus,
    /// Label.
    pub label: String,
    /// Free notes.
    pub notes: Option<String>,
    /// Accounting document reference.
    pub reference: Option<String>,
    /// Entry date.
    pub date: Option<NaiveDate>,
    /// Validation lock.
    pub validated: bool,
    /// Integrity chain hash, stored but not computed.
    pub hash: Option<String>,
    /// Previous hash of the integrity chain.
    pub prev_hash: Option<String>,
    /// Fiscal year.
    pub id_year: Option<YearId>,
    /// Creating member.
    pub id_creator: Option<UserId>,
    /// Settled or otherwise related transaction.
    pub id_related: Option<TransactionId>,
    lines: Vec<Line>,
    removed_lines: Vec<Line>,
    snapshot: Option<Snapshot>,
    related: Option<Box<Transaction>>,
    default_selectors: HashMap<(TransactionType, Direction), AccountSelector>,
}

/// Summary of the transaction being settled by a pay-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoffSummary {
    /// Settled transaction.
    pub id: Option<TransactionId>,
    /// Amount to settle.
    pub amount: Money,
    /// Project of the settled transaction.
    pub id_project: Option<ProjectId>,
    /// Type of the settled transaction.
    pub transaction_type: Option<TransactionType>,
}

/// Flat view used by change-review and audit screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDetails {
    /// Transaction id.
    pub id: Option<TransactionId>,
    /// Type label.
    pub type_name: &'static str,
    /// Label.
    pub label: String,
    /// Entry date.
    pub date: Option<NaiveDate>,
    /// Document reference.
    pub reference: Option<String>,
    /// Notes.
    pub notes: Option<String>,
    /// Sum of credits.
    pub total_credit: Money,
    /// Sum of debits.
    pub total_debit: Money,
    /// Lines keyed by 1-based number.
    pub lines: BTreeMap<usize, LineFields>,
}

/// Header plus joined lines, as consumed by journal rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    /// Transaction id.
    pub id: Option<TransactionId>,
    /// Economic type.
    pub transaction_type: Option<TransactionType>,
    /// Status flags.
    pub status: TransactionStatus,
    /// Label.
    pub label: String,
    /// Notes.
    pub notes: Option<String>,
    /// Document reference.
    pub reference: Option<String>,
    /// Entry date.
    pub date: Option<NaiveDate>,
    /// Validation lock.
    pub validated: bool,
    /// Fiscal year.
    pub id_year: Option<YearId>,
    /// Creating member.
    pub id_creator: Option<UserId>,
    /// Related transaction.
    pub id_related: Option<TransactionId>,
    /// Lines joined with accounts and projects.
    pub lines: Vec<LineWithAccount>,
}

impl Transaction {
    /// An empty, unsaved transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a stored transaction. The given state becomes the snapshot.
    #[must_use]
    pub fn from_record(record: TransactionRecord, lines: Vec<Line>) -> Self {
        Self {
            id: record.id,
            transaction_type: Some(record.transaction_type),
            status: record.status,
            label: record.label.clone(),
            notes: record.notes.clone(),
            reference: record.reference.clone(),
            date: Some(record.date),
            validated: record.validated,
            hash: record.hash.clone(),
            prev_hash: record.prev_hash.clone(),
            id_year: Some(record.id_year),
            id_creator: record.id_creator,
            id_related: record.id_related,
            lines: lines.clone(),
            snapshot: Some(Snapshot { record, lines }),
            ..Self::default()
        }
    }

    /// Header in stored shape.
    ///
    /// # Errors
    ///
    /// Returns an error if the type, date or year is still unset.
    pub fn to_record(&self) -> Result<TransactionRecord, ValidationError> {
        Ok(TransactionRecord {
            id: self.id,
            transaction_type: self.transaction_type.ok_or(ValidationError::MissingType)?,
            status: self.status,
            label: self.label.clone(),
            notes: self.notes.clone(),
            reference: self.reference.clone(),
            date: self.date.ok_or(ValidationError::MissingDate)?,
            validated: self.validated,
            hash: self.hash.clone(),
            prev_hash: self.prev_hash.clone(),
            id_year: self.id_year.ok_or(ValidationError::MissingYear)?,
            id_creator: self.id_creator,
            id_related: self.id_related,
        })
    }

    /// Records a successful save: assigns ids and refreshes the snapshot.
    ///
    /// `line_ids` follows the order of `lines()`.
    pub fn mark_saved(&mut self, id: TransactionId, line_ids: &[LineId]) {
        self.id = Some(id);

        for (line, line_id) in self.lines.iter_mut().zip(line_ids) {
            line.id = Some(*line_id);
            line.id_transaction = Some(id);
        }

        self.removed_lines.clear();
        self.snapshot = self.to_record().ok().map(|record| Snapshot {
            record,
            lines: self.lines.clone(),
        });
    }

    /// Returns true once the transaction has been stored.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Header as last loaded or saved.
    #[must_use]
    pub fn persisted(&self) -> Option<&TransactionRecord> {
        self.snapshot.as_ref().map(|s| &s.record)
    }

    /// Lines as last loaded or saved.
    #[must_use]
    pub fn persisted_lines(&self) -> &[Line] {
        self.snapshot.as_ref().map_or(&[], |s| s.lines.as_slice())
    }

    /// Returns true if the stored state is validated.
    #[must_use]
    pub fn was_validated(&self) -> bool {
        self.persisted().is_some_and(|r| r.validated)
    }

    // ========== Line set ==========

    /// Active lines, in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Lines removed since the last save.
    #[must_use]
    pub fn removed_lines(&self) -> &[Line] {
        &self.removed_lines
    }

    /// Number of active lines.
    #[must_use]
    pub fn count_lines(&self) -> usize {
        self.lines.len()
    }

    /// Appends a line.
    pub fn add_line(&mut self, line: Line) {
        self.lines.push(line);
    }

    /// Inserts a line at `index`, or appends if out of range.
    pub fn insert_line(&mut self, index: usize, line: Line) {
        let index = index.min(self.lines.len());
        self.lines.insert(index, line);
    }

    /// Moves the line with this id to the removed set.
    ///
    /// Returns false if no active line has that id.
    pub fn remove_line(&mut self, id: LineId) -> bool {
        let Some(pos) = self.lines.iter().position(|l| l.id == Some(id)) else {
            return false;
        };
        let line = self.lines.remove(pos);
        self.removed_lines.push(line);
        true
    }

    /// Moves every active line to the removed set.
    pub fn reset_lines(&mut self) {
        self.removed_lines.append(&mut self.lines);
    }

    /// Active line by id.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.iter().find(|l| l.id == Some(id))
    }

    /// Mutable active line by id.
    pub fn line_mut(&mut self, id: LineId) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.id == Some(id))
    }

    /// First active line.
    #[must_use]
    pub fn first_line(&self) -> Option<&Line> {
        self.lines.first()
    }

    /// First credit line of a simplified transaction.
    #[must_use]
    pub fn credit_line(&self) -> Option<&Line> {
        if self.is_advanced() {
            return None;
        }
        self.lines.iter().find(|l| l.is_credit())
    }

    /// First debit line of a simplified transaction.
    #[must_use]
    pub fn debit_line(&self) -> Option<&Line> {
        if self.is_advanced() {
            return None;
        }
        self.lines.iter().find(|l| l.is_debit())
    }

    /// Sum of credits, clamped on overflow.
    #[must_use]
    pub fn credit_sum(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::ZERO, |acc, l| acc.saturating_add(l.credit))
    }

    /// Sum of debits, clamped on overflow.
    #[must_use]
    pub fn debit_sum(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::ZERO, |acc, l| acc.saturating_add(l.debit))
    }

    /// Credits minus debits.
    ///
    /// # Errors
    ///
    /// Returns `AmountTooLarge` if the line totals do not fit in minor units.
    pub fn balance(&self) -> Result<Money, ValidationError> {
        let credit = Money::checked_sum(self.lines.iter().map(|l| l.credit));
        let debit = Money::checked_sum(self.lines.iter().map(|l| l.debit));

        credit
            .zip(debit)
            .and_then(|(c, d)| c.checked_sub(d))
            .ok_or(ValidationError::AmountTooLarge)
    }

    /// Transaction amount. Credits equal debits once balanced.
    #[must_use]
    pub fn sum(&self) -> Money {
        self.credit_sum()
    }

    /// First project tag found on the lines.
    #[must_use]
    pub fn project_id(&self) -> Option<ProjectId> {
        self.lines.iter().find_map(|l| l.id_project)
    }

    /// Returns true if any line is reconciled.
    #[must_use]
    pub fn has_reconciled_lines(&self) -> bool {
        self.lines.iter().any(|l| l.reconciled)
    }

    /// Reference of the first line.
    #[must_use]
    pub fn payment_reference(&self) -> Option<&str> {
        self.lines.first().and_then(|l| l.reference.as_deref())
    }

    // ========== Type and status ==========

    /// Label of the type, `Advanced` when unset.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.transaction_type
            .unwrap_or(TransactionType::Advanced)
            .label()
    }

    fn is_advanced(&self) -> bool {
        matches!(self.transaction_type, None | Some(TransactionType::Advanced))
    }

    /// Sets status flags.
    pub fn add_status(&mut self, flags: TransactionStatus) {
        self.status.insert(flags);
    }

    /// Clears status flags.
    pub fn remove_status(&mut self, flags: TransactionStatus) {
        self.status.remove(flags);
    }

    /// Names of the set status flags.
    #[must_use]
    pub fn status_names(&self) -> Vec<&'static str> {
        self.status.names()
    }

    /// Marks a debt or credit as settled.
    pub fn mark_paid(&mut self) {
        self.remove_status(TransactionStatus::WAITING);
        self.add_status(TransactionStatus::PAID);
    }

    // ========== Related transaction ==========

    /// Transaction attached by `pay_off_from`.
    #[must_use]
    pub fn related(&self) -> Option<&Transaction> {
        self.related.as_deref()
    }

    /// Turns this transaction into the settlement of `related`.
    pub fn pay_off_from(&mut self, related: Transaction) -> PayoffSummary {
        let prefix = if related.transaction_type == Some(TransactionType::Debt) {
            "Debt settlement: "
        } else {
            "Credit settlement: "
        };

        self.id_related = related.id;
        self.label = format!("{prefix}{}", related.label);
        self.transaction_type = Some(TransactionType::Advanced);

        let summary = PayoffSummary {
            id: related.id,
            amount: related.sum(),
            id_project: related.project_id(),
            transaction_type: related.transaction_type,
        };

        self.related = Some(Box::new(related));
        summary
    }

    /// Directory holding the attachments of a saved transaction.
    #[must_use]
    pub fn attachments_dir(&self) -> Option<String> {
        self.id.map(|id| format!("transaction/{id}/"))
    }

    // ========== Views ==========

    /// Lines joined with their account and project.
    #[must_use]
    pub fn lines_with_accounts(
        &self,
        accounts: &dyn AccountLookup,
        projects: &HashMap<ProjectId, String>,
    ) -> Vec<LineWithAccount> {
        self.lines
            .iter()
            .map(|line| {
                let account = line.id_account.and_then(|id| accounts.account(id));
                LineWithAccount {
                    line: line.clone(),
                    account_code: account.map(|a| a.code.clone()),
                    account_label: account.map(|a| a.label.clone()),
                    account_position: account.map(|a| a.position),
                    project_name: line.id_project.and_then(|p| projects.get(&p).cloned()),
                }
            })
            .collect()
    }

    /// Infers the type from the accounts of a two-line transaction.
    ///
    /// A credit on a revenue account votes `Revenue`, a debit on an expense
    /// account votes `Expense`. Anything but exactly one vote is `Advanced`.
    #[must_use]
    pub fn find_type_from_accounts(&self, accounts: &dyn AccountLookup) -> TransactionType {
        if self.lines.len() != 2 {
            return TransactionType::Advanced;
        }

        let votes: Vec<TransactionType> = self
            .lines
            .iter()
            .filter_map(|line| {
                let position = line.id_account.and_then(|id| accounts.account(id))?.position;
                match position {
                    AccountPosition::Revenue if line.is_credit() => Some(TransactionType::Revenue),
                    AccountPosition::Expense if line.is_debit() => Some(TransactionType::Expense),
                    _ => None,
                }
            })
            .collect();

        match votes.as_slice() {
            [single] => *single,
            _ => TransactionType::Advanced,
        }
    }

    /// Remembers a fallback selection for a simplified-form slot.
    pub fn set_default_account(
        &mut self,
        transaction_type: TransactionType,
        direction: Direction,
        selector: AccountSelector,
    ) {
        self.default_selectors
            .insert((transaction_type, direction), selector);
    }

    /// Slot metadata and preselected accounts for every type.
    ///
    /// A slot of the current type takes the account on its own side. A slot
    /// of another type takes the side named by its default rule for the
    /// current type. Submitted `simple[type][side]` values win over the
    /// current lines; remembered defaults fill whatever is left.
    #[must_use]
    pub fn types_details(
        &self,
        source: Option<&Map<String, Value>>,
        accounts: &dyn AccountLookup,
    ) -> Vec<TypeDetails> {
        let mut current: HashMap<Direction, AccountSelector> = HashMap::new();

        for joined in self.lines_with_accounts(accounts, &HashMap::new()) {
            let side = if joined.line.is_debit() {
                Direction::Debit
            } else if joined.line.is_credit() {
                Direction::Credit
            } else {
                continue;
            };

            if let Some(selector) = joined.account_selector() {
                current.insert(side, selector);
            }

            if current.len() == 2 {
                break;
            }
        }

        DISPLAY_ORDER
            .iter()
            .map(|&t| TypeDetails {
                id: t,
                label: t.label(),
                help: t.help(),
                accounts: t
                    .slots()
                    .iter()
                    .map(|slot| {
                        let side = if self.transaction_type == Some(t) {
                            Some(slot.direction)
                        } else {
                            self.transaction_type.and_then(|cur| slot.default_for(cur))
                        };

                        let selector_value = side
                            .and_then(|d| {
                                submitted_selector(source, t, d)
                                    .or_else(|| current.get(&d).cloned())
                            })
                            .or_else(|| {
                                self.default_selectors.get(&(t, slot.direction)).cloned()
                            });

                        SlotDetails {
                            label: slot.label,
                            targets: slot.targets,
                            targets_string: slot.targets_string(),
                            direction: slot.direction,
                            selector_name: format!(
                                "simple[{}][{}]",
                                t.code(),
                                slot.direction.as_str()
                            ),
                            selector_value,
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// Slots of one type, with selections resolved as in `types_details`.
    #[must_use]
    pub fn slot_details(
        &self,
        transaction_type: TransactionType,
        source: Option<&Map<String, Value>>,
        accounts: &dyn AccountLookup,
    ) -> Vec<SlotDetails> {
        self.types_details(source, accounts)
            .into_iter()
            .find(|d| d.id == transaction_type)
            .map(|d| d.accounts)
            .unwrap_or_default()
    }

    /// Flat details view with 1-based line numbers.
    #[must_use]
    pub fn details(&self) -> TransactionDetails {
        TransactionDetails {
            id: self.id,
            type_name: self.type_name(),
            label: self.label.clone(),
            date: self.date,
            reference: self.reference.clone(),
            notes: self.notes.clone(),
            total_credit: self.credit_sum(),
            total_debit: self.debit_sum(),
            lines: self
                .lines
                .iter()
                .enumerate()
                .map(|(i, l)| (i + 1, l.fields()))
                .collect(),
        }
    }

    /// Header and joined lines for journal rendering.
    #[must_use]
    pub fn journal(
        &self,
        accounts: &dyn AccountLookup,
        projects: &HashMap<ProjectId, String>,
    ) -> JournalEntry {
        JournalEntry {
            id: self.id,
            transaction_type: self.transaction_type,
            status: self.status,
            label: self.label.clone(),
            notes: self.notes.clone(),
            reference: self.reference.clone(),
            date: self.date,
            validated: self.validated,
            id_year: self.id_year,
            id_creator: self.id_creator,
            id_related: self.id_related,
            lines: self.lines_with_accounts(accounts, projects),
        }
    }

    /// Every account referenced by active, removed and persisted lines.
    #[must_use]
    pub fn referenced_accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self
            .lines
            .iter()
            .chain(&self.removed_lines)
            .chain(self.persisted_lines())
            .filter_map(|l| l.id_account)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Every project referenced by active, removed and persisted lines.
    #[must_use]
    pub fn referenced_projects(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self
            .lines
            .iter()
            .chain(&self.removed_lines)
            .chain(self.persisted_lines())
            .filter_map(|l| l.id_project)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

const DISPLAY_ORDER: [TransactionType; 6] = [
    TransactionType::Revenue,
    TransactionType::Expense,
    TransactionType::Transfer,
    TransactionType::Debt,
    TransactionType::Credit,
    TransactionType::Advanced,
];

fn submitted_selector(
    source: Option<&Map<String, Value>>,
    transaction_type: TransactionType,
    side: Direction,
) -> Option<AccountSelector> {
    let value = source?
        .get("simple")?
        .get(transaction_type.code().to_string())?
        .get(side.as_str())?;
    AccountSelector::from_value(value)
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
