//! Before/after comparison for change review.
//!
//! The current state is compared by value against the snapshot taken when
//! the transaction was loaded or last saved. A transaction that was never
//! saved is compared against an empty one.

use std::collections::HashMap;

use compta_shared::types::{AccountId, LineId, ProjectId, TransactionId, UserId, YearId};
use serde::Serialize;
use serde_json::Value;

use super::account::{Account, AccountLookup};
use super::line::{Line, LineFields};
use super::transaction::Transaction;
use super::types::TransactionType;

/// One changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    /// Field name.
    pub field: &'static str,
    /// Stored value.
    pub old: Value,
    /// Current value.
    pub new: Value,
}

/// A stored line whose content changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChange {
    /// 1-based position among the active lines.
    pub line: usize,
    /// Line id.
    pub id: Option<LineId>,
    /// Current content.
    #[serde(flatten)]
    pub fields: LineFields,
    /// Current account, as code and label.
    pub account: Option<String>,
    /// Current project name.
    pub project: Option<String>,
    /// What changed. Account and project changes also carry a readable
    /// `account`/`project` entry.
    pub changes: Vec<FieldChange>,
}

/// An added or removed line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSummary {
    /// Line content.
    #[serde(flatten)]
    pub fields: LineFields,
    /// Account, as code and label.
    pub account: Option<String>,
    /// Project name.
    pub project: Option<String>,
}

/// Structured difference between stored and current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDiff {
    /// Changed header fields.
    pub transaction: Vec<FieldChange>,
    /// Changed stored lines.
    pub lines: Vec<LineChange>,
    /// Lines added, excluding those identical to a removed one.
    pub lines_new: Vec<LineSummary>,
    /// Lines removed, excluding those identical to an added one.
    pub lines_removed: Vec<LineSummary>,
}

impl TransactionDiff {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transaction.is_empty()
            && self.lines.is_empty()
            && self.lines_new.is_empty()
            && self.lines_removed.is_empty()
    }
}

struct Labels<'a> {
    accounts: &'a dyn AccountLookup,
    projects: &'a HashMap<ProjectId, String>,
}

impl Labels<'_> {
    fn account(&self, fields: &LineFields) -> Option<String> {
        fields
            .id_account
            .and_then(|id| self.accounts.account(id))
            .map(Account::code_and_label)
    }

    fn project(&self, fields: &LineFields) -> Option<String> {
        fields
            .id_project
            .and_then(|id| self.projects.get(&id).cloned())
    }

    fn summary(&self, fields: LineFields) -> LineSummary {
        LineSummary {
            account: self.account(&fields),
            project: self.project(&fields),
            fields,
        }
    }
}

impl Transaction {
    /// Changes since the last load or save, or `None` if there are none.
    #[must_use]
    pub fn diff(
        &self,
        accounts: &dyn AccountLookup,
        projects: &HashMap<ProjectId, String>,
    ) -> Option<TransactionDiff> {
        let labels = Labels { accounts, projects };

        let before = self
            .persisted()
            .map(|record| Transaction::from_record(record.clone(), Vec::new()))
            .unwrap_or_default();

        let transaction = changes(&header_values(&before), &header_values(self));

        let mut lines = Vec::new();
        let mut added = Vec::new();

        for (i, line) in self.lines().iter().enumerate() {
            let Some(id) = line.id else {
                added.push(line.fields());
                continue;
            };

            let Some(old) = self.persisted_lines().iter().find(|l| l.id == Some(id)) else {
                continue;
            };

            let (old_fields, new_fields) = (old.fields(), line.fields());
            let mut field_changes =
                changes(&line_values(&old_fields), &line_values(&new_fields));

            if field_changes.is_empty() {
                continue;
            }

            if old_fields.id_project != new_fields.id_project {
                field_changes.push(FieldChange {
                    field: "project",
                    old: labels.project(&old_fields).into(),
                    new: labels.project(&new_fields).into(),
                });
            }

            if old_fields.id_account != new_fields.id_account {
                field_changes.push(FieldChange {
                    field: "account",
                    old: labels.account(&old_fields).into(),
                    new: labels.account(&new_fields).into(),
                });
            }

            lines.push(LineChange {
                line: i + 1,
                id: Some(id),
                account: labels.account(&new_fields),
                project: labels.project(&new_fields),
                fields: new_fields,
                changes: field_changes,
            });
        }

        let removed: Vec<LineFields> = self
            .removed_lines()
            .iter()
            .filter(|l| l.exists())
            .map(Line::fields)
            .collect();

        let lines_new = added
            .iter()
            .filter(|f| !removed.contains(f))
            .cloned()
            .map(|f| labels.summary(f))
            .collect();

        let lines_removed = removed
            .iter()
            .filter(|f| !added.contains(f))
            .cloned()
            .map(|f| labels.summary(f))
            .collect();

        let diff = TransactionDiff {
            transaction,
            lines,
            lines_new,
            lines_removed,
        };

        (!diff.is_empty()).then_some(diff)
    }
}

fn changes(before: &[(&'static str, Value)], after: &[(&'static str, Value)]) -> Vec<FieldChange> {
    before
        .iter()
        .zip(after)
        .filter(|((_, old), (_, new))| old != new)
        .map(|((field, old), (_, new))| FieldChange {
            field: *field,
            old: old.clone(),
            new: new.clone(),
        })
        .collect()
}

fn header_values(t: &Transaction) -> Vec<(&'static str, Value)> {
    vec![
        ("type", t.transaction_type.map(TransactionType::code).into()),
        ("status", t.status.bits().into()),
        ("label", t.label.clone().into()),
        ("notes", t.notes.clone().into()),
        ("reference", t.reference.clone().into()),
        ("date", t.date.as_ref().map(ToString::to_string).into()),
        ("validated", t.validated.into()),
        ("id_year", t.id_year.map(YearId::get).into()),
        ("id_creator", t.id_creator.map(UserId::get).into()),
        ("id_related", t.id_related.map(TransactionId::get).into()),
    ]
}

fn line_values(f: &LineFields) -> Vec<(&'static str, Value)> {
    vec![
        ("id_account", f.id_account.map(AccountId::get).into()),
        ("label", f.label.clone().into()),
        ("reference", f.reference.clone().into()),
        ("credit", f.credit.minor().into()),
        ("debit", f.debit.minor().into()),
        ("id_project", f.id_project.map(ProjectId::get).into()),
    ]
}
