//! Transaction lines.

use compta_shared::types::{AccountId, LineId, Money, ProjectId, TransactionId};
use serde::{Deserialize, Serialize};

use super::account::{AccountPosition, AccountSelector};
use super::error::LineError;

/// Maximum length of a line label or reference.
pub const LINE_TEXT_MAX: usize = 200;

/// A single debit-or-credit movement against one account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Line {
    /// Line id, `None` until persisted.
    pub id: Option<LineId>,
    /// Owning transaction, set on save.
    pub id_transaction: Option<TransactionId>,
    /// Target account.
    pub id_account: Option<AccountId>,
    /// Analytic project tag.
    pub id_project: Option<ProjectId>,
    /// Optional line label.
    pub label: Option<String>,
    /// Optional payment reference.
    pub reference: Option<String>,
    /// Credit amount, minor units.
    pub credit: Money,
    /// Debit amount, minor units.
    pub debit: Money,
    /// Reconciled against a bank statement.
    pub reconciled: bool,
}

impl Line {
    /// A debit line.
    #[must_use]
    pub fn debit(account: AccountId, amount: Money) -> Self {
        Self {
            id_account: Some(account),
            debit: amount,
            ..Self::default()
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account: AccountId, amount: Money) -> Self {
        Self {
            id_account: Some(account),
            credit: amount,
            ..Self::default()
        }
    }

    /// Builder-style project tag.
    #[must_use]
    pub fn with_project(mut self, project: Option<ProjectId>) -> Self {
        self.id_project = project;
        self
    }

    /// Builder-style reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// Returns true once the line has been stored.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.id.is_some()
    }

    /// Returns true for a line with a non-zero debit.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        !self.debit.is_zero()
    }

    /// Returns true for a line with a non-zero credit.
    #[must_use]
    pub fn is_credit(&self) -> bool {
        !self.credit.is_zero()
    }

    /// Checks the line on its own.
    ///
    /// Chart membership needs the fiscal year and is checked by the owning
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn self_check(&self) -> Result<(), LineError> {
        if self.id_account.is_none() {
            return Err(LineError::MissingAccount);
        }

        if self.credit.is_zero() && self.debit.is_zero() {
            return Err(LineError::NoAmount);
        }

        if self.credit.is_negative() || self.debit.is_negative() {
            return Err(LineError::NegativeAmount);
        }

        if !self.credit.is_zero() && !self.debit.is_zero() {
            return Err(LineError::BothSides);
        }

        if self
            .label
            .as_deref()
            .is_some_and(|l| l.chars().count() > LINE_TEXT_MAX)
        {
            return Err(LineError::LabelTooLong);
        }

        if self
            .reference
            .as_deref()
            .is_some_and(|r| r.chars().count() > LINE_TEXT_MAX)
        {
            return Err(LineError::ReferenceTooLong);
        }

        Ok(())
    }

    /// The fields compared when diffing line sets.
    #[must_use]
    pub fn fields(&self) -> LineFields {
        LineFields {
            id_account: self.id_account,
            label: self.label.clone(),
            reference: self.reference.clone(),
            credit: self.credit,
            debit: self.debit,
            id_project: self.id_project,
        }
    }
}

/// User-editable content of a line, compared by value in diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineFields {
    /// Target account.
    pub id_account: Option<AccountId>,
    /// Line label.
    pub label: Option<String>,
    /// Line reference.
    pub reference: Option<String>,
    /// Credit amount.
    pub credit: Money,
    /// Debit amount.
    pub debit: Money,
    /// Project tag.
    pub id_project: Option<ProjectId>,
}

/// A line joined with its account and project for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineWithAccount {
    /// The line itself.
    #[serde(flatten)]
    pub line: Line,
    /// Account code, `None` if the account is unknown.
    pub account_code: Option<String>,
    /// Account label.
    pub account_label: Option<String>,
    /// Account role.
    pub account_position: Option<AccountPosition>,
    /// Project name.
    pub project_name: Option<String>,
}

impl LineWithAccount {
    /// Selector for the line's account.
    #[must_use]
    pub fn account_selector(&self) -> Option<AccountSelector> {
        self.line.id_account.map(|id| AccountSelector {
            id,
            label: format!(
                "{} — {}",
                self.account_code.as_deref().unwrap_or_default(),
                self.account_label.as_deref().unwrap_or_default()
            ),
        })
    }
}
