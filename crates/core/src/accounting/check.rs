//! Transaction validation.
//!
//! `self_check` runs the header, line and reference passes in that order and
//! stops at the first failure. `check_for_save` adds the account guards
//! between the header and line passes.

use compta_shared::types::Money;

use super::account::{AccountLookup, AccountPosition};
use super::error::{LineError, ValidationError};
use super::transaction::{LABEL_MAX, NOTES_MAX, REFERENCE_MAX, Transaction};
use super::types::TransactionType;
use super::year::Year;

/// Facts read from the store that validation depends on.
pub struct CheckContext<'a> {
    /// The bound fiscal year, if it exists.
    pub year: Option<&'a Year>,
    /// Accounts referenced by the lines, from any chart.
    pub accounts: &'a dyn AccountLookup,
    /// Whether `id_creator` references an existing member.
    pub creator_exists: bool,
    /// Whether `id_related` references an existing transaction.
    pub related_exists: bool,
}

impl Transaction {
    /// Full consistency check.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn self_check(&self, ctx: &CheckContext<'_>) -> Result<(), ValidationError> {
        self.check_header(ctx)?;
        self.check_lines(ctx)?;
        self.check_references(ctx)
    }

    /// Consistency check plus the account guards applied on save.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn check_for_save(&self, ctx: &CheckContext<'_>) -> Result<(), ValidationError> {
        self.check_header(ctx)?;
        self.check_account_guards(ctx)?;
        self.check_lines(ctx)?;
        self.check_references(ctx)
    }

    fn check_header(&self, ctx: &CheckContext<'_>) -> Result<(), ValidationError> {
        let Some(id_year) = self.id_year else {
            return Err(ValidationError::MissingYear);
        };

        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyLabel);
        }
        if self.label.chars().count() > LABEL_MAX {
            return Err(ValidationError::LabelTooLong);
        }
        if self
            .reference
            .as_deref()
            .is_some_and(|r| r.chars().count() > REFERENCE_MAX)
        {
            return Err(ValidationError::ReferenceTooLong);
        }
        if self
            .notes
            .as_deref()
            .is_some_and(|n| n.chars().count() > NOTES_MAX)
        {
            return Err(ValidationError::NotesTooLong);
        }

        let Some(date) = self.date else {
            return Err(ValidationError::MissingDate);
        };

        let Some(transaction_type) = self.transaction_type else {
            return Err(ValidationError::MissingType);
        };

        if let Some(creator) = self.id_creator
            && !ctx.creator_exists
        {
            return Err(ValidationError::CreatorNotFound(creator));
        }

        if !ctx
            .year
            .is_some_and(|y| y.id == id_year && y.contains(date))
        {
            return Err(ValidationError::DateOutsideYear(date));
        }

        match self.count_lines() {
            0 => Err(ValidationError::NoLines),
            1 => Err(ValidationError::TooFewLines),
            2 => Ok(()),
            _ if transaction_type == TransactionType::Advanced => Ok(()),
            _ => Err(ValidationError::TooManyLines(transaction_type.label())),
        }
    }

    fn check_account_guards(&self, ctx: &CheckContext<'_>) -> Result<(), ValidationError> {
        let transaction_type = self.transaction_type;

        for (i, line) in self.lines().iter().enumerate() {
            let number = i + 1;

            // Lines without an account are reported by the line pass.
            let Some(id_account) = line.id_account else {
                continue;
            };

            let Some(account) = ctx.accounts.account(id_account) else {
                return Err(ValidationError::AccountNotFound(number));
            };

            match (transaction_type, account.position) {
                (Some(TransactionType::Expense), AccountPosition::Revenue) => {
                    return Err(ValidationError::RevenueAccountOnExpense {
                        line: number,
                        code: account.code.clone(),
                    });
                }
                (Some(TransactionType::Revenue), AccountPosition::Expense) => {
                    return Err(ValidationError::ExpenseAccountOnRevenue {
                        line: number,
                        code: account.code.clone(),
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn check_lines(&self, ctx: &CheckContext<'_>) -> Result<(), ValidationError> {
        let id_chart = ctx.year.map(|y| y.id_chart);
        let mut total = Money::ZERO;

        for (i, line) in self.lines().iter().enumerate() {
            let number = i + 1;

            line.self_check()
                .map_err(|error| ValidationError::Line {
                    line: number,
                    error,
                })?;

            let in_chart = line
                .id_account
                .and_then(|id| ctx.accounts.account(id))
                .is_some_and(|a| Some(a.id_chart) == id_chart);

            if !in_chart {
                return Err(ValidationError::Line {
                    line: number,
                    error: LineError::ForeignAccount,
                });
            }

            total = total
                .checked_add(line.credit)
                .and_then(|t| t.checked_sub(line.debit))
                .ok_or(ValidationError::AmountTooLarge)?;
        }

        if !total.is_zero() {
            return Err(ValidationError::Unbalanced(total));
        }

        Ok(())
    }

    fn check_references(&self, ctx: &CheckContext<'_>) -> Result<(), ValidationError> {
        let Some(id_year) = self.id_year else {
            return Err(ValidationError::MissingYear);
        };

        if !ctx.year.is_some_and(|y| y.id == id_year) {
            return Err(ValidationError::YearNotFound(id_year));
        }

        if let Some(creator) = self.id_creator
            && !ctx.creator_exists
        {
            return Err(ValidationError::CreatorNotFound(creator));
        }

        if let Some(related) = self.id_related {
            if !ctx.related_exists {
                return Err(ValidationError::RelatedNotFound(related));
            }
            if self.id == Some(related) {
                return Err(ValidationError::RelatedToSelf);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "check_props.rs"]
mod props;
