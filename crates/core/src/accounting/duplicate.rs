//! Copying a transaction into another fiscal year.

use super::account::{AccountLookup, Chart};
use super::line::Line;
use super::status::TransactionStatus;
use super::transaction::Transaction;
use super::year::Year;

impl Transaction {
    /// Unsaved copy of this transaction bound to `target`.
    ///
    /// Lines are remapped by account code into `target_chart`; a line whose
    /// code has no match keeps no account and will fail validation. The date
    /// is kept only if it falls within the target year. Status is cleared.
    #[must_use]
    pub fn duplicate(
        &self,
        target: &Year,
        target_chart: &Chart,
        source_accounts: &dyn AccountLookup,
    ) -> Transaction {
        let mut copy = Transaction::new();
        copy.transaction_type = self.transaction_type;
        copy.label.clone_from(&self.label);
        copy.notes.clone_from(&self.notes);
        copy.reference.clone_from(&self.reference);
        copy.status = TransactionStatus::empty();
        copy.id_year = Some(target.id);
        copy.date = self.date.filter(|d| target.contains(*d));

        for line in self.lines() {
            let id_account = line
                .id_account
                .and_then(|id| source_accounts.account(id))
                .and_then(|a| target_chart.find_by_code(&a.code))
                .map(|a| a.id);

            copy.add_line(Line {
                id_account,
                id_project: line.id_project,
                label: line.label.clone(),
                reference: line.reference.clone(),
                credit: line.credit,
                debit: line.debit,
                ..Line::default()
            });
        }

        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::check::CheckContext;
    use crate::accounting::error::{LineError, ValidationError};
    use crate::accounting::fixtures::{
        BANK, CASH, OTHER_CHART_EXPENSE, all_accounts, chart, date, expense, money, next_year,
        other_chart, year,
    };
    use compta_shared::types::{AccountId, LineId, TransactionId};

    #[test]
    fn test_lines_remapped_by_code() {
        let mut source = expense(1200);
        source.reference = Some("F-12".into());
        source.add_status(TransactionStatus::PAID);
        source.mark_saved(TransactionId::new(5), &[LineId::new(1), LineId::new(2)]);

        let copy = source.duplicate(&next_year(), &other_chart(), &all_accounts());

        assert!(!copy.exists());
        assert_eq!(copy.id_year, Some(next_year().id));
        assert_eq!(copy.label, "Printer paper");
        assert_eq!(copy.reference.as_deref(), Some("F-12"));
        assert_eq!(copy.status, TransactionStatus::empty());
        assert_eq!(copy.date, None);

        let accounts: Vec<_> = copy.lines().iter().map(|l| l.id_account).collect();
        assert_eq!(
            accounts,
            vec![Some(OTHER_CHART_EXPENSE), Some(AccountId::new(101))]
        );
        assert!(copy.lines().iter().all(|l| l.id.is_none()));
        assert_eq!(copy.debit_sum(), money(1200));
    }

    #[test]
    fn test_date_kept_inside_target_year() {
        let copy = expense(10).duplicate(&year(), &chart(), &all_accounts());
        assert_eq!(copy.date, Some(date(2024, 3, 15)));
    }

    #[test]
    fn test_unmatched_code_fails_validation() {
        let mut source = expense(500);
        source.reset_lines();
        source.add_line(Line::debit(CASH, money(500)));
        source.add_line(Line::credit(BANK, money(500)));

        let mut copy = source.duplicate(&next_year(), &other_chart(), &all_accounts());
        assert_eq!(copy.lines()[0].id_account, None);

        copy.date = Some(date(2025, 2, 1));
        let accounts = all_accounts();
        let target = next_year();
        let result = copy.self_check(&CheckContext {
            year: Some(&target),
            accounts: &accounts,
            creator_exists: true,
            related_exists: true,
        });
        assert_eq!(
            result,
            Err(ValidationError::Line {
                line: 1,
                error: LineError::MissingAccount
            })
        );
    }
}
