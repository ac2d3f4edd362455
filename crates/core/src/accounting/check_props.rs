//! Property-based tests for transaction validation.
//!
//! - Balance: an advanced transaction passes iff credits equal debits.
//! - Simplified types never accept more than two lines.

use proptest::prelude::*;

use super::*;
use crate::accounting::fixtures::{BANK, CASH, EXPENSE, all_accounts, expense, money, year};
use crate::accounting::line::Line;

/// Strategy for line amounts (0.01 to 10,000.00).
fn amount() -> impl Strategy<Value = i64> {
    1i64..1_000_000
}

fn advanced(debits: &[i64], credits: &[i64]) -> Transaction {
    let mut t = expense(1);
    t.transaction_type = Some(TransactionType::Advanced);
    t.reset_lines();
    for d in debits {
        t.add_line(Line::debit(EXPENSE, money(*d)));
    }
    for c in credits {
        t.add_line(Line::credit(BANK, money(*c)));
    }
    t
}

fn run(t: &Transaction) -> Result<(), ValidationError> {
    let accounts = all_accounts();
    let year = year();
    t.self_check(&CheckContext {
        year: Some(&year),
        accounts: &accounts,
        creator_exists: true,
        related_exists: true,
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Splitting a debit over several credit lines keeps the entry valid.
    #[test]
    fn prop_split_entry_balances(parts in prop::collection::vec(amount(), 1..8)) {
        let total: i64 = parts.iter().sum();
        let t = advanced(&[total], &parts);
        prop_assert_eq!(run(&t), Ok(()));
    }

    /// Any imbalance is reported with the credit-minus-debit difference.
    #[test]
    fn prop_imbalance_reported(
        debits in prop::collection::vec(amount(), 1..5),
        credits in prop::collection::vec(amount(), 1..5),
    ) {
        let t = advanced(&debits, &credits);
        let diff = credits.iter().sum::<i64>() - debits.iter().sum::<i64>();
        let result = run(&t);
        if diff == 0 {
            prop_assert_eq!(result, Ok(()));
        } else {
            prop_assert_eq!(result, Err(ValidationError::Unbalanced(money(diff))));
        }
    }

    /// Simplified types reject a third line whatever the amounts.
    #[test]
    fn prop_simple_types_cap_lines(extra in amount()) {
        let mut t = expense(1000);
        t.add_line(Line::debit(CASH, money(extra)));
        prop_assert_eq!(run(&t), Err(ValidationError::TooManyLines("Expense")));
    }
}
