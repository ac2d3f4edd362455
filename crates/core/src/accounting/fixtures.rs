//! Shared test data: a small chart and two fiscal years.

use std::collections::HashMap;

use chrono::NaiveDate;
use compta_shared::types::{AccountId, ChartId, Money, YearId};

use super::account::{Account, AccountPosition, Chart};
use super::line::Line;
use super::transaction::Transaction;
use super::types::TransactionType;
use super::year::Year;

pub const BANK: AccountId = AccountId::new(1);
pub const CASH: AccountId = AccountId::new(2);
pub const EXPENSE: AccountId = AccountId::new(3);
pub const REVENUE: AccountId = AccountId::new(4);
pub const SUPPLIER: AccountId = AccountId::new(5);
pub const OPENING: AccountId = AccountId::new(6);
pub const CUSTOMER: AccountId = AccountId::new(7);

/// Expense account with the same code as `EXPENSE`, in the second chart.
pub const OTHER_CHART_EXPENSE: AccountId = AccountId::new(103);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn account(id: AccountId, chart: i64, code: &str, label: &str, position: AccountPosition) -> Account {
    Account {
        id,
        id_chart: ChartId::new(chart),
        code: code.into(),
        label: label.into(),
        position,
    }
}

pub fn chart() -> Chart {
    Chart::new(
        ChartId::new(1),
        vec![
            account(BANK, 1, "512A", "Bank", AccountPosition::Bank),
            account(CASH, 1, "530", "Cash", AccountPosition::Cash),
            account(EXPENSE, 1, "606", "Supplies", AccountPosition::Expense),
            account(REVENUE, 1, "706", "Services", AccountPosition::Revenue),
            account(SUPPLIER, 1, "401", "Suppliers", AccountPosition::ThirdParty),
            account(OPENING, 1, "890", "Opening balance", AccountPosition::Opening),
            account(CUSTOMER, 1, "411", "Customers", AccountPosition::ThirdParty),
        ],
    )
}

pub fn other_chart() -> Chart {
    Chart::new(
        ChartId::new(2),
        vec![
            account(AccountId::new(101), 2, "512A", "Bank", AccountPosition::Bank),
            account(OTHER_CHART_EXPENSE, 2, "606", "Supplies", AccountPosition::Expense),
        ],
    )
}

/// Accounts of both charts, keyed by id.
pub fn all_accounts() -> HashMap<AccountId, Account> {
    chart()
        .accounts
        .into_iter()
        .chain(other_chart().accounts)
        .map(|a| (a.id, a))
        .collect()
}

pub fn year() -> Year {
    Year {
        id: YearId::new(1),
        label: "2024".into(),
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        closed: false,
        id_chart: ChartId::new(1),
    }
}

pub fn next_year() -> Year {
    Year {
        id: YearId::new(2),
        label: "2025".into(),
        start_date: date(2025, 1, 1),
        end_date: date(2025, 12, 31),
        closed: false,
        id_chart: ChartId::new(2),
    }
}

pub fn money(minor: i64) -> Money {
    Money::from_minor(minor)
}

/// An unsaved two-line expense of `amount` paid from the bank.
pub fn expense(amount: i64) -> Transaction {
    let mut t = Transaction::new();
    t.transaction_type = Some(TransactionType::Expense);
    t.label = "Printer paper".into();
    t.date = Some(date(2024, 3, 15));
    t.id_year = Some(YearId::new(1));
    t.add_line(Line::debit(EXPENSE, money(amount)));
    t.add_line(Line::credit(BANK, money(amount)));
    t
}
