use super::*;
use crate::accounting::fixtures::{
    BANK, CASH, CUSTOMER, EXPENSE, OPENING, REVENUE, SUPPLIER, chart, date, money, year,
};
use serde_json::json;

fn form(value: Value) -> FormInput {
    value.as_object().cloned().unwrap()
}

fn with_chart(chart: &Chart, analytical_set_all: bool) -> ImportContext<'_> {
    ImportContext {
        chart: Some(chart),
        settings: AccountingConfig { analytical_set_all },
    }
}

fn sides(t: &Transaction) -> Vec<(Option<AccountId>, i64, i64)> {
    t.lines()
        .iter()
        .map(|l| (l.id_account, l.debit.minor(), l.credit.minor()))
        .collect()
}

#[test]
fn test_simple_revenue_from_new_form() {
    let chart = chart();
    let mut t = Transaction::new();
    t.import_from_new_form(
        &form(json!({
            "type": 1,
            "amount": "100",
            "label": "Concert tickets",
            "date": "2024-05-01",
            "id_year": 1,
            "id_project": 3,
            "payment_reference": "CB-77",
            "simple": {"1": {"credit": {"4": "706 — Services"}, "debit": {"1": "512A — Bank"}}},
        })),
        &with_chart(&chart, false),
    )
    .unwrap();

    assert_eq!(t.transaction_type, Some(TransactionType::Revenue));
    assert_eq!(sides(&t), vec![(Some(REVENUE), 0, 10000), (Some(BANK), 10000, 0)]);
    assert_eq!(t.lines()[0].id_project, Some(ProjectId::new(3)));
    assert_eq!(t.lines()[1].id_project, None);
    assert_eq!(t.payment_reference(), Some("CB-77"));
    assert_eq!(t.label, "Concert tickets");
    assert_eq!(t.date, Some(date(2024, 5, 1)));
    assert_eq!(t.id_year, Some(YearId::new(1)));
}

#[test]
fn test_new_form_requires_amount_for_simple_types() {
    let chart = chart();
    let mut t = Transaction::new();
    assert_eq!(
        t.import_from_new_form(&form(json!({"type": 2})), &with_chart(&chart, false)),
        Err(ValidationError::MissingAmount)
    );
    assert_eq!(
        t.import_from_new_form(
            &form(json!({"type": 2, "amount": ""})),
            &with_chart(&chart, false)
        ),
        Err(ValidationError::MissingAmount)
    );
}

#[test]
fn test_new_form_advanced_needs_no_amount() {
    let chart = chart();
    let mut t = Transaction::new();
    t.import_from_new_form(
        &form(json!({"type": 0, "label": "Manual entry"})),
        &with_chart(&chart, false),
    )
    .unwrap();
    assert_eq!(t.transaction_type, Some(TransactionType::Advanced));
    assert_eq!(t.count_lines(), 0);
}

#[test]
fn test_simple_form_requires_every_slot() {
    let chart = chart();
    let mut t = Transaction::new();
    let result = t.import_form(
        &form(json!({
            "type": 2,
            "amount": "5",
            "simple": {"2": {"debit": {"3": "606 — Supplies"}}},
        })),
        &with_chart(&chart, false),
    );
    assert_eq!(result, Err(ValidationError::SlotNotSelected("Paying account")));
}

#[test]
fn test_api_import_with_type_name_and_codes() {
    let chart = chart();
    let mut t = Transaction::new();
    t.import_from_api(
        &form(json!({
            "type": "expense",
            "amount": 1500,
            "debit": "606",
            "credit": "512A",
            "label": "Stamps",
            "date": "15/02/2024",
            "id_year": 1,
        })),
        &with_chart(&chart, false),
    )
    .unwrap();

    assert_eq!(t.transaction_type, Some(TransactionType::Expense));
    assert_eq!(sides(&t), vec![(Some(EXPENSE), 1500, 0), (Some(BANK), 0, 1500)]);
    assert_eq!(t.date, Some(date(2024, 2, 15)));
}

#[test]
fn test_api_import_unknown_name_rejected() {
    let chart = chart();
    let mut t = Transaction::new();
    let result = t.import_from_api(
        &form(json!({"type": "gift", "amount": 10})),
        &with_chart(&chart, false),
    );
    assert!(matches!(result, Err(ValidationError::UnknownType(_))));
}

#[test]
fn test_advanced_lines_in_column_layout() {
    let chart = chart();
    let mut t = Transaction::new();
    t.import_form(
        &form(json!({
            "type": 0,
            "id_year": 1,
            "lines": {
                "account": ["606", "512A"],
                "debit": ["10", ""],
                "credit": ["", "10"],
                "label": ["Paper", ""],
            },
        })),
        &with_chart(&chart, false),
    )
    .unwrap();

    assert_eq!(sides(&t), vec![(Some(EXPENSE), 1000, 0), (Some(BANK), 0, 1000)]);
    assert_eq!(t.lines()[0].label.as_deref(), Some("Paper"));
    assert_eq!(t.lines()[1].label, None);
}

#[test]
fn test_line_account_resolution_order() {
    let chart = chart();
    let mut t = Transaction::new();
    t.id_year = Some(YearId::new(1));
    t.import_form(
        &form(json!({
            "lines": [
                {"account_selector": {"2": "530 — Cash"}, "account": "606", "debit": "1"},
                {"account": "606", "id_account": 1, "credit": "1"},
                {"id_account": "5", "credit": "0"},
            ],
        })),
        &with_chart(&chart, false),
    )
    .unwrap();

    let accounts: Vec<_> = t.lines().iter().map(|l| l.id_account).collect();
    assert_eq!(accounts, vec![Some(CASH), Some(EXPENSE), Some(SUPPLIER)]);
}

#[test]
fn test_line_errors() {
    let chart = chart();
    let ctx = with_chart(&chart, false);

    let mut t = Transaction::new();
    assert_eq!(
        t.import_form(&form(json!({"lines": [{"debit": "1"}]})), &ctx),
        Err(ValidationError::LineWithoutAccount(1))
    );

    assert_eq!(
        t.import_form(&form(json!({"lines": [{"account": "606"}]})), &ctx),
        Err(ValidationError::MissingYearForCode)
    );

    assert_eq!(
        t.import_form(
            &form(json!({"id_year": 1, "lines": [{"account": "606"}, {"account": "999"}]})),
            &ctx
        ),
        Err(ValidationError::UnknownAccountCode {
            code: "999".into(),
            line: 2
        })
    );

    assert_eq!(
        t.import_form(
            &form(json!({"lines": {"account": ["606", "512A"], "debit": ["1"]}})),
            &ctx
        ),
        Err(ValidationError::RaggedLines)
    );
}

#[test]
fn test_lines_replace_existing_ones() {
    let chart = chart();
    let mut t = crate::accounting::fixtures::expense(100);
    t.mark_saved(
        TransactionId::new(1),
        &[compta_shared::types::LineId::new(1), compta_shared::types::LineId::new(2)],
    );
    t.transaction_type = Some(TransactionType::Advanced);
    t.import_form(
        &form(json!({"lines": [{"id_account": 2, "debit": "1"}, {"id_account": 1, "credit": "1"}]})),
        &with_chart(&chart, false),
    )
    .unwrap();
    assert_eq!(t.count_lines(), 2);
    assert_eq!(t.removed_lines().len(), 2);
}

#[test]
fn test_related_and_scalar_fields() {
    let chart = chart();
    let ctx = with_chart(&chart, false);
    let mut t = Transaction::new();

    t.import_form(&form(json!({"id_related": "", "notes": "  "})), &ctx)
        .unwrap();
    assert_eq!(t.id_related, None);
    assert_eq!(t.notes, None);

    t.import_form(&form(json!({"id_related": "5", "id_creator": 2})), &ctx)
        .unwrap();
    assert_eq!(t.id_related, Some(TransactionId::new(5)));
    assert_eq!(t.id_creator, Some(UserId::new(2)));

    assert!(matches!(
        t.import_form(&form(json!({"date": "2024-13-45"})), &ctx),
        Err(ValidationError::InvalidField { field: "date", .. })
    ));
}

#[test]
fn test_transfer_project_follows_setting() {
    let chart = chart();
    let source = form(json!({
        "type": 3,
        "amount": "20",
        "id_project": 8,
        "simple": {"3": {"credit": {"1": "512A — Bank"}, "debit": {"2": "530 — Cash"}}},
    }));

    let mut t = Transaction::new();
    t.import_form(&source, &with_chart(&chart, false)).unwrap();
    assert_eq!(sides(&t), vec![(Some(BANK), 0, 2000), (Some(CASH), 2000, 0)]);
    assert!(t.lines().iter().all(|l| l.id_project.is_none()));

    let mut t = Transaction::new();
    t.import_form(&source, &with_chart(&chart, true)).unwrap();
    assert!(
        t.lines()
            .iter()
            .all(|l| l.id_project == Some(ProjectId::new(8)))
    );
}

fn debt() -> Transaction {
    let mut debt = Transaction::new();
    debt.id = Some(TransactionId::new(3));
    debt.transaction_type = Some(TransactionType::Debt);
    debt.label = "Invoice 42".into();
    debt.add_line(Line::debit(EXPENSE, money(7000)).with_project(Some(ProjectId::new(2))));
    debt.add_line(Line::credit(SUPPLIER, money(7000)));
    debt
}

#[test]
fn test_payoff_of_debt() {
    let chart = chart();
    let mut t = Transaction::new();
    t.pay_off_from(debt());
    t.import_from_payoff_form(
        &form(json!({
            "type": 1,
            "amount": "70",
            "account": {"1": "512A — Bank"},
            "id_project": 2,
            "payment_reference": "VIR-1",
            "date": "2024-06-01",
            "id_year": 1,
        })),
        &with_chart(&chart, false),
    )
    .unwrap();

    assert_eq!(t.transaction_type, Some(TransactionType::Advanced));
    assert_eq!(t.label, "Debt settlement: Invoice 42");
    assert_eq!(sides(&t), vec![(Some(SUPPLIER), 7000, 0), (Some(BANK), 0, 7000)]);
    assert_eq!(t.lines()[0].id_project, Some(ProjectId::new(2)));
    assert_eq!(t.lines()[1].id_project, None);
    assert_eq!(t.lines()[1].reference.as_deref(), Some("VIR-1"));
}

#[test]
fn test_payoff_of_credit_reverses_sides() {
    let chart = chart();
    let mut credit = Transaction::new();
    credit.transaction_type = Some(TransactionType::Credit);
    credit.add_line(Line::credit(REVENUE, money(3000)));
    credit.add_line(Line::debit(CUSTOMER, money(3000)));

    let mut t = Transaction::new();
    t.pay_off_from(credit);
    t.import_from_payoff_form(
        &form(json!({"amount": "30", "account": {"1": "512A — Bank"}})),
        &with_chart(&chart, true),
    )
    .unwrap();

    assert_eq!(sides(&t), vec![(Some(CUSTOMER), 0, 3000), (Some(BANK), 3000, 0)]);
}

#[test]
fn test_payoff_errors() {
    let chart = chart();
    let ctx = with_chart(&chart, false);

    let mut t = Transaction::new();
    assert!(matches!(
        t.import_from_payoff_form(&form(json!({"amount": "1"})), &ctx),
        Err(TransactionError::Logic(LogicError::NoRelatedTransaction))
    ));

    let mut t = Transaction::new();
    t.pay_off_from(debt());
    assert!(matches!(
        t.import_from_payoff_form(&form(json!({"amount": "1"})), &ctx),
        Err(TransactionError::Validation(ValidationError::NoSettlementAccount))
    ));
    assert!(matches!(
        t.import_from_payoff_form(&form(json!({"account": {"1": "x"}})), &ctx),
        Err(TransactionError::Validation(ValidationError::MissingAmount))
    ));

    // A debt made only of debit lines has no third-party line.
    let mut broken = Transaction::new();
    broken.transaction_type = Some(TransactionType::Debt);
    broken.add_line(Line::debit(EXPENSE, money(10)));
    let mut t = Transaction::new();
    t.pay_off_from(broken);
    assert!(matches!(
        t.import_from_payoff_form(&form(json!({"amount": "1", "account": {"1": "x"}})), &ctx),
        Err(TransactionError::Logic(LogicError::ThirdPartyAccountNotFound))
    ));
}

#[test]
fn test_deposit_form() {
    let chart = chart();
    let ctx = with_chart(&chart, false);
    let mut t = Transaction::new();
    t.import_from_deposit_form(
        &form(json!({
            "amount": "30",
            "account_transfer": {"1": "512A — Bank"},
            "label": "Cash deposit",
            "lines": [{"id_account": 2, "credit": "30"}],
        })),
        &ctx,
    )
    .unwrap();

    assert_eq!(t.transaction_type, Some(TransactionType::Advanced));
    assert_eq!(sides(&t), vec![(Some(BANK), 3000, 0), (Some(CASH), 0, 3000)]);

    let mut t = Transaction::new();
    assert_eq!(
        t.import_from_deposit_form(&form(json!({"amount": "30"})), &ctx),
        Err(ValidationError::NoDepositAccount)
    );
    assert_eq!(
        t.import_from_deposit_form(&form(json!({"account_transfer": {"1": "x"}})), &ctx),
        Err(ValidationError::MissingAmount)
    );
}

#[test]
fn test_balance_form_adds_opening_line() {
    let chart = chart();
    let mut t = Transaction::new();
    t.import_from_balance_form(
        &year(),
        &chart,
        &form(json!({"lines": [
            {"account": "512A", "debit": "100"},
            {"account": "401", "credit": "40"},
        ]})),
        AccountingConfig::default(),
    )
    .unwrap();

    assert_eq!(t.label, OPENING_BALANCE_LABEL);
    assert_eq!(t.date, Some(date(2024, 1, 1)));
    assert_eq!(t.transaction_type, Some(TransactionType::Advanced));
    assert_eq!(
        sides(&t),
        vec![
            (Some(BANK), 10000, 0),
            (Some(SUPPLIER), 0, 4000),
            (Some(OPENING), 0, 6000),
        ]
    );
    assert_eq!(t.credit_sum(), t.debit_sum());
}

#[test]
fn test_balance_form_rejects_overflowing_totals() {
    let mut t = Transaction::new();
    assert_eq!(
        t.import_from_balance_form(
            &year(),
            &chart(),
            &form(json!({"lines": [
                {"account": "512A", "debit": i64::MAX},
                {"account": "512A", "debit": i64::MAX},
            ]})),
            AccountingConfig::default(),
        ),
        Err(ValidationError::AmountTooLarge)
    );
}

#[test]
fn test_balance_form_without_opening_account() {
    let mut chart = chart();
    chart.accounts.retain(|a| a.id != OPENING);
    let mut t = Transaction::new();
    assert_eq!(
        t.import_from_balance_form(
            &year(),
            &chart,
            &form(json!({"lines": [{"account": "512A", "debit": "1"}]})),
            AccountingConfig::default(),
        ),
        Err(ValidationError::NoOpeningAccount)
    );

    // Balanced input needs no opening account.
    let mut t = Transaction::new();
    t.import_from_balance_form(
        &year(),
        &chart,
        &form(json!({"lines": [
            {"account": "512A", "debit": "1"},
            {"account": "401", "credit": "1"},
        ]})),
        AccountingConfig::default(),
    )
    .unwrap();
    assert_eq!(t.count_lines(), 2);
}
