//! Building transactions from submitted forms.
//!
//! Every entry point ends in `import_form`, which expands a simplified
//! two-slot form into lines, resolves line accounts and copies the scalar
//! fields. The wrappers add their own required fields first.

use std::collections::HashMap;

use chrono::NaiveDate;
use compta_shared::AccountingConfig;
use compta_shared::types::{AccountId, Money, ProjectId, TransactionId, UserId, YearId};
use serde_json::Value;
use tracing::debug;

use super::account::{Account, AccountLookup, AccountSelector, Chart};
use super::error::{LogicError, TransactionError, ValidationError};
use super::form::{
    FormInput, form_lines, get_int, get_optional_string, get_string, is_empty_value,
    parse_amount, required_amount,
};
use super::line::Line;
use super::transaction::Transaction;
use super::types::{Direction, TransactionType};
use super::year::Year;

/// Label given to opening-balance transactions.
pub const OPENING_BALANCE_LABEL: &str = "Opening balance";

/// What an import needs besides the submitted form.
#[derive(Debug, Clone, Copy)]
pub struct ImportContext<'a> {
    /// Chart of the transaction's fiscal year, used to resolve account codes.
    pub chart: Option<&'a Chart>,
    /// Accounting settings.
    pub settings: AccountingConfig,
}

/// A line as submitted, before its account is resolved.
#[derive(Debug, Clone, Default)]
struct LineInput {
    account_selector: Option<AccountSelector>,
    id_account: Option<AccountId>,
    account_code: Option<String>,
    credit: Money,
    debit: Money,
    label: Option<String>,
    reference: Option<String>,
    id_project: Option<ProjectId>,
}

impl LineInput {
    fn from_form(row: &FormInput) -> Result<Self, ValidationError> {
        let account_selector = row
            .get("account_selector")
            .filter(|v| !is_empty_value(v))
            .and_then(AccountSelector::from_value);

        Ok(Self {
            account_selector,
            id_account: get_int(row, "id_account")?.map(AccountId::new),
            account_code: get_optional_string(row, "account"),
            credit: parse_amount(row.get("credit").unwrap_or(&Value::Null))?,
            debit: parse_amount(row.get("debit").unwrap_or(&Value::Null))?,
            label: get_optional_string(row, "label"),
            reference: get_optional_string(row, "reference"),
            id_project: get_int(row, "id_project")?.map(ProjectId::new),
        })
    }

    fn on_side(mut self, side: Direction, amount: Money) -> Self {
        match side {
            Direction::Debit => self.debit = amount,
            Direction::Credit => self.credit = amount,
        }
        self
    }

    /// Resolves the account: selector first, then code, then raw id.
    fn resolve(
        self,
        number: usize,
        has_year: bool,
        chart: Option<&Chart>,
    ) -> Result<Line, ValidationError> {
        let id_account = if let Some(selector) = self.account_selector {
            selector.id
        } else if let Some(code) = self.account_code {
            if !has_year {
                return Err(ValidationError::MissingYearForCode);
            }
            chart
                .and_then(|c| c.find_by_code(&code))
                .map(|a| a.id)
                .ok_or(ValidationError::UnknownAccountCode { code, line: number })?
        } else if let Some(id) = self.id_account {
            id
        } else {
            return Err(ValidationError::LineWithoutAccount(number));
        };

        Ok(Line {
            id_account: Some(id_account),
            id_project: self.id_project,
            label: self.label,
            reference: self.reference,
            credit: self.credit,
            debit: self.debit,
            ..Line::default()
        })
    }
}

impl Transaction {
    /// Imports an advanced or simplified form.
    ///
    /// A simplified type with an `amount` is expanded into its two slot
    /// lines. Otherwise any `lines` given replace the current ones.
    ///
    /// # Errors
    ///
    /// Returns the first form error found.
    pub fn import_form(
        &mut self,
        source: &FormInput,
        ctx: &ImportContext<'_>,
    ) -> Result<(), ValidationError> {
        let mut source = source.clone();

        if source.get("id_related").is_some_and(is_empty_value) {
            source.insert("id_related".into(), Value::Null);
        }

        let rows = form_lines(&source)?;

        if let Some(transaction_type) = form_type(&source)? {
            self.transaction_type = Some(transaction_type);
        }

        let lines = match self.transaction_type {
            Some(t) if t != TransactionType::Advanced && is_set(&source, "amount") => {
                Some(self.simple_lines(t, &source, ctx)?)
            }
            _ => rows
                .map(|rows| {
                    rows.iter()
                        .map(LineInput::from_form)
                        .collect::<Result<Vec<_>, _>>()
                })
                .transpose()?,
        };

        self.apply_lines(&source, lines, ctx)?;
        self.import_scalars(&source)
    }

    /// Imports the creation form. Simplified types must carry an `amount`.
    ///
    /// # Errors
    ///
    /// Returns `MissingAmount` or any `import_form` error.
    pub fn import_from_new_form(
        &mut self,
        source: &FormInput,
        ctx: &ImportContext<'_>,
    ) -> Result<(), ValidationError> {
        let transaction_type = form_type(source)?
            .or(self.transaction_type)
            .unwrap_or(TransactionType::Advanced);

        debug!(transaction_type = %transaction_type, "Importing new transaction form");

        if transaction_type != TransactionType::Advanced && !is_set(source, "amount") {
            return Err(ValidationError::MissingAmount);
        }

        self.import_form(source, ctx)
    }

    /// Imports an API body, where `type` may be a name such as `"revenue"`.
    ///
    /// # Errors
    ///
    /// Same as `import_from_new_form`. Names that map to no type are
    /// rejected as unknown types.
    pub fn import_from_api(
        &mut self,
        source: &FormInput,
        ctx: &ImportContext<'_>,
    ) -> Result<(), ValidationError> {
        let mut source = source.clone();

        if let Some(code) = source
            .get("type")
            .and_then(Value::as_str)
            .and_then(TransactionType::from_name)
            .map(TransactionType::code)
        {
            source.insert("type".into(), Value::from(code));
        }

        self.import_from_new_form(&source, ctx)
    }

    /// Imports the settlement form of the transaction attached with
    /// `pay_off_from`.
    ///
    /// The third-party line of the related debt or credit is reversed
    /// against the chosen settlement account.
    ///
    /// # Errors
    ///
    /// Returns a `LogicError` if no related transaction is attached or its
    /// third-party line cannot be found, and a `ValidationError` for form
    /// errors.
    pub fn import_from_payoff_form(
        &mut self,
        source: &FormInput,
        ctx: &ImportContext<'_>,
    ) -> Result<(), TransactionError> {
        let related = self.related().ok_or(LogicError::NoRelatedTransaction)?;
        let related_type = related.transaction_type;

        let mut source = source.clone();
        source.remove("type");
        source.remove("lines");

        let amount = required_amount(&source)?;

        let settlement = source
            .get("account")
            .filter(|v| v.is_object() && !is_empty_value(v))
            .and_then(AccountSelector::from_value)
            .ok_or(ValidationError::NoSettlementAccount)?;

        let d1 = if related_type == Some(TransactionType::Credit) {
            Direction::Credit
        } else {
            Direction::Debit
        };

        let third_party = related
            .lines()
            .iter()
            .find(|l| {
                let skip = (related_type == Some(TransactionType::Debt) && l.is_debit())
                    || (related_type == Some(TransactionType::Credit) && l.is_credit());
                !skip
            })
            .and_then(|l| l.id_account)
            .ok_or(LogicError::ThirdPartyAccountNotFound)?;

        let reference = get_optional_string(&source, "payment_reference");
        let project = get_int(&source, "id_project")?.map(ProjectId::new);

        let lines = vec![
            LineInput {
                id_account: Some(third_party),
                reference: reference.clone(),
                id_project: project,
                ..LineInput::default()
            }
            .on_side(d1, amount),
            LineInput {
                account_selector: Some(settlement),
                reference,
                id_project: project.filter(|_| ctx.settings.analytical_set_all),
                ..LineInput::default()
            }
            .on_side(d1.opposite(), amount),
        ];

        debug!(related = ?self.id_related, "Importing pay-off form");

        self.apply_lines(&source, Some(lines), ctx)?;
        self.import_scalars(&source)?;
        Ok(())
    }

    /// Imports a bank deposit form.
    ///
    /// The selected lines are imported first, then a debit line on the
    /// deposit account is placed in front of them.
    ///
    /// # Errors
    ///
    /// Returns `MissingAmount`, `NoDepositAccount` or any `import_form` error.
    pub fn import_from_deposit_form(
        &mut self,
        source: &FormInput,
        ctx: &ImportContext<'_>,
    ) -> Result<(), ValidationError> {
        let amount = required_amount(source)?;

        self.transaction_type = Some(TransactionType::Advanced);

        let account = source
            .get("account_transfer")
            .filter(|v| !is_empty_value(v))
            .and_then(AccountSelector::from_value)
            .ok_or(ValidationError::NoDepositAccount)?;

        self.import_form(source, ctx)?;
        self.insert_line(0, Line::debit(account.id, amount));
        Ok(())
    }

    /// Imports an opening balance for `year`.
    ///
    /// Any imbalance left by the submitted lines is closed with one line on
    /// the chart's opening-balance account.
    ///
    /// # Errors
    ///
    /// Returns `NoOpeningAccount` if a balancing line is needed and the chart
    /// has no opening account, or any `import_from_new_form` error.
    pub fn import_from_balance_form(
        &mut self,
        year: &Year,
        chart: &Chart,
        source: &FormInput,
        settings: AccountingConfig,
    ) -> Result<(), ValidationError> {
        self.label = OPENING_BALANCE_LABEL.to_string();
        self.date = Some(year.start_date);
        self.id_year = Some(year.id);
        self.transaction_type = Some(TransactionType::Advanced);

        let ctx = ImportContext {
            chart: Some(chart),
            settings,
        };
        self.import_from_new_form(source, &ctx)?;

        let diff = self.balance()?;

        if diff.is_zero() {
            return Ok(());
        }

        let opening = chart
            .opening_account()
            .ok_or(ValidationError::NoOpeningAccount)?;

        let line = if diff.is_positive() {
            Line::debit(opening.id, diff)
        } else {
            Line::credit(opening.id, diff.abs())
        };

        self.add_line(line);
        Ok(())
    }

    fn simple_lines(
        &self,
        transaction_type: TransactionType,
        source: &FormInput,
        ctx: &ImportContext<'_>,
    ) -> Result<Vec<LineInput>, ValidationError> {
        let amount = required_amount(source)?;

        let empty: HashMap<AccountId, Account> = HashMap::new();
        let accounts: &dyn AccountLookup = match ctx.chart {
            Some(chart) => chart,
            None => &empty,
        };

        let slots = self.slot_details(transaction_type, Some(source), accounts);

        // API clients may give account codes as `debit` and `credit` instead.
        if !(is_set(source, "debit") && is_set(source, "credit"))
            && let Some(slot) = slots.iter().find(|s| s.selector_value.is_none())
        {
            return Err(ValidationError::SlotNotSelected(slot.label));
        }

        let reference = get_optional_string(source, "payment_reference");
        let project = get_int(source, "id_project")?.map(ProjectId::new);
        let set_all = ctx.settings.analytical_set_all;

        let mut lines: Vec<LineInput> = slots
            .into_iter()
            .map(|slot| {
                LineInput {
                    account_selector: slot.selector_value,
                    account_code: get_optional_string(source, slot.direction.as_str()),
                    reference: reference.clone(),
                    ..LineInput::default()
                }
                .on_side(slot.direction, amount)
            })
            .collect();

        if (transaction_type != TransactionType::Transfer || set_all)
            && let Some(first) = lines.first_mut()
        {
            first.id_project = project;
        }

        if set_all {
            let first_project = lines.first().and_then(|l| l.id_project);
            if let Some(second) = lines.get_mut(1) {
                second.id_project = first_project;
            }
        }

        Ok(lines)
    }

    fn apply_lines(
        &mut self,
        source: &FormInput,
        lines: Option<Vec<LineInput>>,
        ctx: &ImportContext<'_>,
    ) -> Result<(), ValidationError> {
        let Some(lines) = lines else {
            return Ok(());
        };

        let has_year = self.id_year.is_some() || get_int(source, "id_year")?.is_some();

        self.reset_lines();

        for (i, input) in lines.into_iter().enumerate() {
            let line = input.resolve(i + 1, has_year, ctx.chart)?;
            self.add_line(line);
        }

        Ok(())
    }

    fn import_scalars(&mut self, source: &FormInput) -> Result<(), ValidationError> {
        if source.contains_key("label") {
            self.label = get_string(source, "label").unwrap_or_default();
        }
        if source.contains_key("notes") {
            self.notes = get_optional_string(source, "notes");
        }
        if source.contains_key("reference") {
            self.reference = get_optional_string(source, "reference");
        }
        if let Some(value) = source.get("date") {
            self.date = parse_date(value)?;
        }
        if source.contains_key("id_year") {
            self.id_year = get_int(source, "id_year")?.map(YearId::new);
        }
        if source.contains_key("id_related") {
            self.id_related = get_int(source, "id_related")?.map(TransactionId::new);
        }
        if source.contains_key("id_creator") {
            self.id_creator = get_int(source, "id_creator")?.map(UserId::new);
        }
        Ok(())
    }
}

fn is_set(source: &FormInput, key: &str) -> bool {
    source.get(key).is_some_and(|v| !v.is_null())
}

/// Reads the `type` field as a numeric code.
fn form_type(source: &FormInput) -> Result<Option<TransactionType>, ValidationError> {
    let code = match source.get("type") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(other) => return Err(ValidationError::UnknownType(other.to_string())),
    };

    code.and_then(|c| i32::try_from(c).ok())
        .and_then(TransactionType::from_code)
        .map(Some)
        .ok_or_else(|| {
            let raw = source.get("type").map(Value::to_string).unwrap_or_default();
            ValidationError::UnknownType(raw)
        })
}

/// Accepts `YYYY-MM-DD` and `DD/MM/YYYY`.
fn parse_date(value: &Value) -> Result<Option<NaiveDate>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
                .map(Some)
                .map_err(|_| ValidationError::InvalidField {
                    field: "date",
                    value: s.to_string(),
                })
        }
        other => Err(ValidationError::InvalidField {
            field: "date",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
