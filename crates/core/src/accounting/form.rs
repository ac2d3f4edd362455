//! Untyped form input helpers.
//!
//! Form submissions and API bodies reach the engine as JSON objects. These
//! helpers read scalars, amounts and line arrays out of them with the loose
//! rules HTML forms need: empty strings, `0`, `false` and `null` count as
//! absent.

use std::num::FpCategory;

use compta_shared::types::Money;
use serde_json::{Map, Value};

use super::error::ValidationError;

/// A submitted form or API body.
pub type FormInput = Map<String, Value>;

/// Returns true for values a form treats as not filled in.
#[must_use]
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().is_some_and(|f| f.classify() == FpCategory::Zero),
            |i| i == 0,
        ),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Reads a trimmed string field. Numbers are rendered as text.
#[must_use]
pub fn get_string(source: &FormInput, key: &str) -> Option<String> {
    match source.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads an optional string field, mapping blank to `None`.
#[must_use]
pub fn get_optional_string(source: &FormInput, key: &str) -> Option<String> {
    get_string(source, key).filter(|s| !s.is_empty())
}

/// Reads an integer field given as number or numeric string.
///
/// # Errors
///
/// Returns `InvalidField` if the value is present but not an integer.
pub fn get_int(source: &FormInput, key: &'static str) -> Result<Option<i64>, ValidationError> {
    let Some(value) = source.get(key) else {
        return Ok(None);
    };

    if is_empty_value(value) {
        return Ok(None);
    }

    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(Some).ok_or_else(|| ValidationError::InvalidField {
        field: key,
        value: value.to_string(),
    })
}

/// Parses an amount value.
///
/// Integer JSON numbers are minor units, as sent by API clients. Strings are
/// decimal amounts as typed in a form (`"12,50"`, `"1 234.5"`).
///
/// # Errors
///
/// Returns `InvalidAmount` for anything else or for unparseable text.
pub fn parse_amount(value: &Value) -> Result<Money, ValidationError> {
    match value {
        Value::Null => Ok(Money::ZERO),
        Value::Number(n) => n
            .as_i64()
            .map(Money::from_minor)
            .ok_or_else(|| ValidationError::InvalidAmount(n.to_string())),
        Value::String(s) if s.trim().is_empty() => Ok(Money::ZERO),
        Value::String(s) => Ok(Money::parse(s)?),
        other => Err(ValidationError::InvalidAmount(other.to_string())),
    }
}

/// Reads the `amount` field, which must be filled in.
///
/// # Errors
///
/// Returns `MissingAmount` if absent or empty, `InvalidAmount` if it does
/// not parse.
pub fn required_amount(source: &FormInput) -> Result<Money, ValidationError> {
    match source.get("amount") {
        Some(value) if !is_empty_value(value) => {
            let amount = parse_amount(value)?;
            if amount.is_zero() {
                return Err(ValidationError::MissingAmount);
            }
            Ok(amount)
        }
        _ => Err(ValidationError::MissingAmount),
    }
}

/// Turns a column-keyed line map into rows.
///
/// `{"account": ["512", "606"], "debit": ["", "10"]}` becomes
/// `[{"account": "512", "debit": ""}, {"account": "606", "debit": "10"}]`.
/// Columns may be arrays or objects keyed by row index.
///
/// # Errors
///
/// Returns `RaggedLines` if the columns have different lengths.
pub fn transpose(columns: &FormInput) -> Result<Vec<FormInput>, ValidationError> {
    let mut rows: Vec<FormInput> = Vec::new();
    let mut expected: Option<usize> = None;

    for (key, column) in columns {
        let cells: Vec<&Value> = match column {
            Value::Array(a) => a.iter().collect(),
            Value::Object(o) => indexed_values(o),
            _ => return Err(ValidationError::RaggedLines),
        };

        match expected {
            Some(n) if n != cells.len() => return Err(ValidationError::RaggedLines),
            Some(_) => {}
            None => {
                expected = Some(cells.len());
                rows.resize_with(cells.len(), FormInput::new);
            }
        }

        for (row, cell) in rows.iter_mut().zip(cells) {
            row.insert(key.clone(), cell.clone());
        }
    }

    Ok(rows)
}

/// Values of an index-keyed object, in numeric key order.
fn indexed_values(map: &FormInput) -> Vec<&Value> {
    let mut entries: Vec<(Option<usize>, &Value)> =
        map.iter().map(|(k, v)| (k.parse::<usize>().ok(), v)).collect();
    entries.sort_by_key(|(index, _)| *index);
    entries.into_iter().map(|(_, v)| v).collect()
}

/// Reads the `lines` field in either row or column layout.
///
/// Returns `None` when the field is absent or not a collection.
///
/// # Errors
///
/// Returns `RaggedLines` if a column layout cannot be transposed.
pub fn form_lines(source: &FormInput) -> Result<Option<Vec<FormInput>>, ValidationError> {
    match source.get("lines") {
        Some(Value::Object(columns)) if !columns.is_empty() => {
            // A map keyed by row index is a list of rows, not columns.
            if columns.keys().all(|k| k.parse::<usize>().is_ok()) {
                return Ok(Some(
                    indexed_values(columns)
                        .into_iter()
                        .filter_map(|v| v.as_object().cloned())
                        .collect(),
                ));
            }
            transpose(columns).map(Some)
        }
        Some(Value::Array(rows)) => Ok(Some(
            rows.iter().filter_map(|v| v.as_object().cloned()).collect(),
        )),
        _ => Ok(None),
    }
}
