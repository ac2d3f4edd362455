//! Accounts and charts of accounts.
//!
//! Charts are managed elsewhere; the engine only reads them to resolve codes,
//! check chart membership and classify transactions.

use std::collections::HashMap;

use compta_shared::types::{AccountId, ChartId};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Role of an account in the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountPosition {
    /// No particular role.
    Other,
    /// Bank account.
    Bank,
    /// Cash box.
    Cash,
    /// Payments received but not yet deposited.
    Outstanding,
    /// Opening balance account.
    Opening,
    /// Closing balance account.
    Closing,
    /// Member, supplier or customer account.
    ThirdParty,
    /// Expense account.
    Expense,
    /// Revenue account.
    Revenue,
}

impl AccountPosition {
    /// Every position, in code order.
    pub const ALL: [Self; 9] = [
        Self::Other,
        Self::Bank,
        Self::Cash,
        Self::Outstanding,
        Self::Opening,
        Self::Closing,
        Self::ThirdParty,
        Self::Expense,
        Self::Revenue,
    ];

    /// Stable integer code, used in storage and form target strings.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Other => 0,
            Self::Bank => 1,
            Self::Cash => 2,
            Self::Outstanding => 3,
            Self::Opening => 6,
            Self::Closing => 7,
            Self::ThirdParty => 8,
            Self::Expense => 9,
            Self::Revenue => 10,
        }
    }

    /// Parse from the stable integer code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }
}

/// An entry of a chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account id.
    pub id: AccountId,
    /// Owning chart.
    pub id_chart: ChartId,
    /// Account code, unique within its chart.
    pub code: String,
    /// Human label.
    pub label: String,
    /// Role of the account.
    pub position: AccountPosition,
}

impl Account {
    /// `"512A — Bank"` style label shown in selectors.
    #[must_use]
    pub fn code_and_label(&self) -> String {
        format!("{} — {}", self.code, self.label)
    }

    /// Selector pointing at this account.
    #[must_use]
    pub fn selector(&self) -> AccountSelector {
        AccountSelector {
            id: self.id,
            label: self.code_and_label(),
        }
    }
}

/// Read access to accounts by id.
pub trait AccountLookup {
    /// Returns the account with this id, if known.
    fn account(&self, id: AccountId) -> Option<&Account>;
}

impl AccountLookup for HashMap<AccountId, Account> {
    fn account(&self, id: AccountId) -> Option<&Account> {
        self.get(&id)
    }
}

impl AccountLookup for Chart {
    fn account(&self, id: AccountId) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

/// A chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    /// Chart id.
    pub id: ChartId,
    /// Accounts of the chart.
    pub accounts: Vec<Account>,
}

impl Chart {
    /// Creates a chart.
    #[must_use]
    pub fn new(id: ChartId, accounts: Vec<Account>) -> Self {
        Self { id, accounts }
    }

    /// Finds an account by its code.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.code == code)
    }

    /// The first account with the opening-balance role.
    #[must_use]
    pub fn opening_account(&self) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.position == AccountPosition::Opening)
    }

    /// Returns true if the account belongs to this chart.
    #[must_use]
    pub fn contains(&self, id: AccountId) -> bool {
        self.account(id).is_some()
    }
}

/// Reference to an account as carried by form selectors.
///
/// On the wire this is a single-entry object `{ "<id>": "<code — label>" }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSelector {
    /// Selected account.
    pub id: AccountId,
    /// Display label.
    pub label: String,
}

impl AccountSelector {
    /// Reads a selector from a form value.
    ///
    /// Accepts the object form, or a bare id as number or string.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => {
                let (key, label) = map.iter().next()?;
                let id = key.trim().parse::<i64>().ok().filter(|id| *id > 0)?;
                Some(Self {
                    id: AccountId::new(id),
                    label: label.as_str().unwrap_or_default().to_string(),
                })
            }
            Value::Number(n) => n.as_i64().filter(|id| *id > 0).map(|id| Self {
                id: AccountId::new(id),
                label: String::new(),
            }),
            Value::String(s) => s.trim().parse::<i64>().ok().filter(|id| *id > 0).map(|id| {
                Self {
                    id: AccountId::new(id),
                    label: String::new(),
                }
            }),
            _ => None,
        }
    }

    /// Object form of the selector.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = serde_json::Map::new();
        map.insert(self.id.to_string(), Value::String(self.label.clone()));
        Value::Object(map)
    }
}

impl Serialize for AccountSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.id.to_string(), &self.label)?;
        map.end()
    }
}
