//! Transaction types and the simplified-form slot tables.
//!
//! Each simplified type is entered through two account slots. The tables
//! below describe those slots; `Transaction::types_details` fills in the
//! selected values.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::account::{AccountPosition, AccountSelector};
use super::error::ValidationError;

/// Economic type of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TransactionType {
    /// Free multi-line entry.
    Advanced,
    /// Money received against a revenue account.
    Revenue,
    /// Money paid against an expense account.
    Expense,
    /// Movement between bank, cash and outstanding accounts.
    Transfer,
    /// Money owed by the organisation.
    Debt,
    /// Money owed to the organisation.
    Credit,
}

impl TransactionType {
    /// Every type, in code order.
    pub const ALL: [Self; 6] = [
        Self::Advanced,
        Self::Revenue,
        Self::Expense,
        Self::Transfer,
        Self::Debt,
        Self::Credit,
    ];

    /// Stable integer code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Advanced => 0,
            Self::Revenue => 1,
            Self::Expense => 2,
            Self::Transfer => 3,
            Self::Debt => 4,
            Self::Credit => 5,
        }
    }

    /// Parse from the stable integer code.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    /// Parse a symbolic name such as `"revenue"`, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        match name.to_ascii_uppercase().as_str() {
            "ADVANCED" => Some(Self::Advanced),
            "REVENUE" => Some(Self::Revenue),
            "EXPENSE" => Some(Self::Expense),
            "TRANSFER" => Some(Self::Transfer),
            "DEBT" => Some(Self::Debt),
            "CREDIT" => Some(Self::Credit),
            _ => None,
        }
    }

    /// Human label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Advanced => "Advanced",
            Self::Revenue => "Revenue",
            Self::Expense => "Expense",
            Self::Transfer => "Transfer",
            Self::Debt => "Debt",
            Self::Credit => "Credit",
        }
    }

    /// Form help text.
    #[must_use]
    pub const fn help(self) -> Option<&'static str> {
        match self {
            Self::Revenue | Self::Expense => None,
            Self::Transfer => Some("Bank deposit, internal transfer, etc."),
            Self::Debt => Some("When the organisation owes money to a member or a supplier"),
            Self::Credit => Some("When a member or a customer owes money to the organisation"),
            Self::Advanced => Some(
                "Choose accounts from the chart, split a transaction over several accounts, etc.",
            ),
        }
    }

    /// The type a single account suggests on its own.
    #[must_use]
    pub const fn from_account_position(position: AccountPosition) -> Self {
        match position {
            AccountPosition::Revenue => Self::Revenue,
            AccountPosition::Expense => Self::Expense,
            AccountPosition::ThirdParty => Self::Debt,
            AccountPosition::Bank | AccountPosition::Cash | AccountPosition::Outstanding => {
                Self::Transfer
            }
            AccountPosition::Opening | AccountPosition::Closing | AccountPosition::Other => {
                Self::Advanced
            }
        }
    }

    /// The two account slots of a simplified type; empty for `Advanced`.
    #[must_use]
    pub fn slots(self) -> &'static [AccountSlot] {
        match self {
            Self::Revenue => REVENUE_SLOTS,
            Self::Expense => EXPENSE_SLOTS,
            Self::Transfer => TRANSFER_SLOTS,
            Self::Debt => DEBT_SLOTS,
            Self::Credit => CREDIT_SLOTS,
            Self::Advanced => &[],
        }
    }
}

impl From<TransactionType> for i32 {
    fn from(t: TransactionType) -> Self {
        t.code()
    }
}

impl TryFrom<i32> for TransactionType {
    type Error = ValidationError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| ValidationError::UnknownType(code.to_string()))
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Side of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Debit side.
    Debit,
    /// Credit side.
    Credit,
}

impl Direction {
    /// Form key of the side.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// One account slot of a simplified form.
#[derive(Debug, PartialEq, Eq)]
pub struct AccountSlot {
    /// Human label.
    pub label: &'static str,
    /// Account positions offered in the selector.
    pub targets: &'static [AccountPosition],
    /// Side the slot's line is written on.
    pub direction: Direction,
    /// When the form switches from another type, the side of that type's
    /// current lines whose account is carried into this slot.
    pub defaults: &'static [(TransactionType, Direction)],
}

impl AccountSlot {
    /// Side to carry over when switching from `from`.
    #[must_use]
    pub fn default_for(&self, from: TransactionType) -> Option<Direction> {
        self.defaults
            .iter()
            .find(|(t, _)| *t == from)
            .map(|(_, d)| *d)
    }

    /// Target codes joined with `:`.
    #[must_use]
    pub fn targets_string(&self) -> String {
        self.targets
            .iter()
            .map(|p| p.code().to_string())
            .collect::<Vec<_>>()
            .join(":")
    }
}

const MONEY_ACCOUNTS: &[AccountPosition] = &[
    AccountPosition::Bank,
    AccountPosition::Cash,
    AccountPosition::Outstanding,
];

const REVENUE_SLOTS: &[AccountSlot] = &[
    AccountSlot {
        label: "Revenue type",
        targets: &[AccountPosition::Revenue],
        direction: Direction::Credit,
        defaults: &[(TransactionType::Credit, Direction::Credit)],
    },
    AccountSlot {
        label: "Receiving account",
        targets: MONEY_ACCOUNTS,
        direction: Direction::Debit,
        defaults: &[
            (TransactionType::Expense, Direction::Credit),
            (TransactionType::Transfer, Direction::Credit),
        ],
    },
];

const EXPENSE_SLOTS: &[AccountSlot] = &[
    AccountSlot {
        label: "Expense type",
        targets: &[AccountPosition::Expense],
        direction: Direction::Debit,
        defaults: &[(TransactionType::Debt, Direction::Debit)],
    },
    AccountSlot {
        label: "Paying account",
        targets: MONEY_ACCOUNTS,
        direction: Direction::Credit,
        defaults: &[
            (TransactionType::Revenue, Direction::Debit),
            (TransactionType::Transfer, Direction::Credit),
        ],
    },
];

const TRANSFER_SLOTS: &[AccountSlot] = &[
    AccountSlot {
        label: "From",
        targets: MONEY_ACCOUNTS,
        direction: Direction::Credit,
        defaults: &[
            (TransactionType::Expense, Direction::Credit),
            (TransactionType::Revenue, Direction::Debit),
        ],
    },
    AccountSlot {
        label: "To",
        targets: MONEY_ACCOUNTS,
        direction: Direction::Debit,
        defaults: &[],
    },
];

const DEBT_SLOTS: &[AccountSlot] = &[
    AccountSlot {
        label: "Debt type (expense)",
        targets: &[AccountPosition::Expense],
        direction: Direction::Debit,
        defaults: &[(TransactionType::Expense, Direction::Debit)],
    },
    AccountSlot {
        label: "Third-party account",
        targets: &[AccountPosition::ThirdParty],
        direction: Direction::Credit,
        defaults: &[(TransactionType::Credit, Direction::Debit)],
    },
];

const CREDIT_SLOTS: &[AccountSlot] = &[
    AccountSlot {
        label: "Credit type (revenue)",
        targets: &[AccountPosition::Revenue],
        direction: Direction::Credit,
        defaults: &[(TransactionType::Revenue, Direction::Credit)],
    },
    AccountSlot {
        label: "Third-party account",
        targets: &[AccountPosition::ThirdParty],
        direction: Direction::Debit,
        defaults: &[(TransactionType::Debt, Direction::Credit)],
    },
];

/// Rendering metadata for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDetails {
    /// The type.
    pub id: TransactionType,
    /// Human label.
    pub label: &'static str,
    /// Help text.
    pub help: Option<&'static str>,
    /// Slots, empty for `Advanced`.
    pub accounts: Vec<SlotDetails>,
}

/// A slot with its resolved selector value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotDetails {
    /// Human label.
    pub label: &'static str,
    /// Allowed account positions.
    pub targets: &'static [AccountPosition],
    /// Target codes joined with `:`.
    pub targets_string: String,
    /// Side of the slot's line.
    pub direction: Direction,
    /// Form field name, `simple[<type>][<direction>]`.
    pub selector_name: String,
    /// Preselected account.
    pub selector_value: Option<AccountSelector>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("revenue", Some(TransactionType::Revenue))]
    #[case("EXPENSE", Some(TransactionType::Expense))]
    #[case("Transfer", Some(TransactionType::Transfer))]
    #[case("debt", Some(TransactionType::Debt))]
    #[case("credit", Some(TransactionType::Credit))]
    #[case("advanced", Some(TransactionType::Advanced))]
    #[case("status_paid", None)]
    #[case("2", None)]
    #[case("", None)]
    #[case("payoff", None)]
    fn test_from_name(#[case] name: &str, #[case] expected: Option<TransactionType>) {
        assert_eq!(TransactionType::from_name(name), expected);
    }

    #[rstest]
    #[case(AccountPosition::Revenue, TransactionType::Revenue)]
    #[case(AccountPosition::Expense, TransactionType::Expense)]
    #[case(AccountPosition::ThirdParty, TransactionType::Debt)]
    #[case(AccountPosition::Bank, TransactionType::Transfer)]
    #[case(AccountPosition::Cash, TransactionType::Transfer)]
    #[case(AccountPosition::Outstanding, TransactionType::Transfer)]
    #[case(AccountPosition::Opening, TransactionType::Advanced)]
    #[case(AccountPosition::Other, TransactionType::Advanced)]
    fn test_from_account_position(
        #[case] position: AccountPosition,
        #[case] expected: TransactionType,
    ) {
        assert_eq!(TransactionType::from_account_position(position), expected);
    }

    #[test]
    fn test_codes_roundtrip() {
        for t in TransactionType::ALL {
            assert_eq!(TransactionType::try_from(t.code()), Ok(t));
        }
        assert_eq!(
            TransactionType::try_from(9),
            Err(ValidationError::UnknownType("9".into()))
        );
    }

    #[test]
    fn test_simplified_types_have_two_opposite_slots() {
        for t in TransactionType::ALL {
            let slots = t.slots();
            if t == TransactionType::Advanced {
                assert!(slots.is_empty());
            } else {
                assert_eq!(slots.len(), 2, "{t}");
                assert_eq!(slots[0].direction.opposite(), slots[1].direction, "{t}");
            }
        }
    }

    #[test]
    fn test_slot_defaults() {
        let receiving = &TransactionType::Revenue.slots()[1];
        assert_eq!(
            receiving.default_for(TransactionType::Expense),
            Some(Direction::Credit)
        );
        assert_eq!(receiving.default_for(TransactionType::Debt), None);
        assert_eq!(receiving.targets_string(), "1:2:3");
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&TransactionType::Debt).unwrap(), "4");
        let t: TransactionType = serde_json::from_str("1").unwrap();
        assert_eq!(t, TransactionType::Revenue);
        assert!(serde_json::from_str::<TransactionType>("7").is_err());
    }
}
