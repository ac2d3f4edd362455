//! Transaction status flags.

use serde::{Deserialize, Serialize};

/// Independent, combinable status flags stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionStatus(u8);

impl TransactionStatus {
    /// Debt or credit waiting for settlement.
    pub const WAITING: Self = Self(1);
    /// Settled.
    pub const PAID: Self = Self(2);
    /// Deposited in bank.
    pub const DEPOSIT: Self = Self(4);
    /// Flagged as erroneous by a reviewer.
    pub const ERROR: Self = Self(8);

    const NAMED: [(Self, &'static str); 3] = [
        (Self::WAITING, "Waiting for payment"),
        (Self::PAID, "Paid"),
        (Self::DEPOSIT, "Deposited in bank"),
    ];

    /// No flag set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Builds a status from stored bits, dropping unknown ones.
    #[must_use]
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if every flag of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the flags of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the flags of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Human names of the set flags.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}
