//! Typed IDs for type-safe entity references.
//!
//! Rows are keyed by database-assigned integers. Wrapping them prevents
//! accidentally passing an `AccountId` where a `ProjectId` is expected.

use serde::{Deserialize, Serialize};

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Creates an ID from a raw database key.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw database key.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for a member/user.");
typed_id!(ServiceUserId, "Unique identifier for a member's service subscription.");
typed_id!(YearId, "Unique identifier for a fiscal year.");
typed_id!(ChartId, "Unique identifier for a chart of accounts.");
typed_id!(AccountId, "Unique identifier for a chart of accounts entry.");
typed_id!(ProjectId, "Unique identifier for an analytic project.");
typed_id!(TransactionId, "Unique identifier for a transaction.");
typed_id!(LineId, "Unique identifier for a transaction line.");
