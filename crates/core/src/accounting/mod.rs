//! Double-entry bookkeeping transactions.
//!
//! A [`Transaction`] owns balanced debit/credit [`Line`]s dated within one
//! fiscal [`Year`]. Forms are imported into the aggregate in memory, checked,
//! then written atomically by [`TransactionService`] through the
//! [`TransactionStore`] seam.
//!
//! # Example
//!
//! ```
//! use compta_core::accounting::{Line, Transaction, TransactionType};
//! use compta_shared::types::{AccountId, Money, YearId};
//!
//! let mut t = Transaction::new();
//! t.transaction_type = Some(TransactionType::Expense);
//! t.id_year = Some(YearId::new(1));
//! t.add_line(Line::debit(AccountId::new(3), Money::from_minor(1200)));
//! t.add_line(Line::credit(AccountId::new(1), Money::from_minor(1200)));
//!
//! assert_eq!(t.credit_sum(), t.debit_sum());
//! ```

mod account;
mod check;
mod diff;
mod duplicate;
mod error;
pub mod form;
mod import;
mod line;
mod service;
mod status;
mod store;
mod transaction;
mod types;
mod year;

#[cfg(test)]
mod fixtures;

pub use account::{Account, AccountLookup, AccountPosition, AccountSelector, Chart};
pub use check::CheckContext;
pub use diff::{FieldChange, LineChange, LineSummary, TransactionDiff};
pub use error::{LineError, LogicError, TransactionError, ValidationError};
pub use form::FormInput;
pub use import::{ImportContext, OPENING_BALANCE_LABEL};
pub use line::{LINE_TEXT_MAX, Line, LineFields, LineWithAccount};
pub use service::TransactionService;
pub use status::TransactionStatus;
pub use store::{LedgerRead, LedgerWrite, LinkedUser, StoreError, TransactionStore};
pub use transaction::{
    JournalEntry, LABEL_MAX, NOTES_MAX, PayoffSummary, REFERENCE_MAX, Transaction,
    TransactionDetails, TransactionRecord,
};
pub use types::{AccountSlot, Direction, SlotDetails, TransactionType, TypeDetails};
pub use year::Year;
