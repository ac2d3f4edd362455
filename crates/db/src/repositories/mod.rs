//! Repository implementations for data access.

pub mod ledger;

pub use ledger::{SeaLedgerStore, SeaLedgerUnit};
