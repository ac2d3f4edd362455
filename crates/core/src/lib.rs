//! Core business logic for Compta.
//!
//! This crate contains the bookkeeping engine with ZERO web or database
//! dependencies. Persistence is reached through the traits in
//! [`accounting::TransactionStore`], implemented by the db crate.
//!
//! # Modules
//!
//! - `accounting` - Transactions, lines, form import and validation
//! - `storage` - Attachment files

pub mod accounting;
pub mod storage;
