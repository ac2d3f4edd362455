//! Errors raised by the bookkeeping engine.
//!
//! `ValidationError` is user-correctable and carries the offending field or
//! 1-based line number. `LogicError` means the caller broke a precondition.
//! `TransactionError` is what the service returns.

use chrono::NaiveDate;
use compta_shared::AppError;
use compta_shared::types::{Money, MoneyError, TransactionId, UserId, YearId};
use thiserror::Error;

use super::store::StoreError;
use crate::storage::StorageError;

/// Constraint violated by a single line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// No account on the line.
    #[error("no account is set")]
    MissingAccount,

    /// Both amounts are zero.
    #[error("no debit or credit amount")]
    NoAmount,

    /// An amount is below zero.
    #[error("amount cannot be negative")]
    NegativeAmount,

    /// Both amounts are set.
    #[error("not balanced, credit or debit must be zero")]
    BothSides,

    /// The account is not part of the fiscal year's chart.
    #[error("the account does not belong to the year's chart of accounts")]
    ForeignAccount,

    /// Line label longer than 200 characters.
    #[error("label cannot exceed 200 characters")]
    LabelTooLong,

    /// Line reference longer than 200 characters.
    #[error("reference cannot exceed 200 characters")]
    ReferenceTooLong,
}

/// User-correctable validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // ========== Header ==========
    /// No fiscal year bound.
    #[error("The fiscal year must be set")]
    MissingYear,

    /// Blank label.
    #[error("The label cannot be empty")]
    EmptyLabel,

    /// Label longer than 200 characters.
    #[error("The label cannot exceed 200 characters")]
    LabelTooLong,

    /// Reference longer than 200 characters.
    #[error("The reference cannot exceed 200 characters")]
    ReferenceTooLong,

    /// Notes longer than 2000 characters.
    #[error("The notes cannot exceed 2000 characters")]
    NotesTooLong,

    /// No date.
    #[error("The date cannot be empty")]
    MissingDate,

    /// No type set.
    #[error("The transaction type is not set")]
    MissingType,

    /// Type code or name that maps to no known type.
    #[error("Unknown transaction type: {0}")]
    UnknownType(String),

    /// Creator does not reference an existing member.
    #[error("The creator member {0} does not exist")]
    CreatorNotFound(UserId),

    /// Date outside the bound fiscal year.
    #[error("The date {0} is outside the selected fiscal year")]
    DateOutsideYear(NaiveDate),

    // ========== Lines ==========
    /// Empty line set.
    #[error("This transaction has no lines")]
    NoLines,

    /// A single line.
    #[error("This transaction has fewer than two lines")]
    TooFewLines,

    /// More than two lines on a simplified type.
    #[error("A \"{0}\" transaction cannot have more than two lines")]
    TooManyLines(&'static str),

    /// A line failed its own checks.
    #[error("Line {line}: {error}")]
    Line {
        /// 1-based line number.
        line: usize,
        /// What is wrong with it.
        #[source]
        error: LineError,
    },

    /// Credits and debits differ.
    #[error("Unbalanced transaction: difference of {0} between debits and credits")]
    Unbalanced(Money),

    /// Line amounts whose total does not fit in minor units.
    #[error("The total of the line amounts is too large")]
    AmountTooLarge,

    /// A line account id that resolves to no account.
    #[error("Line {0}: the specified account does not exist")]
    AccountNotFound(usize),

    /// Revenue account used on an expense.
    #[error("Line {line}: a revenue account ({code}) cannot be used on an expense")]
    RevenueAccountOnExpense {
        /// 1-based line number.
        line: usize,
        /// Account code.
        code: String,
    },

    /// Expense account used on a revenue.
    #[error("Line {line}: an expense account ({code}) cannot be used on a revenue")]
    ExpenseAccountOnRevenue {
        /// 1-based line number.
        line: usize,
        /// Account code.
        code: String,
    },

    // ========== References ==========
    /// Bound fiscal year is missing from the store.
    #[error("The selected fiscal year {0} does not exist")]
    YearNotFound(YearId),

    /// Related transaction is missing from the store.
    #[error("The related transaction {0} does not exist")]
    RelatedNotFound(TransactionId),

    /// A transaction related to itself.
    #[error("A transaction cannot be related to itself")]
    RelatedToSelf,

    // ========== Locks ==========
    /// Modification of a validated transaction.
    #[error("A validated transaction cannot be modified")]
    Validated,

    /// Creation or modification in a closed year.
    #[error("Cannot create or modify a transaction in a closed fiscal year")]
    YearClosed,

    /// Deletion of a validated transaction.
    #[error("A validated transaction cannot be deleted")]
    DeleteValidated,

    /// Deletion in a closed year.
    #[error("Cannot delete a transaction that belongs to a closed fiscal year")]
    DeleteYearClosed,

    // ========== Form input ==========
    /// Amount missing or empty.
    #[error("Amount not specified")]
    MissingAmount,

    /// Amount that does not parse.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Transposed line arrays of different lengths.
    #[error("No account selected for some lines")]
    RaggedLines,

    /// A simplified-form slot without a selection.
    #[error("{0}: no account selected")]
    SlotNotSelected(&'static str),

    /// A form line with no account reference at all.
    #[error("Line {0}: no account selected")]
    LineWithoutAccount(usize),

    /// An account code was given but no fiscal year is known.
    #[error("The fiscal year id is not specified")]
    MissingYearForCode,

    /// Account code absent from the chart.
    #[error("The account with code \"{code}\" on line {line} does not exist")]
    UnknownAccountCode {
        /// Code as submitted.
        code: String,
        /// 1-based line number.
        line: usize,
    },

    /// Deposit form without a deposit account.
    #[error("No deposit account selected")]
    NoDepositAccount,

    /// Pay-off form without a settlement account.
    #[error("No settlement account selected")]
    NoSettlementAccount,

    /// Chart without an opening-balance account.
    #[error("No opening balance account exists in the chart of accounts")]
    NoOpeningAccount,

    /// A scalar field with an unusable value.
    #[error("Invalid value for {field}: {value}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Submitted value.
        value: String,
    },
}

impl ValidationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingYear => "MISSING_YEAR",
            Self::EmptyLabel => "EMPTY_LABEL",
            Self::LabelTooLong => "LABEL_TOO_LONG",
            Self::ReferenceTooLong => "REFERENCE_TOO_LONG",
            Self::NotesTooLong => "NOTES_TOO_LONG",
            Self::MissingDate => "MISSING_DATE",
            Self::MissingType => "MISSING_TYPE",
            Self::UnknownType(_) => "UNKNOWN_TYPE",
            Self::CreatorNotFound(_) => "CREATOR_NOT_FOUND",
            Self::DateOutsideYear(_) => "DATE_OUTSIDE_YEAR",
            Self::NoLines => "NO_LINES",
            Self::TooFewLines => "TOO_FEW_LINES",
            Self::TooManyLines(_) => "TOO_MANY_LINES",
            Self::Line { .. } => "INVALID_LINE",
            Self::Unbalanced(_) => "UNBALANCED_TRANSACTION",
            Self::AmountTooLarge => "AMOUNT_TOO_LARGE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::RevenueAccountOnExpense { .. } => "REVENUE_ACCOUNT_ON_EXPENSE",
            Self::ExpenseAccountOnRevenue { .. } => "EXPENSE_ACCOUNT_ON_REVENUE",
            Self::YearNotFound(_) => "YEAR_NOT_FOUND",
            Self::RelatedNotFound(_) => "RELATED_NOT_FOUND",
            Self::RelatedToSelf => "RELATED_TO_SELF",
            Self::Validated => "TRANSACTION_VALIDATED",
            Self::YearClosed => "YEAR_CLOSED",
            Self::DeleteValidated => "DELETE_VALIDATED",
            Self::DeleteYearClosed => "DELETE_YEAR_CLOSED",
            Self::MissingAmount => "MISSING_AMOUNT",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::RaggedLines => "RAGGED_LINES",
            Self::SlotNotSelected(_) => "SLOT_NOT_SELECTED",
            Self::LineWithoutAccount(_) => "LINE_WITHOUT_ACCOUNT",
            Self::MissingYearForCode => "MISSING_YEAR_FOR_CODE",
            Self::UnknownAccountCode { .. } => "UNKNOWN_ACCOUNT_CODE",
            Self::NoDepositAccount => "NO_DEPOSIT_ACCOUNT",
            Self::NoSettlementAccount => "NO_SETTLEMENT_ACCOUNT",
            Self::NoOpeningAccount => "NO_OPENING_ACCOUNT",
            Self::InvalidField { .. } => "INVALID_FIELD",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 409 Conflict - the stored state forbids the write
            Self::Validated | Self::YearClosed | Self::DeleteValidated | Self::DeleteYearClosed => {
                409
            }

            // 400 Bad Request - everything else is bad input
            _ => 400,
        }
    }

    /// Returns the 1-based line number this error refers to, if any.
    #[must_use]
    pub fn line_number(&self) -> Option<usize> {
        match self {
            Self::Line { line, .. }
            | Self::RevenueAccountOnExpense { line, .. }
            | Self::ExpenseAccountOnRevenue { line, .. }
            | Self::UnknownAccountCode { line, .. }
            | Self::AccountNotFound(line)
            | Self::LineWithoutAccount(line) => Some(*line),
            _ => None,
        }
    }
}

impl From<MoneyError> for ValidationError {
    fn from(err: MoneyError) -> Self {
        Self::InvalidAmount(err.to_string())
    }
}

/// Broken preconditions in the calling code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogicError {
    /// Pay-off import without a related transaction attached.
    #[error("cannot import pay-off if no related transaction is set")]
    NoRelatedTransaction,

    /// Related debt/credit without a third-party line.
    #[error("cannot find the third-party account of the related transaction")]
    ThirdPartyAccountNotFound,

    /// Operation that needs a persisted transaction.
    #[error("the transaction has not been saved yet")]
    NotPersisted,
}

/// Errors returned by the transaction service.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// User-correctable failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Programming error in the caller.
    #[error(transparent)]
    Logic(#[from] LogicError),

    /// Transaction id unknown to the store.
    #[error("Transaction not found: {0}")]
    NotFound(TransactionId),

    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Attachment storage failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl TransactionError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.error_code(),
            Self::Logic(_) => "LOGIC_ERROR",
            Self::NotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(err) => err.http_status_code(),
            Self::NotFound(_) => 404,
            Self::Logic(_) | Self::Store(_) | Self::Storage(_) => 500,
        }
    }
}

impl From<MoneyError> for TransactionError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(err.into())
    }
}

impl From<TransactionError> for AppError {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Validation(ValidationError::Validated
            | ValidationError::YearClosed
            | ValidationError::DeleteValidated
            | ValidationError::DeleteYearClosed) => Self::BusinessRule(err.to_string()),
            TransactionError::Validation(_) => Self::Validation(err.to_string()),
            TransactionError::NotFound(_) => Self::NotFound(err.to_string()),
            TransactionError::Store(_) => Self::Database(err.to_string()),
            TransactionError::Storage(_) => Self::Storage(err.to_string()),
            TransactionError::Logic(_) => Self::Internal(err.to_string()),
        }
    }
}
