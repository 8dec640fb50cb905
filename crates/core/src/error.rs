//! Domain error model.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, state gates). Infrastructure concerns belong elsewhere.
///
/// The posting-engine variants are surfaced verbatim to callers; none of them is
/// retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, missing required field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested record was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflicting record or state already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Debits and credits of a journal entry do not balance (or are both zero).
    #[error("unbalanced entry: debit {debit} != credit {credit}")]
    UnbalancedEntry { debit: i64, credit: i64 },

    /// The tenant has no open day-book.
    #[error("no day-book is open for posting")]
    DayNotOpen,

    /// End-of-day processing is running; postings are refused until the next day opens.
    #[error("end-of-day processing is in progress")]
    EndOfDayInProgress,

    /// The computed posting timestamp fell outside the day-book's window.
    #[error("posting time {posted_at} is outside business date {business_date}")]
    DateOutOfWindow {
        posted_at: DateTime<Utc>,
        business_date: NaiveDate,
    },

    /// A referenced account is missing or inactive.
    #[error("account {0} is missing or inactive")]
    AccountInactive(String),

    /// The account's code/type can no longer change because ledger lines reference it.
    #[error("account {0} is referenced by ledger lines; code and type are locked")]
    AccountLocked(String),

    /// A lifecycle transition was attempted out of order.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    /// The operation exists as an extension point but is deliberately not built.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

/// Error taxonomy used by callers to decide how to surface a failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before any side effect; safe to retry after correcting the input.
    Precondition,
    /// Requires an operator action (open the day, wait for EOD, fix the account).
    StateGate,
    /// Another record or concurrent operation got there first.
    Conflict,
    NotFound,
    /// Extension point without an implementation.
    Unsupported,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn account_inactive(account: impl Into<String>) -> Self {
        Self::AccountInactive(account.into())
    }

    pub fn account_locked(account: impl Into<String>) -> Self {
        Self::AccountLocked(account.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DomainError::Validation(_)
            | DomainError::InvalidId(_)
            | DomainError::UnbalancedEntry { .. } => ErrorCategory::Precondition,
            DomainError::InvariantViolation(_)
            | DomainError::DayNotOpen
            | DomainError::EndOfDayInProgress
            | DomainError::DateOutOfWindow { .. }
            | DomainError::AccountInactive(_)
            | DomainError::AccountLocked(_)
            | DomainError::InvalidTransition { .. } => ErrorCategory::StateGate,
            DomainError::Conflict(_) => ErrorCategory::Conflict,
            DomainError::NotFound(_) => ErrorCategory::NotFound,
            DomainError::NotImplemented(_) => ErrorCategory::Unsupported,
        }
    }
}
