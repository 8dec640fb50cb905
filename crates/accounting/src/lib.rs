//! Accounting module (double-entry ledger, chart of accounts, day-book).
//!
//! Pure domain logic only: no IO, no persistence concerns. The infrastructure crate
//! drives these types through lifecycle hooks inside a unit of work.

pub mod account;
pub mod balance;
pub mod day_book;
pub mod journal;

pub use account::{AccountChanges, AccountKind, ChartOfAccount};
pub use balance::{AccountBalance, trial_balance};
pub use day_book::{DayBook, DayBookStatus, PostingWindow};
pub use journal::{EntryTotals, JournalEntry, LedgerLine, validate_lines};
