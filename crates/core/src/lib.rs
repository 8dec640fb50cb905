//! `coopbooks-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the domain error model and the tenant-scoped clock
//! the posting engine reads wall-clock time from.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult, ErrorCategory};
pub use id::{
    AccountId, AuditRecordId, JournalEntryId, MemberId, ShareAccountId, TenantId, UserId,
};
