use coopbooks_accounting::JournalEntry;
use coopbooks_core::DomainError;
use coopbooks_events::{HookError, HookPoint};

use super::LedgerHooks;
use crate::error::EngineError;

/// Journal cancellation is an extension point without an implementation: the handler
/// always fails, so cancelling never succeeds.
pub fn register(hooks: &mut LedgerHooks, priority: i32) -> Result<(), HookError> {
    hooks.register::<JournalEntry, _>(
        HookPoint::OnCancel,
        priority,
        "journal_cancel_not_implemented",
        |_entry, _ctx| {
            Err(EngineError::from(DomainError::NotImplemented(
                "journal entry cancellation",
            )))
        },
    )
}
