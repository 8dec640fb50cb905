//! Generic field and balance validation.

use coopbooks_accounting::{ChartOfAccount, JournalEntry, validate_lines};
use coopbooks_core::DomainError;
use coopbooks_events::{HookError, HookPoint};

use super::LedgerHooks;
use crate::error::EngineError;

pub fn register(hooks: &mut LedgerHooks, priority: i32) -> Result<(), HookError> {
    // Runs after the gate so it sees lines as earlier hooks left them.
    hooks.register::<JournalEntry, _>(
        HookPoint::BeforeCreate,
        priority,
        "journal_entry_balance",
        |entry, _ctx| validate_entry(entry),
    )?;

    hooks.register::<ChartOfAccount, _>(
        HookPoint::OnValidate,
        priority,
        "chart_of_account_fields",
        |account, _ctx| account.validate().map_err(EngineError::from),
    )
}

fn validate_entry(entry: &JournalEntry) -> Result<(), EngineError> {
    if entry.description.trim().is_empty() {
        return Err(DomainError::validation("journal entry description is required").into());
    }
    validate_lines(&entry.lines)?;
    Ok(())
}
