//! Journal-entry `before_create` gate: the day-book must be open, the entry is stamped
//! inside the business date, and every referenced account must be active.

use std::sync::Arc;

use coopbooks_accounting::JournalEntry;
use coopbooks_core::{Clock, DomainError};
use coopbooks_events::{HookError, HookPoint};

use super::{LedgerHookContext, LedgerHooks};
use crate::error::EngineError;

pub const NAME: &str = "day_book_gate";

pub fn register(hooks: &mut LedgerHooks, clock: Arc<dyn Clock>, priority: i32) -> Result<(), HookError> {
    hooks.register::<JournalEntry, _>(HookPoint::BeforeCreate, priority, NAME, move |entry, ctx| {
        apply(clock.as_ref(), entry, ctx)
    })
}

fn apply(
    clock: &dyn Clock,
    entry: &mut JournalEntry,
    ctx: &mut LedgerHookContext<'_>,
) -> Result<(), EngineError> {
    let tenant_id = ctx.tenant_id();

    let day = ctx
        .tx()
        .active_day_book(tenant_id)?
        .ok_or(DomainError::DayNotOpen)?;
    day.ensure_accepts_postings()?;

    entry.date = day.posting_timestamp(clock.now(tenant_id))?;

    for account_id in entry.account_ids() {
        match ctx.tx().account(tenant_id, account_id)? {
            Some(account) if account.is_active => {}
            Some(account) => return Err(DomainError::account_inactive(account.code).into()),
            None => return Err(DomainError::account_inactive(account_id.to_string()).into()),
        }
    }

    ctx.insert_metadata("business_date", day.date.to_string());
    Ok(())
}
