//! Chart-of-accounts `before_update` guard.
//!
//! Once any ledger line references an account its `code` and `kind` are frozen. The
//! prior state comes from the context's previous snapshot.

use coopbooks_accounting::ChartOfAccount;
use coopbooks_core::DomainError;
use coopbooks_events::{HookError, HookPoint};

use super::{LedgerHookContext, LedgerHooks};
use crate::error::EngineError;

pub const NAME: &str = "account_lock_guard";

pub fn register(hooks: &mut LedgerHooks, priority: i32) -> Result<(), HookError> {
    hooks.register::<ChartOfAccount, _>(HookPoint::BeforeUpdate, priority, NAME, guard)
}

fn guard(next: &mut ChartOfAccount, ctx: &mut LedgerHookContext<'_>) -> Result<(), EngineError> {
    let (account_id, code) = match ctx.previous::<ChartOfAccount>() {
        Some(previous) if previous.identity_differs(next) => (previous.id, previous.code.clone()),
        Some(_) => return Ok(()),
        None => {
            return Err(DomainError::invariant("account update without a prior snapshot").into());
        }
    };

    let tenant_id = ctx.tenant_id();
    let lines = ctx.tx().count_ledger_lines(tenant_id, account_id)?;
    if lines > 0 {
        return Err(DomainError::account_locked(code).into());
    }
    Ok(())
}
