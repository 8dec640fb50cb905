//! Core lifecycle hooks of the posting engine.
//!
//! | entity | point | hook | default priority |
//! |---|---|---|---|
//! | journal entry | `before_create` | day-book gate | 10 |
//! | journal entry | `before_create` | balance validation | 100 |
//! | journal entry | `on_cancel` | not-implemented stub | 0 |
//! | chart of account | `on_validate` | field validation | 100 |
//! | chart of account | `before_update` | account lock guard | 10 |
//! | every entity | `after_create` / `after_update` | audit trail | 1000 |

pub mod account_lock;
pub mod audit;
pub mod cancel;
pub mod day_book_gate;
pub mod validation;

use std::sync::Arc;

use tracing::info;

use coopbooks_accounting::{ChartOfAccount, DayBook, JournalEntry};
use coopbooks_core::Clock;
use coopbooks_events::{HookContext, HookError, HookRegistry};
use coopbooks_shares::ShareAccount;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::store::Tx;

/// Hook registry specialised to the ledger store transaction and engine error.
pub type LedgerHooks = HookRegistry<Tx, EngineError>;

/// Hook context carrying an open ledger store transaction.
pub type LedgerHookContext<'a> = HookContext<'a, Tx>;

/// Register every built-in hook according to `config`.
///
/// Collaborators may register further handlers on the same registry before it is shared.
pub fn register_core_hooks(
    hooks: &mut LedgerHooks,
    config: &EngineConfig,
    clock: Arc<dyn Clock>,
) -> Result<(), HookError> {
    let priorities = &config.priorities;

    day_book_gate::register(hooks, Arc::clone(&clock), priorities.day_book_gate)?;
    validation::register(hooks, priorities.validation)?;
    account_lock::register(hooks, priorities.account_lock)?;
    cancel::register(hooks, priorities.cancel_stub)?;

    if config.audit.enabled {
        audit::register_for::<JournalEntry>(hooks, Arc::clone(&clock), priorities.audit)?;
        audit::register_for::<ChartOfAccount>(hooks, Arc::clone(&clock), priorities.audit)?;
        audit::register_for::<DayBook>(hooks, Arc::clone(&clock), priorities.audit)?;
        audit::register_for::<ShareAccount>(hooks, clock, priorities.audit)?;
    }

    info!(audit = config.audit.enabled, "core hooks registered");
    Ok(())
}
