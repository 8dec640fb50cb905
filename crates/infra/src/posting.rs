//! Ledger poster: validated, day-gated double-entry postings.
//!
//! ```text
//! precheck (description, balance)        no side effects on failure
//!   ↓
//! unit of work
//!   on_validate
//!   before_create   day-book gate (10), balance validation (100)
//!   insert entry + lines
//!   after_create    audit (1000)
//!   on_submit
//! commit
//! ```
//!
//! Any hook failure aborts the unit of work; nothing is retried.

use std::sync::Arc;

use tracing::{info, instrument};

use coopbooks_accounting::{JournalEntry, LedgerLine, validate_lines};
use coopbooks_core::{Clock, DomainError, JournalEntryId, TenantId, UserId};
use coopbooks_events::{HookContext, HookPoint};

use crate::error::EngineError;
use crate::hooks::{LedgerHookContext, LedgerHooks};
use crate::store::LedgerStore;
use crate::unit_of_work::run_in_transaction;

/// Request to post one journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostJournalEntry {
    pub tenant_id: TenantId,
    pub description: String,
    pub lines: Vec<LedgerLine>,
    pub acting_user: UserId,
}

pub struct LedgerPoster<S> {
    store: S,
    hooks: Arc<LedgerHooks>,
    clock: Arc<dyn Clock>,
}

impl<S> LedgerPoster<S> {
    pub fn new(store: S, hooks: Arc<LedgerHooks>, clock: Arc<dyn Clock>) -> Self {
        Self { store, hooks, clock }
    }
}

impl<S> LedgerPoster<S>
where
    S: LedgerStore,
{
    /// Post a balanced entry in its own unit of work.
    ///
    /// The entry's `date` is assigned by the day-book gate. Refusals surface verbatim:
    /// `UnbalancedEntry`, `DayNotOpen`, `EndOfDayInProgress`, `DateOutOfWindow`,
    /// `AccountInactive`.
    #[instrument(
        skip_all,
        fields(tenant_id = %request.tenant_id, lines = request.lines.len()),
        err
    )]
    pub fn post_journal_entry(&self, request: PostJournalEntry) -> Result<JournalEntry, EngineError> {
        let PostJournalEntry {
            tenant_id,
            description,
            lines,
            acting_user,
        } = request;

        precheck(&description, &lines)?;

        run_in_transaction(
            &self.store,
            "post_journal_entry",
            |tx| -> Result<JournalEntry, EngineError> {
                let mut ctx = HookContext::new(tx, tenant_id, acting_user);
                self.post_within(&mut ctx, description, lines)
            },
        )
    }

    /// Cancel a posted entry.
    ///
    /// Runs the `on_cancel` hooks for the stored entry, then fails: cancellation is not
    /// implemented, so this never succeeds and never writes.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, entry_id = %entry_id), err)]
    pub fn cancel_journal_entry(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
        acting_user: UserId,
    ) -> Result<(), EngineError> {
        run_in_transaction(&self.store, "cancel_journal_entry", |tx| -> Result<(), EngineError> {
            let mut entry = tx
                .journal_entry(tenant_id, entry_id)?
                .ok_or_else(|| DomainError::not_found(format!("journal entry {entry_id}")))?;

            let mut ctx = HookContext::new(tx, tenant_id, acting_user);
            self.hooks.execute(HookPoint::OnCancel, &mut entry, &mut ctx)?;

            Err(DomainError::NotImplemented("journal entry cancellation").into())
        })
    }
}

impl<S> LedgerPoster<S> {
    /// Post on the caller's transaction (composite operations).
    ///
    /// The caller owns the unit of work: a failure here must abort it.
    pub fn post_within(
        &self,
        ctx: &mut LedgerHookContext<'_>,
        description: impl Into<String>,
        lines: Vec<LedgerLine>,
    ) -> Result<JournalEntry, EngineError> {
        let description = description.into();
        precheck(&description, &lines)?;

        let tenant_id = ctx.tenant_id();
        let entry_number = ctx.tx().next_entry_number(tenant_id)?;
        let mut entry = JournalEntry::draft(
            tenant_id,
            entry_number,
            description,
            self.clock.now(tenant_id),
            lines,
            ctx.user_id(),
        );

        self.hooks.execute(HookPoint::OnValidate, &mut entry, ctx)?;
        self.hooks.execute(HookPoint::BeforeCreate, &mut entry, ctx)?;

        // before_create handlers may have rewritten the lines.
        validate_lines(&entry.lines)?;
        ctx.tx().insert_journal_entry(entry.clone())?;

        self.hooks.execute(HookPoint::AfterCreate, &mut entry, ctx)?;
        self.hooks.execute(HookPoint::OnSubmit, &mut entry, ctx)?;

        info!(
            tenant_id = %tenant_id,
            entry_number,
            posted_at = %entry.date,
            "journal entry posted"
        );
        Ok(entry)
    }
}

fn precheck(description: &str, lines: &[LedgerLine]) -> Result<(), EngineError> {
    if description.trim().is_empty() {
        return Err(DomainError::validation("journal entry description is required").into());
    }
    validate_lines(lines)?;
    Ok(())
}
