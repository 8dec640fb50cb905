//! Chart-of-accounts maintenance.
//!
//! Updates run `before_update` hooks with the stored account as the context's previous
//! snapshot; the account lock guard compares against it.

use std::sync::Arc;

use tracing::{info, instrument};

use coopbooks_accounting::{AccountBalance, AccountChanges, AccountKind, ChartOfAccount, trial_balance};
use coopbooks_core::{AccountId, DomainError, TenantId, UserId};
use coopbooks_events::{HookContext, HookPoint};

use crate::error::EngineError;
use crate::hooks::LedgerHooks;
use crate::store::LedgerStore;
use crate::unit_of_work::run_in_transaction;

pub struct ChartOfAccountsService<S> {
    store: S,
    hooks: Arc<LedgerHooks>,
}

impl<S> ChartOfAccountsService<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, hooks: Arc<LedgerHooks>) -> Self {
        Self { store, hooks }
    }

    #[instrument(skip_all, fields(tenant_id = %tenant_id, code = %code), err)]
    pub fn create_account(
        &self,
        tenant_id: TenantId,
        code: &str,
        name: &str,
        kind: AccountKind,
        acting_user: UserId,
    ) -> Result<ChartOfAccount, EngineError> {
        let mut account = ChartOfAccount::new(tenant_id, code, name, kind)?;

        run_in_transaction(&self.store, "create_account", |tx| -> Result<ChartOfAccount, EngineError> {
            let mut ctx = HookContext::new(tx, tenant_id, acting_user);
            self.hooks.execute(HookPoint::OnValidate, &mut account, &mut ctx)?;
            self.hooks.execute(HookPoint::BeforeCreate, &mut account, &mut ctx)?;
            ctx.tx().insert_account(account.clone())?;
            self.hooks.execute(HookPoint::AfterCreate, &mut account, &mut ctx)?;

            info!(tenant_id = %tenant_id, code = %account.code, "account created");
            Ok(account)
        })
    }

    /// Apply `changes` to an existing account.
    ///
    /// Changing `code` or `kind` of an account that ledger lines reference fails with
    /// `AccountLocked` (core hook).
    #[instrument(skip_all, fields(tenant_id = %tenant_id, account_id = %account_id), err)]
    pub fn update_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        changes: AccountChanges,
        acting_user: UserId,
    ) -> Result<ChartOfAccount, EngineError> {
        if changes.is_empty() {
            return Err(DomainError::validation("no account changes requested").into());
        }

        run_in_transaction(&self.store, "update_account", |tx| -> Result<ChartOfAccount, EngineError> {
            let previous = tx
                .account(tenant_id, account_id)?
                .ok_or_else(|| DomainError::not_found(format!("account {account_id}")))?;
            let mut account = previous.with_changes(&changes)?;

            let mut ctx = HookContext::new(tx, tenant_id, acting_user).with_previous(previous);
            self.hooks.execute(HookPoint::OnValidate, &mut account, &mut ctx)?;
            self.hooks.execute(HookPoint::BeforeUpdate, &mut account, &mut ctx)?;
            ctx.tx().update_account(account.clone())?;
            self.hooks.execute(HookPoint::AfterUpdate, &mut account, &mut ctx)?;

            info!(tenant_id = %tenant_id, code = %account.code, "account updated");
            Ok(account)
        })
    }

    /// Inactive accounts keep their history but refuse new postings.
    pub fn deactivate_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        acting_user: UserId,
    ) -> Result<ChartOfAccount, EngineError> {
        self.update_account(
            tenant_id,
            account_id,
            AccountChanges::default().active(false),
            acting_user,
        )
    }

    pub fn accounts(&self, tenant_id: TenantId) -> Result<Vec<ChartOfAccount>, EngineError> {
        let mut tx = self.store.begin()?;
        Ok(tx.accounts(tenant_id)?)
    }

    /// Signed per-account balances over every committed entry of the tenant.
    pub fn trial_balance(&self, tenant_id: TenantId) -> Result<Vec<AccountBalance>, EngineError> {
        let mut tx = self.store.begin()?;
        let chart = tx.accounts(tenant_id)?;
        let entries = tx.journal_entries(tenant_id)?;
        Ok(trial_balance(&chart, &entries))
    }
}
