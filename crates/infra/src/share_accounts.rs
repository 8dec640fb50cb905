//! Member share accounts: provisioning target and share purchases.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};

use coopbooks_accounting::{JournalEntry, LedgerLine};
use coopbooks_core::{AccountId, Clock, DomainError, DomainResult, MemberId, TenantId, UserId};
use coopbooks_events::{EventBus, EventEnvelope, HookContext, HookEntity, HookPoint};
use coopbooks_shares::{CertificateNo, ShareAccount, SharesPurchased};

use crate::error::EngineError;
use crate::hooks::{LedgerHookContext, LedgerHooks};
use crate::posting::LedgerPoster;
use crate::provisioner::{ProvisionTarget, Provisioner};
use crate::store::{LedgerStore, StoreError, Tx};
use crate::unit_of_work::run_in_transaction;

/// One share account per member, numbered by the tenant's certificate sequence.
pub struct ShareAccountTarget {
    clock: Arc<dyn Clock>,
}

impl ShareAccountTarget {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl ProvisionTarget for ShareAccountTarget {
    type Owner = MemberId;
    type Resource = ShareAccount;
    type Sequence = CertificateNo;

    fn resource_name(&self) -> &'static str {
        "share_account"
    }

    fn existing_owners(
        &self,
        tx: &mut Tx,
        tenant_id: TenantId,
        owners: &[MemberId],
    ) -> Result<HashSet<MemberId>, StoreError> {
        Ok(tx
            .share_accounts_for(tenant_id, owners)?
            .into_iter()
            .map(|a| a.member_id)
            .collect())
    }

    fn highest_sequence(
        &self,
        tx: &mut Tx,
        tenant_id: TenantId,
    ) -> Result<Option<CertificateNo>, StoreError> {
        tx.highest_certificate_no(tenant_id)
    }

    fn first_sequence(&self) -> CertificateNo {
        CertificateNo::FIRST
    }

    fn next_sequence(&self, current: CertificateNo) -> DomainResult<CertificateNo> {
        current.next()
    }

    fn sequence_of(&self, resource: &ShareAccount) -> CertificateNo {
        resource.certificate_no
    }

    fn find(
        &self,
        tx: &mut Tx,
        tenant_id: TenantId,
        owner: MemberId,
    ) -> Result<Option<ShareAccount>, StoreError> {
        tx.share_account_for(tenant_id, owner)
    }

    fn create(
        &self,
        hooks: &LedgerHooks,
        ctx: &mut LedgerHookContext<'_>,
        owner: MemberId,
        sequence: CertificateNo,
    ) -> Result<ShareAccount, EngineError> {
        let tenant_id = ctx.tenant_id();
        let mut account = ShareAccount::open(
            tenant_id,
            owner,
            sequence,
            ctx.user_id(),
            self.clock.now(tenant_id),
        );

        hooks.execute(HookPoint::OnValidate, &mut account, ctx)?;
        hooks.execute(HookPoint::BeforeCreate, &mut account, ctx)?;
        ctx.tx().insert_share_account(account.clone())?;
        hooks.execute(HookPoint::AfterCreate, &mut account, ctx)?;
        Ok(account)
    }
}

pub type ShareAccountProvisioner<S> = Provisioner<S, ShareAccountTarget>;

/// Envelope published on the bus after a purchase commits.
pub type SharesPurchasedEnvelope = EventEnvelope<SharesPurchased>;

/// Request to buy member shares, paid in cash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseShares {
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub units: u64,
    /// Price per unit in the smallest currency unit.
    pub unit_price: i64,
    /// Debited with the purchase amount.
    pub cash_account: AccountId,
    /// Credited with the purchase amount.
    pub share_capital_account: AccountId,
    pub acting_user: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePurchase {
    pub account: ShareAccount,
    pub entry: JournalEntry,
    pub amount: i64,
}

pub struct ShareService<S, B> {
    store: S,
    hooks: Arc<LedgerHooks>,
    poster: Arc<LedgerPoster<S>>,
    provisioner: Arc<ShareAccountProvisioner<S>>,
    bus: B,
}

impl<S, B> ShareService<S, B>
where
    S: LedgerStore,
    B: EventBus<SharesPurchasedEnvelope>,
{
    pub fn new(
        store: S,
        hooks: Arc<LedgerHooks>,
        poster: Arc<LedgerPoster<S>>,
        provisioner: Arc<ShareAccountProvisioner<S>>,
        bus: B,
    ) -> Self {
        Self {
            store,
            hooks,
            poster,
            provisioner,
            bus,
        }
    }

    /// Buy shares for a member in one unit of work.
    ///
    /// Ensures the member's share account, posts `debit cash / credit share capital` on
    /// the same transaction, and updates the running totals. `SharesPurchased` is
    /// published only after the commit; a publish failure leaves the purchase in place.
    #[instrument(
        skip_all,
        fields(tenant_id = %request.tenant_id, member_id = %request.member_id, units = request.units),
        err
    )]
    pub fn purchase_shares(&self, request: PurchaseShares) -> Result<SharePurchase, EngineError> {
        let PurchaseShares {
            tenant_id,
            member_id,
            units,
            unit_price,
            cash_account,
            share_capital_account,
            acting_user,
        } = request;

        if units == 0 || unit_price <= 0 {
            return Err(DomainError::validation("units and unit price must be positive").into());
        }

        let purchase = run_in_transaction(
            &self.store,
            "purchase_shares",
            |tx| -> Result<SharePurchase, EngineError> {
                let mut ctx = HookContext::new(tx, tenant_id, acting_user);

                let previous = self.provisioner.ensure_within(&mut ctx, member_id)?;
                let mut account = previous.clone();
                let amount = account.record_purchase(units, unit_price)?;

                let entry = self.poster.post_within(
                    &mut ctx,
                    format!("Share purchase {} x {units}", account.certificate_no),
                    vec![
                        LedgerLine::debit(cash_account, amount),
                        LedgerLine::credit(share_capital_account, amount),
                    ],
                )?;

                ctx.set_previous(previous);
                self.hooks.execute(HookPoint::BeforeUpdate, &mut account, &mut ctx)?;
                ctx.tx().update_share_account(account.clone())?;
                self.hooks.execute(HookPoint::AfterUpdate, &mut account, &mut ctx)?;
                ctx.clear_previous();

                Ok(SharePurchase {
                    account,
                    entry,
                    amount,
                })
            },
        )?;

        let event = SharesPurchased {
            tenant_id,
            share_account_id: purchase.account.id,
            member_id,
            certificate_no: purchase.account.certificate_no,
            units,
            amount: purchase.amount,
            journal_entry_id: purchase.entry.id,
            occurred_at: purchase.entry.date,
        };
        let envelope = EventEnvelope::new(
            tenant_id,
            ShareAccount::ENTITY_TYPE,
            purchase.account.entity_key(),
            acting_user,
            event,
        );

        self.bus
            .publish(envelope)
            .map_err(|err| EngineError::Publish(format!("{err:?}")))?;

        info!(
            tenant_id = %tenant_id,
            member_id = %member_id,
            certificate_no = %purchase.account.certificate_no,
            amount = purchase.amount,
            "shares purchased"
        );
        Ok(purchase)
    }
}
