//! Idempotent per-owner resource provisioning.
//!
//! Guarantees at most one resource per `(tenant, owner)` under any interleaving of
//! concurrent callers:
//!
//! 1. Owners that already have a resource are filtered out with one read, outside the
//!    per-owner units of work.
//! 2. The starting sequence is the tenant's highest existing sequence + 1.
//! 3. Each remaining owner gets its own unit of work that re-checks existence before
//!    inserting, so a concurrent winner is skipped rather than duplicated.
//! 4. The store's unique constraints are the backstop. A commit they reject is retried
//!    up to `max_attempts`; the retry's re-check then sees the winner's row.
//!
//! A failure for one owner is recorded in the report and never aborts the others.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use coopbooks_core::{DomainError, DomainResult, TenantId, UserId};
use coopbooks_events::HookContext;

use crate::config::ProvisionerConfig;
use crate::error::EngineError;
use crate::hooks::{LedgerHookContext, LedgerHooks};
use crate::store::{LedgerStore, StoreError, Tx};
use crate::unit_of_work::run_in_transaction;

/// A kind of resource that exists at most once per owner and carries a per-tenant
/// monotonically assigned sequence.
pub trait ProvisionTarget: Send + Sync {
    type Owner: Copy + Eq + Hash + Display + Send + Sync;
    type Resource: Clone;
    type Sequence: Copy + Ord + Display;

    /// Name used in logs (e.g. "share_account").
    fn resource_name(&self) -> &'static str;

    /// Owners among `owners` that already have a resource.
    fn existing_owners(
        &self,
        tx: &mut Tx,
        tenant_id: TenantId,
        owners: &[Self::Owner],
    ) -> Result<HashSet<Self::Owner>, StoreError>;

    fn highest_sequence(
        &self,
        tx: &mut Tx,
        tenant_id: TenantId,
    ) -> Result<Option<Self::Sequence>, StoreError>;

    fn first_sequence(&self) -> Self::Sequence;

    fn next_sequence(&self, current: Self::Sequence) -> DomainResult<Self::Sequence>;

    fn sequence_of(&self, resource: &Self::Resource) -> Self::Sequence;

    fn find(
        &self,
        tx: &mut Tx,
        tenant_id: TenantId,
        owner: Self::Owner,
    ) -> Result<Option<Self::Resource>, StoreError>;

    /// Insert a new resource numbered `sequence`, running its creation hooks on `ctx`.
    fn create(
        &self,
        hooks: &LedgerHooks,
        ctx: &mut LedgerHookContext<'_>,
        owner: Self::Owner,
        sequence: Self::Sequence,
    ) -> Result<Self::Resource, EngineError>;
}

/// Source of the owners a reconciliation sweep should provision.
pub trait OwnerDirectory<O>: Send + Sync {
    fn eligible_owners(&self, tenant_id: TenantId) -> Result<Vec<O>, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionFailure<O> {
    pub owner: O,
    pub error: EngineError,
}

/// Outcome of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport<O, Q> {
    /// Owners provisioned by this run with their assigned sequence, in creation order.
    pub created: Vec<(O, Q)>,
    /// Owners found to already have a resource (by the pre-filter or the re-check).
    pub skipped: Vec<O>,
    pub failed: Vec<ProvisionFailure<O>>,
}

impl<O, Q> Default for ProvisionReport<O, Q> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<O, Q> ProvisionReport<O, Q> {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

enum Provisioned<R> {
    Existing(R),
    Created(R),
}

pub struct Provisioner<S, P> {
    store: S,
    target: P,
    hooks: Arc<LedgerHooks>,
    config: ProvisionerConfig,
}

impl<S, P> Provisioner<S, P>
where
    S: LedgerStore,
    P: ProvisionTarget,
{
    pub fn new(store: S, target: P, hooks: Arc<LedgerHooks>, config: ProvisionerConfig) -> Self {
        Self {
            store,
            target,
            hooks,
            config,
        }
    }

    pub fn target(&self) -> &P {
        &self.target
    }

    /// Create the resource for every owner in `owners` that lacks one.
    #[instrument(
        skip_all,
        fields(tenant_id = %tenant_id, resource = self.target.resource_name(), owners = owners.len()),
        err
    )]
    pub fn provision_missing(
        &self,
        tenant_id: TenantId,
        owners: &[P::Owner],
        acting_user: UserId,
    ) -> Result<ProvisionReport<P::Owner, P::Sequence>, EngineError> {
        let mut seen = HashSet::with_capacity(owners.len());
        let owners: Vec<P::Owner> = owners.iter().copied().filter(|o| seen.insert(*o)).collect();

        let (existing, highest) = {
            // Read-only; never committed.
            let mut snapshot = self.store.begin()?;
            (
                self.target.existing_owners(&mut *snapshot, tenant_id, &owners)?,
                self.target.highest_sequence(&mut *snapshot, tenant_id)?,
            )
        };

        let mut next = match highest {
            Some(highest) => self.target.next_sequence(highest)?,
            None => self.target.first_sequence(),
        };

        let mut report = ProvisionReport::default();
        let mut exhausted: Option<DomainError> = None;
        for owner in owners {
            if existing.contains(&owner) {
                report.skipped.push(owner);
                continue;
            }
            if let Some(err) = &exhausted {
                report.failed.push(ProvisionFailure {
                    owner,
                    error: err.clone().into(),
                });
                continue;
            }

            let floor = next;
            let outcome = self.with_retry("provision_owner", tenant_id, acting_user, |ctx| {
                self.find_or_create(ctx, owner, Some(floor))
            });

            match outcome {
                Ok(Provisioned::Created(resource)) => {
                    let sequence = self.target.sequence_of(&resource);
                    report.created.push((owner, sequence));
                    match self.target.next_sequence(sequence) {
                        Ok(following) => next = following,
                        Err(err) => {
                            warn!(error = %err, "sequence exhausted; remaining owners fail");
                            exhausted = Some(err);
                        }
                    }
                }
                Ok(Provisioned::Existing(_)) => report.skipped.push(owner),
                Err(error) => {
                    warn!(
                        tenant_id = %tenant_id,
                        owner = %owner,
                        resource = self.target.resource_name(),
                        error = %error,
                        "provisioning failed for owner"
                    );
                    report.failed.push(ProvisionFailure { owner, error });
                }
            }
        }

        info!(
            tenant_id = %tenant_id,
            resource = self.target.resource_name(),
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "provisioning finished"
        );
        Ok(report)
    }

    /// Return the owner's resource, creating it in its own unit of work if missing.
    pub fn ensure(
        &self,
        tenant_id: TenantId,
        owner: P::Owner,
        acting_user: UserId,
    ) -> Result<P::Resource, EngineError> {
        let outcome = self.with_retry("ensure_resource", tenant_id, acting_user, |ctx| {
            self.find_or_create(ctx, owner, None)
        })?;
        Ok(match outcome {
            Provisioned::Existing(resource) | Provisioned::Created(resource) => resource,
        })
    }

    /// Like [`Self::ensure`], on the caller's transaction.
    ///
    /// Not retried: a unique violation surfaces on the caller's commit.
    pub fn ensure_within(
        &self,
        ctx: &mut LedgerHookContext<'_>,
        owner: P::Owner,
    ) -> Result<P::Resource, EngineError> {
        Ok(match self.find_or_create(ctx, owner, None)? {
            Provisioned::Existing(resource) | Provisioned::Created(resource) => resource,
        })
    }

    /// Provision every owner the directory lists as eligible.
    pub fn reconcile(
        &self,
        tenant_id: TenantId,
        directory: &dyn OwnerDirectory<P::Owner>,
        acting_user: UserId,
    ) -> Result<ProvisionReport<P::Owner, P::Sequence>, EngineError> {
        let owners = directory.eligible_owners(tenant_id)?;
        debug!(tenant_id = %tenant_id, owners = owners.len(), "reconciliation sweep");
        self.provision_missing(tenant_id, &owners, acting_user)
    }

    /// Existence re-check and insert, inside one transaction.
    ///
    /// The sequence is at least `floor` and above anything this transaction can see.
    fn find_or_create(
        &self,
        ctx: &mut LedgerHookContext<'_>,
        owner: P::Owner,
        floor: Option<P::Sequence>,
    ) -> Result<Provisioned<P::Resource>, EngineError> {
        let tenant_id = ctx.tenant_id();
        if let Some(resource) = self.target.find(ctx.tx(), tenant_id, owner)? {
            return Ok(Provisioned::Existing(resource));
        }

        let visible_next = match self.target.highest_sequence(ctx.tx(), tenant_id)? {
            Some(highest) => self.target.next_sequence(highest)?,
            None => self.target.first_sequence(),
        };
        let sequence = match floor {
            Some(floor) => floor.max(visible_next),
            None => visible_next,
        };

        let resource = self.target.create(&self.hooks, ctx, owner, sequence)?;
        debug!(
            tenant_id = %tenant_id,
            owner = %owner,
            sequence = %sequence,
            resource = self.target.resource_name(),
            "resource created"
        );
        Ok(Provisioned::Created(resource))
    }

    /// Run `body` in a fresh unit of work, retrying when a unique constraint rejects
    /// the commit.
    fn with_retry<T>(
        &self,
        operation: &'static str,
        tenant_id: TenantId,
        acting_user: UserId,
        body: impl Fn(&mut LedgerHookContext<'_>) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = run_in_transaction(&self.store, operation, |tx| -> Result<T, EngineError> {
                let mut ctx = HookContext::new(tx, tenant_id, acting_user);
                body(&mut ctx)
            });

            match result {
                Err(EngineError::Store(err)) if err.is_unique_violation() && attempt < max_attempts => {
                    debug!(operation, attempt, error = %err, "commit rejected by unique constraint; retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
