//! Day-book lifecycle service: day begin, end-of-day start, day close.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, instrument};

use coopbooks_accounting::DayBook;
use coopbooks_core::{Clock, DomainError, DomainResult, TenantId, UserId};
use coopbooks_events::{HookContext, HookPoint};

use crate::error::EngineError;
use crate::hooks::LedgerHooks;
use crate::store::LedgerStore;
use crate::unit_of_work::run_in_transaction;

pub struct DayBookService<S> {
    store: S,
    hooks: Arc<LedgerHooks>,
    clock: Arc<dyn Clock>,
}

impl<S> DayBookService<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, hooks: Arc<LedgerHooks>, clock: Arc<dyn Clock>) -> Self {
        Self { store, hooks, clock }
    }

    /// Open `date` for postings.
    ///
    /// Fails with `Conflict` while another day is still open or in end-of-day, and with
    /// `Validation` unless `date` is later than every previous business date.
    #[instrument(skip_all, fields(tenant_id = %tenant_id, date = %date), err)]
    pub fn begin_day(
        &self,
        tenant_id: TenantId,
        date: NaiveDate,
        acting_user: UserId,
    ) -> Result<DayBook, EngineError> {
        run_in_transaction(&self.store, "begin_day", |tx| -> Result<DayBook, EngineError> {
            if let Some(active) = tx.active_day_book(tenant_id)? {
                return Err(DomainError::conflict(format!(
                    "day-book {} is still {}",
                    active.date, active.status
                ))
                .into());
            }
            if let Some(latest) = tx.latest_day_book(tenant_id)? {
                if date <= latest.date {
                    return Err(DomainError::validation(format!(
                        "business date {date} must follow {}",
                        latest.date
                    ))
                    .into());
                }
            }

            let mut day = DayBook::open(tenant_id, date, acting_user, self.clock.now(tenant_id));
            let mut ctx = HookContext::new(tx, tenant_id, acting_user);

            self.hooks.execute(HookPoint::OnValidate, &mut day, &mut ctx)?;
            self.hooks.execute(HookPoint::BeforeCreate, &mut day, &mut ctx)?;
            ctx.tx().insert_day_book(day.clone())?;
            self.hooks.execute(HookPoint::AfterCreate, &mut day, &mut ctx)?;

            info!(tenant_id = %tenant_id, date = %day.date, "day opened");
            Ok(day)
        })
    }

    /// `OPEN -> EOD_IN_PROGRESS`. Postings are refused from here on.
    #[instrument(skip_all, fields(tenant_id = %tenant_id), err)]
    pub fn start_end_of_day(
        &self,
        tenant_id: TenantId,
        acting_user: UserId,
    ) -> Result<DayBook, EngineError> {
        self.transition(tenant_id, acting_user, "start_end_of_day", DayBook::start_end_of_day)
    }

    /// `EOD_IN_PROGRESS -> CLOSED`.
    #[instrument(skip_all, fields(tenant_id = %tenant_id), err)]
    pub fn close_day(&self, tenant_id: TenantId, acting_user: UserId) -> Result<DayBook, EngineError> {
        self.transition(tenant_id, acting_user, "close_day", DayBook::close)
    }

    /// The tenant's open or in-end-of-day day-book.
    pub fn current_day(&self, tenant_id: TenantId) -> Result<Option<DayBook>, EngineError> {
        let mut tx = self.store.begin()?;
        Ok(tx.active_day_book(tenant_id)?)
    }

    fn transition(
        &self,
        tenant_id: TenantId,
        acting_user: UserId,
        operation: &'static str,
        step: fn(&mut DayBook, DateTime<Utc>) -> DomainResult<()>,
    ) -> Result<DayBook, EngineError> {
        run_in_transaction(&self.store, operation, |tx| -> Result<DayBook, EngineError> {
            let previous = tx
                .active_day_book(tenant_id)?
                .ok_or(DomainError::DayNotOpen)?;

            let mut day = previous.clone();
            step(&mut day, self.clock.now(tenant_id))?;

            let mut ctx = HookContext::new(tx, tenant_id, acting_user).with_previous(previous);
            self.hooks.execute(HookPoint::BeforeUpdate, &mut day, &mut ctx)?;
            ctx.tx().update_day_book(day.clone())?;
            self.hooks.execute(HookPoint::AfterUpdate, &mut day, &mut ctx)?;

            info!(tenant_id = %tenant_id, date = %day.date, status = %day.status, "day-book transitioned");
            Ok(day)
        })
    }
}
