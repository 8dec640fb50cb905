//! Startup wiring: one hook registry, shared by `Arc` with every service.

use std::sync::Arc;

use tracing::info;

use coopbooks_core::Clock;
use coopbooks_events::{EventBus, HookError};

use crate::chart::ChartOfAccountsService;
use crate::config::EngineConfig;
use crate::day_book::DayBookService;
use crate::hooks::{LedgerHooks, register_core_hooks};
use crate::posting::LedgerPoster;
use crate::provisioner::Provisioner;
use crate::share_accounts::{
    ShareAccountProvisioner, ShareAccountTarget, ShareService, SharesPurchasedEnvelope,
};
use crate::store::LedgerStore;

pub struct Engine<S, B> {
    config: EngineConfig,
    hooks: Arc<LedgerHooks>,
    poster: Arc<LedgerPoster<S>>,
    day_books: DayBookService<S>,
    chart: ChartOfAccountsService<S>,
    share_accounts: Arc<ShareAccountProvisioner<S>>,
    shares: ShareService<S, B>,
}

impl<S, B> Engine<S, B>
where
    S: LedgerStore + Clone,
    B: EventBus<SharesPurchasedEnvelope>,
{
    pub fn new(store: S, bus: B, clock: Arc<dyn Clock>, config: EngineConfig) -> Result<Self, HookError> {
        Self::with_hooks(store, bus, clock, config, |_| Ok(()))
    }

    /// Build the engine, letting `extend` register collaborator hooks after the core
    /// ones and before the registry is frozen behind an `Arc`.
    pub fn with_hooks(
        store: S,
        bus: B,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
        extend: impl FnOnce(&mut LedgerHooks) -> Result<(), HookError>,
    ) -> Result<Self, HookError> {
        let mut hooks = LedgerHooks::new();
        register_core_hooks(&mut hooks, &config, Arc::clone(&clock))?;
        extend(&mut hooks)?;
        let hooks = Arc::new(hooks);

        let poster = Arc::new(LedgerPoster::new(
            store.clone(),
            Arc::clone(&hooks),
            Arc::clone(&clock),
        ));
        let share_accounts = Arc::new(Provisioner::new(
            store.clone(),
            ShareAccountTarget::new(Arc::clone(&clock)),
            Arc::clone(&hooks),
            config.provisioner.clone(),
        ));
        let shares = ShareService::new(
            store.clone(),
            Arc::clone(&hooks),
            Arc::clone(&poster),
            Arc::clone(&share_accounts),
            bus,
        );
        let day_books = DayBookService::new(store.clone(), Arc::clone(&hooks), clock);
        let chart = ChartOfAccountsService::new(store, Arc::clone(&hooks));

        info!(registry = ?hooks, "posting engine ready");

        Ok(Self {
            config,
            hooks,
            poster,
            day_books,
            chart,
            share_accounts,
            shares,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hooks(&self) -> &Arc<LedgerHooks> {
        &self.hooks
    }

    pub fn poster(&self) -> &LedgerPoster<S> {
        &self.poster
    }

    pub fn day_books(&self) -> &DayBookService<S> {
        &self.day_books
    }

    pub fn chart(&self) -> &ChartOfAccountsService<S> {
        &self.chart
    }

    pub fn share_accounts(&self) -> &ShareAccountProvisioner<S> {
        &self.share_accounts
    }

    pub fn shares(&self) -> &ShareService<S, B> {
        &self.shares
    }
}
