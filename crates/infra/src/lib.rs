//! Infrastructure layer of the posting engine: transactional store, unit of work, core
//! lifecycle hooks, and the services built on them.

pub mod chart;
pub mod config;
pub mod day_book;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod posting;
pub mod provisioner;
pub mod share_accounts;
pub mod store;
pub mod unit_of_work;

pub use chart::ChartOfAccountsService;
pub use config::{AuditConfig, EngineConfig, HookPriorities, ProvisionerConfig};
pub use day_book::DayBookService;
pub use engine::Engine;
pub use error::EngineError;
pub use hooks::{LedgerHookContext, LedgerHooks, register_core_hooks};
pub use posting::{LedgerPoster, PostJournalEntry};
pub use provisioner::{
    OwnerDirectory, ProvisionFailure, ProvisionReport, ProvisionTarget, Provisioner,
};
pub use share_accounts::{
    PurchaseShares, ShareAccountProvisioner, ShareAccountTarget, SharePurchase, ShareService,
    SharesPurchasedEnvelope,
};
pub use store::{
    AuditAction, AuditRecord, InMemoryLedgerStore, LedgerStore, StoreError, StoreTransaction, Tx,
};
pub use unit_of_work::run_in_transaction;
