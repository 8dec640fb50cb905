//! Transactional persistence boundary for the posting engine.
//!
//! Every engine operation runs against a [`StoreTransaction`]: writes are staged on the
//! transaction and become visible to other transactions only on `commit`. Dropping a
//! transaction without committing rolls it back.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use r#trait::{AuditAction, AuditRecord, LedgerStore, StoreError, StoreTransaction, Tx};
