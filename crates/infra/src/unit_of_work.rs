//! Unit-of-Work boundary.
//!
//! One logical operation runs inside exactly one store transaction. The transaction is
//! committed when the operation returns `Ok`; on `Err` or panic it is dropped, which
//! discards every staged write (including audit rows written by hooks).
//!
//! There are no nested transactions or savepoints. Composite operations pass the open
//! transaction down through the [`coopbooks_events::HookContext`] instead of calling
//! `run_in_transaction` again.

use tracing::{debug, info_span};

use crate::store::{LedgerStore, StoreError, Tx};

/// Run `operation` inside a fresh transaction of `store`.
///
/// Commit failures (unique or serialization conflicts) surface as `E::from(StoreError)`.
/// Nothing is retried here.
pub fn run_in_transaction<S, T, E, F>(store: &S, name: &'static str, operation: F) -> Result<T, E>
where
    S: LedgerStore + ?Sized,
    E: From<StoreError>,
    F: FnOnce(&mut Tx) -> Result<T, E>,
{
    let span = info_span!("unit_of_work", operation = name);
    let _entered = span.enter();

    let mut tx = store.begin()?;
    match operation(&mut *tx) {
        Ok(value) => {
            tx.commit()?;
            debug!("committed");
            Ok(value)
        }
        Err(err) => {
            drop(tx);
            debug!("rolled back");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coopbooks_accounting::{AccountKind, ChartOfAccount};
    use coopbooks_core::TenantId;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use crate::store::InMemoryLedgerStore;

    fn account(tenant_id: TenantId) -> ChartOfAccount {
        ChartOfAccount::new(tenant_id, "1000", "Cash", AccountKind::Asset).unwrap()
    }

    fn visible(store: &InMemoryLedgerStore, account: &ChartOfAccount) -> bool {
        let mut tx = store.begin().unwrap();
        tx.account(account.tenant_id, account.id).unwrap().is_some()
    }

    #[test]
    fn ok_commits() {
        let store = InMemoryLedgerStore::new();
        let acc = account(TenantId::new());

        let out: Result<u32, StoreError> = run_in_transaction(&store, "test", |tx| {
            tx.insert_account(acc.clone())?;
            Ok(7)
        });

        assert_eq!(out.unwrap(), 7);
        assert!(visible(&store, &acc));
    }

    #[test]
    fn err_rolls_back() {
        let store = InMemoryLedgerStore::new();
        let acc = account(TenantId::new());

        let out: Result<(), StoreError> = run_in_transaction(&store, "test", |tx| {
            tx.insert_account(acc.clone())?;
            Err(StoreError::SerializationConflict("forced".to_string()))
        });

        assert!(out.is_err());
        assert!(!visible(&store, &acc));
    }

    #[test]
    fn panic_rolls_back() {
        let store = InMemoryLedgerStore::new();
        let acc = account(TenantId::new());

        let result = catch_unwind(AssertUnwindSafe(|| {
            let _: Result<(), StoreError> = run_in_transaction(&store, "test", |tx| {
                tx.insert_account(acc.clone())?;
                panic!("handler blew up at {}", Utc::now());
            });
        }));

        assert!(result.is_err());
        assert!(!visible(&store, &acc));
    }
}
