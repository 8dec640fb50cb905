//! Per-operation hook context.

use std::any::Any;
use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use coopbooks_core::{TenantId, UserId};

/// Everything a hook handler may need besides the payload itself.
///
/// A context lives exactly as long as one unit of work. It carries the *same*
/// transaction handle every handler must use, so a handler never opens a transaction of
/// its own and a composite operation threads one context through its inner steps.
///
/// `Tx` is the transaction handle type chosen by the persistence layer.
pub struct HookContext<'a, Tx: ?Sized> {
    tx: &'a mut Tx,
    tenant_id: TenantId,
    user_id: UserId,
    previous: Option<Box<dyn Any + Send>>,
    metadata: BTreeMap<String, JsonValue>,
}

impl<'a, Tx: ?Sized> HookContext<'a, Tx> {
    pub fn new(tx: &'a mut Tx, tenant_id: TenantId, user_id: UserId) -> Self {
        Self {
            tx,
            tenant_id,
            user_id,
            previous: None,
            metadata: BTreeMap::new(),
        }
    }

    /// The active transaction handle.
    pub fn tx(&mut self) -> &mut Tx {
        &mut *self.tx
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Attach the prior state of the entity being updated or deleted.
    pub fn with_previous<T: Any + Send>(mut self, snapshot: T) -> Self {
        self.set_previous(snapshot);
        self
    }

    pub fn set_previous<T: Any + Send>(&mut self, snapshot: T) {
        self.previous = Some(Box::new(snapshot));
    }

    pub fn clear_previous(&mut self) {
        self.previous = None;
    }

    /// Prior state snapshot, if one of type `T` was attached.
    pub fn previous<T: Any>(&self) -> Option<&T> {
        self.previous.as_deref()?.downcast_ref::<T>()
    }

    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn metadata(&self, key: &str) -> Option<&JsonValue> {
        self.metadata.get(key)
    }

    pub fn metadata_entries(&self) -> &BTreeMap<String, JsonValue> {
        &self.metadata
    }
}

impl<Tx: ?Sized> core::fmt::Debug for HookContext<'_, Tx> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookContext")
            .field("tenant_id", &self.tenant_id)
            .field("user_id", &self.user_id)
            .field("has_previous", &self.previous.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}
