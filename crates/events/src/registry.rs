//! Hook registry and sequential dispatcher.
//!
//! A `HookRegistry` is built once at startup, populated by every component that wants to
//! attach behavior, and then shared (typically behind an `Arc`) with the services that
//! execute hooks. There is no process-wide registry.
//!
//! ## Ordering
//!
//! Handlers for one `(entity type, hook point)` pair run in ascending `priority`; ties are
//! broken by registration order. Execution is strictly sequential and every handler sees
//! the payload mutations of the handlers before it.
//!
//! ## Failure
//!
//! The first handler error stops the chain and is returned verbatim. The dispatcher never
//! retries and never continues past a failure; the caller is expected to abort its unit
//! of work.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;

use serde::Serialize;
use tracing::{debug, warn};

use crate::context::HookContext;
use crate::hook::{EntityType, HookEntity, HookError, HookPoint};

/// Diagnostic view of one registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookDescriptor {
    pub name: String,
    pub priority: i32,
    /// Global registration order (tie-breaker for equal priorities).
    pub sequence: u64,
}

struct RegisteredHook<T: 'static, Tx: ?Sized + 'static, E: 'static> {
    descriptor: HookDescriptor,
    handler: Box<dyn Fn(&mut T, &mut HookContext<'_, Tx>) -> Result<(), E> + Send + Sync>,
}

struct HookChain<T: 'static, Tx: ?Sized + 'static, E: 'static> {
    hooks: Vec<RegisteredHook<T, Tx, E>>,
}

impl<T: 'static, Tx: ?Sized + 'static, E: 'static> HookChain<T, Tx, E> {
    fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    fn insert(&mut self, hook: RegisteredHook<T, Tx, E>) {
        // Sequences only grow, so inserting after every hook with priority <= ours keeps
        // (priority, sequence) ordering.
        let priority = hook.descriptor.priority;
        let pos = self
            .hooks
            .partition_point(|h| h.descriptor.priority <= priority);
        self.hooks.insert(pos, hook);
    }
}

/// Type-erased chain so chains for different payload types share one map.
trait ErasedChain: Send + Sync {
    fn descriptors(&self) -> Vec<HookDescriptor>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T, Tx, E> ErasedChain for HookChain<T, Tx, E>
where
    T: 'static,
    Tx: ?Sized + 'static,
    E: 'static,
{
    fn descriptors(&self) -> Vec<HookDescriptor> {
        self.hooks.iter().map(|h| h.descriptor.clone()).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry of lifecycle handlers, keyed by entity type and hook point.
///
/// `Tx` is the transaction handle carried by [`HookContext`]; `E` is the error type
/// handlers return (it must be able to represent [`HookError`]).
pub struct HookRegistry<Tx: ?Sized, E> {
    chains: HashMap<(EntityType, HookPoint), Box<dyn ErasedChain>>,
    payload_types: HashMap<EntityType, (TypeId, &'static str)>,
    next_sequence: u64,
    _marker: PhantomData<fn(&mut Tx) -> E>,
}

impl<Tx: ?Sized, E> Default for HookRegistry<Tx, E> {
    fn default() -> Self {
        Self {
            chains: HashMap::new(),
            payload_types: HashMap::new(),
            next_sequence: 0,
            _marker: PhantomData,
        }
    }
}

impl<Tx: ?Sized, E> core::fmt::Debug for HookRegistry<Tx, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut keys: Vec<_> = self.chains.keys().collect();
        keys.sort();
        f.debug_struct("HookRegistry")
            .field("chains", &keys)
            .field("registered", &self.next_sequence)
            .finish()
    }
}

impl<Tx, E> HookRegistry<Tx, E>
where
    Tx: ?Sized + 'static,
    E: 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` to `point` of the entity type bound to `T`.
    ///
    /// Lower `priority` runs first. `name` is for diagnostics only; it does not affect
    /// dispatch, and duplicate names are allowed.
    pub fn register<T, F>(
        &mut self,
        point: HookPoint,
        priority: i32,
        name: impl Into<String>,
        handler: F,
    ) -> Result<(), HookError>
    where
        T: HookEntity,
        F: Fn(&mut T, &mut HookContext<'_, Tx>) -> Result<(), E> + Send + Sync + 'static,
    {
        self.bind_payload_type::<T>()?;

        let descriptor = HookDescriptor {
            name: name.into(),
            priority,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;

        let chain = self
            .chains
            .entry((T::ENTITY_TYPE, point))
            .or_insert_with(|| Box::new(HookChain::<T, Tx, E>::new()) as Box<dyn ErasedChain>);

        let chain = chain
            .as_any_mut()
            .downcast_mut::<HookChain<T, Tx, E>>()
            .ok_or_else(|| conflict::<T>(T::ENTITY_TYPE, "<unknown>"))?;

        debug!(
            entity_type = %T::ENTITY_TYPE,
            hook_point = %point,
            hook = %descriptor.name,
            priority,
            "hook registered"
        );

        chain.insert(RegisteredHook {
            descriptor,
            handler: Box::new(handler),
        });

        Ok(())
    }

    /// Run every handler registered for `(T::ENTITY_TYPE, point)`, in order.
    ///
    /// A pair without handlers is a no-op.
    pub fn execute<T>(
        &self,
        point: HookPoint,
        payload: &mut T,
        ctx: &mut HookContext<'_, Tx>,
    ) -> Result<(), E>
    where
        T: HookEntity,
        E: From<HookError> + core::fmt::Display,
    {
        let Some(chain) = self.chains.get(&(T::ENTITY_TYPE, point)) else {
            return Ok(());
        };

        let chain = match chain.as_any().downcast_ref::<HookChain<T, Tx, E>>() {
            Some(chain) => chain,
            None => {
                let registered = self
                    .payload_types
                    .get(&T::ENTITY_TYPE)
                    .map(|(_, name)| *name)
                    .unwrap_or("<unknown>");
                return Err(conflict::<T>(T::ENTITY_TYPE, registered).into());
            }
        };

        for hook in &chain.hooks {
            debug!(
                entity_type = %T::ENTITY_TYPE,
                hook_point = %point,
                hook = %hook.descriptor.name,
                priority = hook.descriptor.priority,
                "running hook"
            );

            if let Err(err) = (hook.handler)(payload, ctx) {
                warn!(
                    entity_type = %T::ENTITY_TYPE,
                    hook_point = %point,
                    hook = %hook.descriptor.name,
                    tenant_id = %ctx.tenant_id(),
                    error = %err,
                    "hook failed; aborting chain"
                );
                return Err(err);
            }
        }

        Ok(())
    }

    /// Handlers registered for a pair, in execution order.
    pub fn handlers(&self, entity_type: EntityType, point: HookPoint) -> Vec<HookDescriptor> {
        self.chains
            .get(&(entity_type, point))
            .map(|chain| chain.descriptors())
            .unwrap_or_default()
    }

    fn bind_payload_type<T: HookEntity>(&mut self) -> Result<(), HookError> {
        let attempted = TypeId::of::<T>();
        match self.payload_types.get(&T::ENTITY_TYPE) {
            Some((registered, _)) if *registered == attempted => Ok(()),
            Some((_, registered_name)) => Err(conflict::<T>(T::ENTITY_TYPE, *registered_name)),
            None => {
                self.payload_types
                    .insert(T::ENTITY_TYPE, (attempted, type_name::<T>()));
                Ok(())
            }
        }
    }
}

fn conflict<T>(entity_type: EntityType, registered: &'static str) -> HookError {
    HookError::PayloadTypeConflict {
        entity_type,
        registered,
        attempted: type_name::<T>(),
    }
}
