//! `coopbooks-events`: entity lifecycle hooks and domain-event mechanics.
//!
//! - **Hooks**: a registry of prioritized, typed handlers attached to lifecycle points of
//!   the closed set of hookable entities, executed sequentially inside one unit of work.
//! - **Domain events**: envelopes and a pub/sub bus used by callers of the posting engine
//!   to announce committed facts.

pub mod bus;
pub mod context;
pub mod envelope;
pub mod event;
pub mod hook;
pub mod in_memory_bus;
pub mod registry;

pub use bus::{EventBus, Subscription};
pub use context::HookContext;
pub use envelope::EventEnvelope;
pub use event::Event;
pub use hook::{EntityType, HookEntity, HookError, HookPoint};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
pub use registry::{HookDescriptor, HookRegistry};
