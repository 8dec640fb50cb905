use chrono::{DateTime, Utc};

/// A domain event emitted by a caller of the posting engine after its unit of work
/// commits (e.g. "shares purchased"). Compliance consumers such as AML monitoring
/// subscribe to these; the engine itself never emits them.
///
/// Events are immutable facts and carry a schema version.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "shares.purchased").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the fact occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
