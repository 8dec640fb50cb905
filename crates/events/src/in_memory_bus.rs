//! Process-local event bus for tests, benches and single-node deployments.
//!
//! Envelopes are handed to every live subscription after the publishing unit of work
//! has committed. Delivery is at-least-once from the consumer's point of view: a caller
//! that retries a failed publish may deliver the same envelope twice, so consumers
//! deduplicate on `EventEnvelope::event_id`.

use std::sync::{Mutex, mpsc};

use thiserror::Error;
use tracing::debug;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

/// Fan-out over `mpsc` channels; a subscription whose receiver was dropped is forgotten
/// on the next publish.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;
        let before = subscribers.len();
        subscribers.retain(|sender| sender.send(message.clone()).is_ok());
        debug!(
            delivered = subscribers.len(),
            pruned = before - subscribers.len(),
            "event published"
        );
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (sender, receiver) = mpsc::channel();
        // A poisoned bus hands out a subscription that never receives anything; the
        // next publish reports the poisoning to the publisher.
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }
        Subscription::new(receiver)
    }
}
