use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coopbooks_core::{TenantId, UserId};

use crate::event::Event;
use crate::hook::EntityType;

/// Tenant-scoped wrapper published on an [`crate::EventBus`].
///
/// `entity_type` + `entity_key` identify the record the event is about, so consumers can
/// correlate it with audit trail entries written inside the unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: TenantId,
    entity_type: EntityType,
    entity_key: String,
    actor: UserId,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E: Event> EventEnvelope<E> {
    pub fn new(
        tenant_id: TenantId,
        entity_type: EntityType,
        entity_key: impl Into<String>,
        actor: UserId,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            entity_type,
            entity_key: entity_key.into(),
            actor,
            event_type: payload.event_type().to_string(),
            occurred_at: payload.occurred_at(),
            payload,
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn entity_key(&self) -> &str {
        &self.entity_key
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
