//! Audit-trail hooks.
//!
//! Writes one [`AuditRecord`] per create/update through the operation's own transaction,
//! so a failure later in the unit of work discards the audit row with everything else.

use std::sync::Arc;

use serde::Serialize;

use coopbooks_core::{AuditRecordId, Clock};
use coopbooks_events::{HookEntity, HookError, HookPoint};

use super::{LedgerHookContext, LedgerHooks};
use crate::error::EngineError;
use crate::store::{AuditAction, AuditRecord};

pub fn register_for<T>(hooks: &mut LedgerHooks, clock: Arc<dyn Clock>, priority: i32) -> Result<(), HookError>
where
    T: HookEntity + Serialize,
{
    for (point, action) in [
        (HookPoint::AfterCreate, AuditAction::Create),
        (HookPoint::AfterUpdate, AuditAction::Update),
    ] {
        let clock = Arc::clone(&clock);
        hooks.register::<T, _>(
            point,
            priority,
            format!("audit_{}", action.as_str()),
            move |payload, ctx| record(clock.as_ref(), action, payload, ctx),
        )?;
    }
    Ok(())
}

fn record<T>(
    clock: &dyn Clock,
    action: AuditAction,
    payload: &T,
    ctx: &mut LedgerHookContext<'_>,
) -> Result<(), EngineError>
where
    T: HookEntity + Serialize,
{
    let snapshot =
        serde_json::to_value(payload).map_err(|e| EngineError::Serialization(e.to_string()))?;
    let tenant_id = ctx.tenant_id();

    let record = AuditRecord {
        id: AuditRecordId::new(),
        tenant_id,
        entity_type: T::ENTITY_TYPE,
        entity_key: payload.entity_key(),
        action,
        actor: ctx.user_id(),
        at: clock.now(tenant_id),
        snapshot,
    };
    ctx.tx().insert_audit_record(record)?;
    Ok(())
}
