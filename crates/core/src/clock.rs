//! Tenant-scoped wall-clock source.
//!
//! The posting engine never trusts caller-supplied posting times; it asks a `Clock`
//! for the current instant of the tenant it is posting for.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::id::TenantId;

pub trait Clock: Send + Sync {
    /// Current instant as observed for `tenant_id`.
    fn now(&self, tenant_id: TenantId) -> DateTime<Utc>;
}

/// System wall clock (UTC), identical for every tenant.
#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self, _tenant_id: TenantId) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests/dev.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self, _tenant_id: TenantId) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<C> Clock for std::sync::Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self, tenant_id: TenantId) -> DateTime<Utc> {
        (**self).now(tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_advances_on_demand() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let tenant = TenantId::new();

        assert_eq!(clock.now(tenant), start);
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(tenant), start + Duration::minutes(90));
    }
}
