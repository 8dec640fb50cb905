use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coopbooks_core::{
    DomainError, DomainResult, JournalEntryId, MemberId, ShareAccountId, TenantId, UserId,
};
use coopbooks_events::{EntityType, Event, HookEntity};

/// Per-tenant share certificate number. Unique within a tenant and never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateNo(pub u64);

impl CertificateNo {
    pub const FIRST: CertificateNo = CertificateNo(1);

    pub fn next(self) -> DomainResult<CertificateNo> {
        self.0
            .checked_add(1)
            .map(CertificateNo)
            .ok_or_else(|| DomainError::invariant("certificate sequence exhausted"))
    }
}

impl core::fmt::Display for CertificateNo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SC-{:06}", self.0)
    }
}

/// A member's share capital account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareAccount {
    pub id: ShareAccountId,
    pub tenant_id: TenantId,
    pub member_id: MemberId,
    pub certificate_no: CertificateNo,
    pub total_units: u64,
    /// Paid-in capital in the smallest currency unit.
    pub total_amount: i64,
    pub opened_by: UserId,
    pub opened_at: DateTime<Utc>,
}

impl ShareAccount {
    pub fn open(
        tenant_id: TenantId,
        member_id: MemberId,
        certificate_no: CertificateNo,
        opened_by: UserId,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ShareAccountId::new(),
            tenant_id,
            member_id,
            certificate_no,
            total_units: 0,
            total_amount: 0,
            opened_by,
            opened_at,
        }
    }

    /// Add `units` bought at `unit_price`; returns the purchase amount.
    ///
    /// Totals are only updated when the whole purchase fits.
    pub fn record_purchase(&mut self, units: u64, unit_price: i64) -> DomainResult<i64> {
        if units == 0 {
            return Err(DomainError::validation("units must be positive"));
        }
        if unit_price <= 0 {
            return Err(DomainError::validation("unit price must be positive"));
        }

        let amount = i64::try_from(units)
            .ok()
            .and_then(|u| u.checked_mul(unit_price))
            .ok_or_else(|| DomainError::validation("purchase amount overflows"))?;
        let total_units = self
            .total_units
            .checked_add(units)
            .ok_or_else(|| DomainError::validation("share unit total overflows"))?;
        let total_amount = self
            .total_amount
            .checked_add(amount)
            .ok_or_else(|| DomainError::validation("share capital total overflows"))?;

        self.total_units = total_units;
        self.total_amount = total_amount;
        Ok(amount)
    }
}

impl HookEntity for ShareAccount {
    const ENTITY_TYPE: EntityType = EntityType::ShareAccount;

    fn entity_key(&self) -> String {
        self.id.to_string()
    }
}

/// Event: shares purchased by a member. Published after the purchase commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharesPurchased {
    pub tenant_id: TenantId,
    pub share_account_id: ShareAccountId,
    pub member_id: MemberId,
    pub certificate_no: CertificateNo,
    pub units: u64,
    pub amount: i64,
    pub journal_entry_id: JournalEntryId,
    pub occurred_at: DateTime<Utc>,
}

impl Event for SharesPurchased {
    fn event_type(&self) -> &'static str {
        "shares.purchased"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
