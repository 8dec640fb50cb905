use serde::{Deserialize, Serialize};

use coopbooks_core::{AccountId, DomainError, DomainResult, TenantId};
use coopbooks_events::{EntityType, HookEntity};

/// High-level account kind (determines normal balance side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountKind {
    /// Assets and expenses grow on the debit side.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountKind::Asset | AccountKind::Expense)
    }
}

/// One entry of a tenant's chart of accounts.
///
/// `code` and `kind` form the account's ledger identity: once a ledger line references
/// the account they must not change (enforced by a `before_update` hook).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartOfAccount {
    pub id: AccountId,
    pub tenant_id: TenantId,
    pub code: String, // e.g. "1000"
    pub name: String, // e.g. "Cash"
    pub kind: AccountKind,
    pub is_active: bool,
}

impl ChartOfAccount {
    pub fn new(
        tenant_id: TenantId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: AccountKind,
    ) -> DomainResult<Self> {
        let account = Self {
            id: AccountId::new(),
            tenant_id,
            code: code.into().trim().to_string(),
            name: name.into().trim().to_string(),
            kind,
            is_active: true,
        };
        account.validate()?;
        Ok(account)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.code.is_empty() {
            return Err(DomainError::validation("account code is required"));
        }
        if self.name.is_empty() {
            return Err(DomainError::validation("account name is required"));
        }
        Ok(())
    }

    /// True when `other` changes the ledger identity (`code` or `kind`) of this account.
    pub fn identity_differs(&self, other: &ChartOfAccount) -> bool {
        self.code != other.code || self.kind != other.kind
    }

    /// New state after applying `changes`; `self` is left untouched as the prior snapshot.
    pub fn with_changes(&self, changes: &AccountChanges) -> DomainResult<ChartOfAccount> {
        let mut next = self.clone();
        if let Some(code) = &changes.code {
            next.code = code.trim().to_string();
        }
        if let Some(name) = &changes.name {
            next.name = name.trim().to_string();
        }
        if let Some(kind) = changes.kind {
            next.kind = kind;
        }
        if let Some(is_active) = changes.is_active {
            next.is_active = is_active;
        }
        next.validate()?;
        Ok(next)
    }
}

impl HookEntity for ChartOfAccount {
    const ENTITY_TYPE: EntityType = EntityType::ChartOfAccount;

    fn entity_key(&self) -> String {
        self.id.to_string()
    }
}

/// Partial update of a chart-of-accounts entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChanges {
    pub code: Option<String>,
    pub name: Option<String>,
    pub kind: Option<AccountKind>,
    pub is_active: Option<bool>,
}

impl AccountChanges {
    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(mut self, kind: AccountKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.name.is_none() && self.kind.is_none() && self.is_active.is_none()
    }
}
