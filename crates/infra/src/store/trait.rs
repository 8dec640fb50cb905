use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use coopbooks_accounting::{ChartOfAccount, DayBook, JournalEntry};
use coopbooks_core::{AccountId, AuditRecordId, JournalEntryId, MemberId, TenantId, UserId};
use coopbooks_events::EntityType;
use coopbooks_shares::{CertificateNo, ShareAccount};

/// Store operation error.
///
/// These are infrastructure errors (constraints, isolation, poisoning) as opposed to
/// domain errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the commit.
    #[error("unique constraint '{constraint}' violated: {detail}")]
    UniqueViolation {
        constraint: &'static str,
        detail: String,
    },

    /// A row this transaction read was changed by a concurrent commit.
    #[error("serialization conflict: {0}")]
    SerializationConflict(String),

    /// An update targeted a row that does not exist.
    #[error("{table} row {key} not found")]
    RowNotFound { table: &'static str, key: String },

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
        }
    }
}

/// One audit-trail row, written by an audit hook inside the same transaction as the
/// change it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub tenant_id: TenantId,
    pub entity_type: EntityType,
    pub entity_key: String,
    pub action: AuditAction,
    pub actor: UserId,
    pub at: DateTime<Utc>,
    pub snapshot: JsonValue,
}

/// An open unit of work against the ledger store.
///
/// All reads observe committed data plus this transaction's own staged writes. Every
/// query is tenant-scoped. Unique constraints are checked on `commit`, which is the only
/// way to make writes durable; dropping the transaction discards them.
pub trait StoreTransaction: Send {
    // Day-books.

    /// The tenant's day-book that is `OPEN` or `EOD_IN_PROGRESS`, if any.
    fn active_day_book(&mut self, tenant_id: TenantId) -> Result<Option<DayBook>, StoreError>;

    /// The tenant's day-book with the latest business date, whatever its status.
    fn latest_day_book(&mut self, tenant_id: TenantId) -> Result<Option<DayBook>, StoreError>;

    fn insert_day_book(&mut self, day_book: DayBook) -> Result<(), StoreError>;

    fn update_day_book(&mut self, day_book: DayBook) -> Result<(), StoreError>;

    // Chart of accounts.

    fn account(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<ChartOfAccount>, StoreError>;

    /// All accounts of the tenant, ordered by code.
    fn accounts(&mut self, tenant_id: TenantId) -> Result<Vec<ChartOfAccount>, StoreError>;

    fn insert_account(&mut self, account: ChartOfAccount) -> Result<(), StoreError>;

    fn update_account(&mut self, account: ChartOfAccount) -> Result<(), StoreError>;

    // Journal.

    /// Next entry number from the tenant's sequence.
    ///
    /// Like a database sequence, this is not transactional: numbers taken by a rolled
    /// back transaction are not reused.
    fn next_entry_number(&mut self, tenant_id: TenantId) -> Result<u64, StoreError>;

    fn journal_entry(
        &mut self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError>;

    /// All entries of the tenant, ordered by entry number.
    fn journal_entries(&mut self, tenant_id: TenantId) -> Result<Vec<JournalEntry>, StoreError>;

    /// Insert an entry together with its lines.
    fn insert_journal_entry(&mut self, entry: JournalEntry) -> Result<(), StoreError>;

    /// Number of ledger lines referencing `account_id`.
    fn count_ledger_lines(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<u64, StoreError>;

    // Share accounts.

    fn share_account_for(
        &mut self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<Option<ShareAccount>, StoreError>;

    /// Share accounts of the tenant owned by any of `members`.
    fn share_accounts_for(
        &mut self,
        tenant_id: TenantId,
        members: &[MemberId],
    ) -> Result<Vec<ShareAccount>, StoreError>;

    fn highest_certificate_no(
        &mut self,
        tenant_id: TenantId,
    ) -> Result<Option<CertificateNo>, StoreError>;

    fn insert_share_account(&mut self, account: ShareAccount) -> Result<(), StoreError>;

    fn update_share_account(&mut self, account: ShareAccount) -> Result<(), StoreError>;

    // Audit trail.

    fn insert_audit_record(&mut self, record: AuditRecord) -> Result<(), StoreError>;

    fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Transaction handle type carried by hook contexts.
pub type Tx = dyn StoreTransaction;

/// Factory for transactions.
pub trait LedgerStore: Send + Sync {
    fn begin(&self) -> Result<Box<Tx>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn begin(&self) -> Result<Box<Tx>, StoreError> {
        (**self).begin()
    }
}
