use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use chrono::NaiveDate;
use tracing::debug;

use coopbooks_accounting::{ChartOfAccount, DayBook, DayBookStatus, JournalEntry};
use coopbooks_core::{AccountId, JournalEntryId, MemberId, ShareAccountId, TenantId};
use coopbooks_shares::{CertificateNo, ShareAccount};

use super::r#trait::{AuditRecord, LedgerStore, StoreError, StoreTransaction, Tx};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct DayKey {
    tenant_id: TenantId,
    date: NaiveDate,
}

impl DayKey {
    fn of(day_book: &DayBook) -> Self {
        Self {
            tenant_id: day_book.tenant_id,
            date: day_book.date,
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    day_books: HashMap<DayKey, DayBook>,
    accounts: HashMap<AccountId, ChartOfAccount>,
    journal_entries: HashMap<JournalEntryId, JournalEntry>,
    share_accounts: HashMap<ShareAccountId, ShareAccount>,
    audit_records: Vec<AuditRecord>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    entry_sequences: Mutex<HashMap<TenantId, u64>>,
}

/// In-memory transactional ledger store.
///
/// Intended for tests/dev. Committed state lives behind one `RwLock`; each transaction
/// stages its writes privately and applies them under the write lock on commit, after
/// checking unique constraints and re-checking the day-book rows, accounts and
/// ledger-line counts it read.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    shared: Arc<Shared>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.shared.tables.read().map_err(|_| StoreError::Poisoned)
    }

    /// Committed audit trail of a tenant, in write order.
    pub fn audit_records(&self, tenant_id: TenantId) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self
            .tables()?
            .audit_records
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    /// Number of committed journal entries of a tenant.
    pub fn journal_entry_count(&self, tenant_id: TenantId) -> Result<usize, StoreError> {
        Ok(self
            .tables()?
            .journal_entries
            .values()
            .filter(|e| e.tenant_id == tenant_id)
            .count())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn begin(&self) -> Result<Box<Tx>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            shared: Arc::clone(&self.shared),
            staged: Staged::default(),
            day_book_reads: HashMap::new(),
            account_reads: HashMap::new(),
            line_count_reads: HashMap::new(),
        }))
    }
}

/// Staged row write.
#[derive(Debug, Clone)]
enum Write<T> {
    Insert(T),
    Update(T),
}

impl<T> Write<T> {
    fn row(&self) -> &T {
        match self {
            Write::Insert(row) | Write::Update(row) => row,
        }
    }

    fn into_row(self) -> T {
        match self {
            Write::Insert(row) | Write::Update(row) => row,
        }
    }

    fn is_insert(&self) -> bool {
        matches!(self, Write::Insert(_))
    }
}

#[derive(Debug, Default)]
struct Staged {
    day_books: HashMap<DayKey, Write<DayBook>>,
    accounts: HashMap<AccountId, Write<ChartOfAccount>>,
    journal_entries: Vec<JournalEntry>,
    share_accounts: HashMap<ShareAccountId, Write<ShareAccount>>,
    audit_records: Vec<AuditRecord>,
}

struct InMemoryTransaction {
    shared: Arc<Shared>,
    staged: Staged,
    /// Status of committed day-book rows as first read by this transaction.
    day_book_reads: HashMap<DayKey, DayBookStatus>,
    /// Committed account rows as first read (`None`: absent when read).
    account_reads: HashMap<AccountId, Option<ChartOfAccount>>,
    /// Committed ledger-line counts per account as first read.
    line_count_reads: HashMap<(TenantId, AccountId), u64>,
}

impl InMemoryTransaction {
    fn tables(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.shared.tables.read().map_err(|_| StoreError::Poisoned)
    }

    /// Committed rows overlaid with this transaction's staged rows.
    fn visible_day_books(&self, tenant_id: TenantId) -> Result<Vec<(DayKey, DayBook, bool)>, StoreError> {
        let tables = self.tables()?;
        let mut rows: HashMap<DayKey, (DayBook, bool)> = tables
            .day_books
            .iter()
            .filter(|(key, _)| key.tenant_id == tenant_id)
            .map(|(key, day)| (*key, (day.clone(), true)))
            .collect();
        for (key, write) in &self.staged.day_books {
            if key.tenant_id == tenant_id {
                rows.insert(*key, (write.row().clone(), false));
            }
        }
        Ok(rows
            .into_iter()
            .map(|(key, (day, committed))| (key, day, committed))
            .collect())
    }

    fn visible_journal_entries(&self, tenant_id: TenantId) -> Result<Vec<JournalEntry>, StoreError> {
        let tables = self.tables()?;
        let mut entries: Vec<JournalEntry> = tables
            .journal_entries
            .values()
            .filter(|e| e.tenant_id == tenant_id)
            .cloned()
            .collect();
        entries.extend(
            self.staged
                .journal_entries
                .iter()
                .filter(|e| e.tenant_id == tenant_id)
                .cloned(),
        );
        entries.sort_by_key(|e| e.entry_number);
        Ok(entries)
    }

    fn visible_share_accounts(&self, tenant_id: TenantId) -> Result<Vec<ShareAccount>, StoreError> {
        let tables = self.tables()?;
        let mut rows: HashMap<ShareAccountId, ShareAccount> = tables
            .share_accounts
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .map(|a| (a.id, a.clone()))
            .collect();
        for write in self.staged.share_accounts.values() {
            let row = write.row();
            if row.tenant_id == tenant_id {
                rows.insert(row.id, row.clone());
            }
        }
        Ok(rows.into_values().collect())
    }

    fn record_read(&mut self, key: DayKey, status: DayBookStatus) {
        self.day_book_reads.entry(key).or_insert(status);
    }

    /// Every committed row this transaction based a decision on must be unchanged.
    fn check_reads(&self, tables: &Tables) -> Result<(), StoreError> {
        for (key, seen) in &self.day_book_reads {
            let current = tables.day_books.get(key).map(|d| d.status);
            if current != Some(*seen) {
                return Err(StoreError::SerializationConflict(format!(
                    "day-book {} of tenant {} changed from {seen} since it was read",
                    key.date, key.tenant_id
                )));
            }
        }
        for (account_id, seen) in &self.account_reads {
            if tables.accounts.get(account_id) != seen.as_ref() {
                return Err(StoreError::SerializationConflict(format!(
                    "account {account_id} changed since it was read"
                )));
            }
        }
        for ((tenant_id, account_id), seen) in &self.line_count_reads {
            let current = committed_line_count(tables, *tenant_id, *account_id);
            if current != *seen {
                return Err(StoreError::SerializationConflict(format!(
                    "ledger lines of account {account_id} changed from {seen} to {current} since they were counted"
                )));
            }
        }
        Ok(())
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), StoreError> {
        let staged = &self.staged;

        check_inserts("day_books_pkey", &staged.day_books, &tables.day_books)?;
        check_inserts("accounts_pkey", &staged.accounts, &tables.accounts)?;
        check_inserts("share_accounts_pkey", &staged.share_accounts, &tables.share_accounts)?;
        for entry in &staged.journal_entries {
            if tables.journal_entries.contains_key(&entry.id) {
                return Err(violation("journal_entries_pkey", &entry.id));
            }
        }

        let day_books: Vec<&DayBook> = staged.day_books.values().map(Write::row).collect();
        check_unique(
            "day_books_one_active_per_tenant",
            tables.day_books.values(),
            &day_books,
            DayKey::of,
            |d| d.status.is_current().then_some(d.tenant_id),
        )?;

        let accounts: Vec<&ChartOfAccount> = staged.accounts.values().map(Write::row).collect();
        check_unique(
            "accounts_tenant_code",
            tables.accounts.values(),
            &accounts,
            |a| a.id,
            |a| Some((a.tenant_id, a.code.clone())),
        )?;

        let entries: Vec<&JournalEntry> = staged.journal_entries.iter().collect();
        check_unique(
            "journal_entries_tenant_number",
            tables.journal_entries.values(),
            &entries,
            |e| e.id,
            |e| Some((e.tenant_id, e.entry_number)),
        )?;

        let shares: Vec<&ShareAccount> = staged.share_accounts.values().map(Write::row).collect();
        check_unique(
            "share_accounts_tenant_member",
            tables.share_accounts.values(),
            &shares,
            |a| a.id,
            |a| Some((a.tenant_id, a.member_id)),
        )?;
        check_unique(
            "share_accounts_tenant_certificate",
            tables.share_accounts.values(),
            &shares,
            |a| a.id,
            |a| Some((a.tenant_id, a.certificate_no)),
        )?;

        Ok(())
    }
}

impl StoreTransaction for InMemoryTransaction {
    fn active_day_book(&mut self, tenant_id: TenantId) -> Result<Option<DayBook>, StoreError> {
        let mut active: Vec<(DayKey, DayBook, bool)> = self
            .visible_day_books(tenant_id)?
            .into_iter()
            .filter(|(_, day, _)| day.status.is_current())
            .collect();
        active.sort_by_key(|(key, _, _)| key.date);

        let Some((key, day, committed)) = active.pop() else {
            return Ok(None);
        };
        if committed {
            self.record_read(key, day.status);
        }
        Ok(Some(day))
    }

    fn latest_day_book(&mut self, tenant_id: TenantId) -> Result<Option<DayBook>, StoreError> {
        Ok(self
            .visible_day_books(tenant_id)?
            .into_iter()
            .map(|(_, day, _)| day)
            .max_by_key(|day| day.date))
    }

    fn insert_day_book(&mut self, day_book: DayBook) -> Result<(), StoreError> {
        let key = DayKey::of(&day_book);
        let exists = self.staged.day_books.contains_key(&key)
            || self.tables()?.day_books.contains_key(&key);
        if exists {
            return Err(violation("day_books_pkey", &(key.tenant_id, key.date)));
        }
        self.staged.day_books.insert(key, Write::Insert(day_book));
        Ok(())
    }

    fn update_day_book(&mut self, day_book: DayBook) -> Result<(), StoreError> {
        let key = DayKey::of(&day_book);
        let committed = self.tables()?.day_books.contains_key(&key);
        stage_update(&mut self.staged.day_books, key, day_book, committed, "day_books")
    }

    fn account(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<ChartOfAccount>, StoreError> {
        let account = match self.staged.accounts.get(&account_id) {
            Some(write) => Some(write.row().clone()),
            None => {
                let committed = self.tables()?.accounts.get(&account_id).cloned();
                self.account_reads
                    .entry(account_id)
                    .or_insert_with(|| committed.clone());
                committed
            }
        };
        Ok(account.filter(|a| a.tenant_id == tenant_id))
    }

    fn accounts(&mut self, tenant_id: TenantId) -> Result<Vec<ChartOfAccount>, StoreError> {
        let mut rows: HashMap<AccountId, ChartOfAccount> = self
            .tables()?
            .accounts
            .values()
            .filter(|a| a.tenant_id == tenant_id)
            .map(|a| (a.id, a.clone()))
            .collect();
        for write in self.staged.accounts.values() {
            let row = write.row();
            if row.tenant_id == tenant_id {
                rows.insert(row.id, row.clone());
            }
        }
        let mut accounts: Vec<ChartOfAccount> = rows.into_values().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    fn insert_account(&mut self, account: ChartOfAccount) -> Result<(), StoreError> {
        let exists = self.staged.accounts.contains_key(&account.id)
            || self.tables()?.accounts.contains_key(&account.id);
        if exists {
            return Err(violation("accounts_pkey", &account.id));
        }
        self.staged.accounts.insert(account.id, Write::Insert(account));
        Ok(())
    }

    fn update_account(&mut self, account: ChartOfAccount) -> Result<(), StoreError> {
        let committed = self.tables()?.accounts.contains_key(&account.id);
        stage_update(&mut self.staged.accounts, account.id, account, committed, "accounts")
    }

    fn next_entry_number(&mut self, tenant_id: TenantId) -> Result<u64, StoreError> {
        let mut sequences = self
            .shared
            .entry_sequences
            .lock()
            .map_err(|_| StoreError::Poisoned)?;
        let next = sequences.entry(tenant_id).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn journal_entry(
        &mut self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
    ) -> Result<Option<JournalEntry>, StoreError> {
        if let Some(entry) = self.staged.journal_entries.iter().find(|e| e.id == entry_id) {
            return Ok(Some(entry.clone()).filter(|e| e.tenant_id == tenant_id));
        }
        Ok(self
            .tables()?
            .journal_entries
            .get(&entry_id)
            .filter(|e| e.tenant_id == tenant_id)
            .cloned())
    }

    fn journal_entries(&mut self, tenant_id: TenantId) -> Result<Vec<JournalEntry>, StoreError> {
        self.visible_journal_entries(tenant_id)
    }

    fn insert_journal_entry(&mut self, entry: JournalEntry) -> Result<(), StoreError> {
        let exists = self.staged.journal_entries.iter().any(|e| e.id == entry.id)
            || self.tables()?.journal_entries.contains_key(&entry.id);
        if exists {
            return Err(violation("journal_entries_pkey", &entry.id));
        }
        self.staged.journal_entries.push(entry);
        Ok(())
    }

    fn count_ledger_lines(
        &mut self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<u64, StoreError> {
        let committed = committed_line_count(&*self.tables()?, tenant_id, account_id);
        self.line_count_reads
            .entry((tenant_id, account_id))
            .or_insert(committed);

        let staged = self
            .staged
            .journal_entries
            .iter()
            .filter(|e| e.tenant_id == tenant_id)
            .flat_map(|e| e.lines.iter())
            .filter(|l| l.account_id == account_id)
            .count() as u64;
        Ok(committed + staged)
    }

    fn share_account_for(
        &mut self,
        tenant_id: TenantId,
        member_id: MemberId,
    ) -> Result<Option<ShareAccount>, StoreError> {
        Ok(self
            .visible_share_accounts(tenant_id)?
            .into_iter()
            .find(|a| a.member_id == member_id))
    }

    fn share_accounts_for(
        &mut self,
        tenant_id: TenantId,
        members: &[MemberId],
    ) -> Result<Vec<ShareAccount>, StoreError> {
        let wanted: HashSet<&MemberId> = members.iter().collect();
        Ok(self
            .visible_share_accounts(tenant_id)?
            .into_iter()
            .filter(|a| wanted.contains(&a.member_id))
            .collect())
    }

    fn highest_certificate_no(
        &mut self,
        tenant_id: TenantId,
    ) -> Result<Option<CertificateNo>, StoreError> {
        Ok(self
            .visible_share_accounts(tenant_id)?
            .iter()
            .map(|a| a.certificate_no)
            .max())
    }

    fn insert_share_account(&mut self, account: ShareAccount) -> Result<(), StoreError> {
        let exists = self.staged.share_accounts.contains_key(&account.id)
            || self.tables()?.share_accounts.contains_key(&account.id);
        if exists {
            return Err(violation("share_accounts_pkey", &account.id));
        }
        self.staged
            .share_accounts
            .insert(account.id, Write::Insert(account));
        Ok(())
    }

    fn update_share_account(&mut self, account: ShareAccount) -> Result<(), StoreError> {
        let committed = self.tables()?.share_accounts.contains_key(&account.id);
        stage_update(
            &mut self.staged.share_accounts,
            account.id,
            account,
            committed,
            "share_accounts",
        )
    }

    fn insert_audit_record(&mut self, record: AuditRecord) -> Result<(), StoreError> {
        self.staged.audit_records.push(record);
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        let mut tables = this
            .shared
            .tables
            .write()
            .map_err(|_| StoreError::Poisoned)?;

        this.check_reads(&tables)?;
        this.check_constraints(&tables)?;

        let Staged {
            day_books,
            accounts,
            journal_entries,
            share_accounts,
            audit_records,
        } = this.staged;

        debug!(
            day_books = day_books.len(),
            accounts = accounts.len(),
            journal_entries = journal_entries.len(),
            share_accounts = share_accounts.len(),
            audit_records = audit_records.len(),
            "committing transaction"
        );

        for (key, write) in day_books {
            tables.day_books.insert(key, write.into_row());
        }
        for (id, write) in accounts {
            tables.accounts.insert(id, write.into_row());
        }
        for entry in journal_entries {
            tables.journal_entries.insert(entry.id, entry);
        }
        for (id, write) in share_accounts {
            tables.share_accounts.insert(id, write.into_row());
        }
        tables.audit_records.extend(audit_records);

        Ok(())
    }
}

fn committed_line_count(tables: &Tables, tenant_id: TenantId, account_id: AccountId) -> u64 {
    tables
        .journal_entries
        .values()
        .filter(|e| e.tenant_id == tenant_id)
        .flat_map(|e| e.lines.iter())
        .filter(|l| l.account_id == account_id)
        .count() as u64
}

fn violation(constraint: &'static str, key: &impl Debug) -> StoreError {
    StoreError::UniqueViolation {
        constraint,
        detail: format!("duplicate key {key:?}"),
    }
}

fn stage_update<K, T>(
    staged: &mut HashMap<K, Write<T>>,
    key: K,
    row: T,
    committed: bool,
    table: &'static str,
) -> Result<(), StoreError>
where
    K: Eq + Hash + Debug,
{
    match staged.entry(key) {
        Entry::Occupied(mut slot) => {
            let write = if slot.get().is_insert() {
                Write::Insert(row)
            } else {
                Write::Update(row)
            };
            slot.insert(write);
        }
        Entry::Vacant(slot) => {
            if !committed {
                return Err(StoreError::RowNotFound {
                    table,
                    key: format!("{:?}", slot.key()),
                });
            }
            slot.insert(Write::Update(row));
        }
    }
    Ok(())
}

/// Staged inserts must not collide with a committed primary key.
fn check_inserts<K, T>(
    constraint: &'static str,
    staged: &HashMap<K, Write<T>>,
    committed: &HashMap<K, T>,
) -> Result<(), StoreError>
where
    K: Eq + Hash + Debug,
{
    for (key, write) in staged {
        if write.is_insert() && committed.contains_key(key) {
            return Err(violation(constraint, key));
        }
    }
    Ok(())
}

/// Unique index over `key_of` across committed and staged rows.
///
/// Staged rows replace committed rows with the same id. Rows whose key is `None` do not
/// take part in the index (partial index).
fn check_unique<'a, T, Id, K>(
    constraint: &'static str,
    committed: impl Iterator<Item = &'a T>,
    staged: &[&'a T],
    id_of: impl Fn(&T) -> Id,
    key_of: impl Fn(&T) -> Option<K>,
) -> Result<(), StoreError>
where
    T: 'a,
    Id: Eq + Hash + Copy,
    K: Eq + Hash + Debug,
{
    let staged_ids: HashSet<Id> = staged.iter().map(|row| id_of(*row)).collect();
    let mut claimed: HashMap<K, Id> = HashMap::new();

    for row in staged {
        let Some(key) = key_of(*row) else { continue };
        let id = id_of(*row);
        match claimed.entry(key) {
            Entry::Occupied(slot) if *slot.get() != id => {
                return Err(violation(constraint, slot.key()));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
    }

    if claimed.is_empty() {
        return Ok(());
    }

    for row in committed {
        if staged_ids.contains(&id_of(row)) {
            continue;
        }
        if let Some(key) = key_of(row) {
            if claimed.contains_key(&key) {
                return Err(violation(constraint, &key));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use coopbooks_accounting::{AccountKind, LedgerLine};
    use coopbooks_core::UserId;

    fn business_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn share_account(tenant_id: TenantId, member_id: MemberId, no: u64) -> ShareAccount {
        ShareAccount::open(tenant_id, member_id, CertificateNo(no), UserId::new(), Utc::now())
    }

    #[test]
    fn dropped_transaction_discards_writes() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let account = ChartOfAccount::new(tenant_id, "1000", "Cash", AccountKind::Asset).unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert_account(account.clone()).unwrap();
        assert!(tx.account(tenant_id, account.id).unwrap().is_some());
        drop(tx);

        let mut tx = store.begin().unwrap();
        assert!(tx.account(tenant_id, account.id).unwrap().is_none());
    }

    #[test]
    fn reads_are_tenant_scoped() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let account = ChartOfAccount::new(tenant_id, "1000", "Cash", AccountKind::Asset).unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert_account(account.clone()).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        assert!(tx.account(TenantId::new(), account.id).unwrap().is_none());
        assert!(tx.account(tenant_id, account.id).unwrap().is_some());
    }

    #[test]
    fn concurrent_inserts_for_same_member_fail_the_second_commit() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let member_id = MemberId::new();

        let mut first = store.begin().unwrap();
        let mut second = store.begin().unwrap();
        first.insert_share_account(share_account(tenant_id, member_id, 1)).unwrap();
        second.insert_share_account(share_account(tenant_id, member_id, 2)).unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation { constraint: "share_accounts_tenant_member", .. }
        ));
    }

    #[test]
    fn certificate_numbers_are_unique_per_tenant_only() {
        let store = InMemoryLedgerStore::new();

        let mut tx = store.begin().unwrap();
        tx.insert_share_account(share_account(TenantId::new(), MemberId::new(), 1)).unwrap();
        tx.insert_share_account(share_account(TenantId::new(), MemberId::new(), 1)).unwrap();
        tx.commit().unwrap();

        let tenant_id = TenantId::new();
        let mut tx = store.begin().unwrap();
        tx.insert_share_account(share_account(tenant_id, MemberId::new(), 7)).unwrap();
        tx.insert_share_account(share_account(tenant_id, MemberId::new(), 7)).unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation { constraint: "share_accounts_tenant_certificate", .. }
        ));
    }

    #[test]
    fn day_book_status_change_after_read_is_a_serialization_conflict() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let day = DayBook::open(tenant_id, business_date(), UserId::new(), Utc::now());

        let mut tx = store.begin().unwrap();
        tx.insert_day_book(day.clone()).unwrap();
        tx.commit().unwrap();

        let mut poster = store.begin().unwrap();
        assert!(poster.active_day_book(tenant_id).unwrap().is_some());

        let mut eod = store.begin().unwrap();
        let mut current = eod.active_day_book(tenant_id).unwrap().unwrap();
        current.start_end_of_day(Utc::now()).unwrap();
        eod.update_day_book(current).unwrap();
        eod.commit().unwrap();

        let err = poster.commit().unwrap_err();
        assert!(matches!(err, StoreError::SerializationConflict(_)));
    }

    #[test]
    fn account_change_after_read_is_a_serialization_conflict() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let account = ChartOfAccount::new(tenant_id, "1000", "Cash", AccountKind::Asset).unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert_account(account.clone()).unwrap();
        tx.commit().unwrap();

        let mut poster = store.begin().unwrap();
        assert!(poster.account(tenant_id, account.id).unwrap().unwrap().is_active);

        let mut editor = store.begin().unwrap();
        let mut inactive = editor.account(tenant_id, account.id).unwrap().unwrap();
        inactive.is_active = false;
        editor.update_account(inactive).unwrap();
        editor.commit().unwrap();

        let err = poster.commit().unwrap_err();
        assert!(matches!(err, StoreError::SerializationConflict(_)));
    }

    #[test]
    fn lines_committed_after_counting_are_a_serialization_conflict() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let (cash, savings) = (AccountId::new(), AccountId::new());

        let mut editor = store.begin().unwrap();
        assert_eq!(editor.count_ledger_lines(tenant_id, cash).unwrap(), 0);

        let mut poster = store.begin().unwrap();
        poster
            .insert_journal_entry(JournalEntry::draft(
                tenant_id,
                1,
                "deposit",
                Utc::now(),
                vec![LedgerLine::debit(cash, 10), LedgerLine::credit(savings, 10)],
                UserId::new(),
            ))
            .unwrap();
        poster.commit().unwrap();

        let err = editor.commit().unwrap_err();
        assert!(matches!(err, StoreError::SerializationConflict(_)));
    }

    #[test]
    fn unrelated_commits_do_not_conflict_with_reads() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let cash = ChartOfAccount::new(tenant_id, "1000", "Cash", AccountKind::Asset).unwrap();
        let fees = ChartOfAccount::new(tenant_id, "4000", "Fees", AccountKind::Revenue).unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert_account(cash.clone()).unwrap();
        tx.insert_account(fees.clone()).unwrap();
        tx.commit().unwrap();

        let mut reader = store.begin().unwrap();
        reader.account(tenant_id, cash.id).unwrap();
        reader.count_ledger_lines(tenant_id, cash.id).unwrap();

        let mut editor = store.begin().unwrap();
        let mut renamed = editor.account(tenant_id, fees.id).unwrap().unwrap();
        renamed.name = "Service fees".to_string();
        editor.update_account(renamed).unwrap();
        editor.commit().unwrap();

        reader.commit().unwrap();
    }

    #[test]
    fn second_active_day_book_is_rejected() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let first = DayBook::open(tenant_id, business_date(), UserId::new(), Utc::now());
        let next = DayBook::open(
            tenant_id,
            business_date().succ_opt().unwrap(),
            UserId::new(),
            Utc::now(),
        );

        let mut tx = store.begin().unwrap();
        tx.insert_day_book(first).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert_day_book(next).unwrap();
        let err = tx.commit().unwrap_err();
        assert!(matches!(
            err,
            StoreError::UniqueViolation { constraint: "day_books_one_active_per_tenant", .. }
        ));
    }

    #[test]
    fn entry_numbers_are_not_reused_after_rollback() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.next_entry_number(tenant_id).unwrap(), 1);
        drop(tx);

        let mut tx = store.begin().unwrap();
        assert_eq!(tx.next_entry_number(tenant_id).unwrap(), 2);
        assert_eq!(tx.next_entry_number(TenantId::new()).unwrap(), 1);
    }

    #[test]
    fn ledger_lines_are_counted_across_committed_and_staged_entries() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let (cash, savings) = (AccountId::new(), AccountId::new());
        let entry = |n| {
            JournalEntry::draft(
                tenant_id,
                n,
                "deposit",
                Utc::now(),
                vec![LedgerLine::debit(cash, 10), LedgerLine::credit(savings, 10)],
                UserId::new(),
            )
        };

        let mut tx = store.begin().unwrap();
        tx.insert_journal_entry(entry(1)).unwrap();
        tx.commit().unwrap();

        let mut tx = store.begin().unwrap();
        tx.insert_journal_entry(entry(2)).unwrap();
        assert_eq!(tx.count_ledger_lines(tenant_id, cash).unwrap(), 2);
        assert_eq!(tx.count_ledger_lines(TenantId::new(), cash).unwrap(), 0);
        assert_eq!(store.journal_entry_count(tenant_id).unwrap(), 1);
    }

    #[test]
    fn updating_a_missing_row_fails() {
        let store = InMemoryLedgerStore::new();
        let account =
            ChartOfAccount::new(TenantId::new(), "1000", "Cash", AccountKind::Asset).unwrap();

        let mut tx = store.begin().unwrap();
        let err = tx.update_account(account).unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound { table: "accounts", .. }));
    }
}
