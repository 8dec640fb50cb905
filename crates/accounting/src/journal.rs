use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use coopbooks_core::{AccountId, DomainError, DomainResult, JournalEntryId, TenantId, UserId};
use coopbooks_events::{EntityType, HookEntity};

/// One debit-or-credit amount against one chart-of-accounts entry.
///
/// Amounts are in the smallest currency unit (e.g. paisa/cents). Lines are owned by
/// their `JournalEntry` and stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub account_id: AccountId,
    pub debit: i64,
    pub credit: i64,
}

impl LedgerLine {
    pub fn debit(account_id: AccountId, amount: i64) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: 0,
        }
    }

    pub fn credit(account_id: AccountId, amount: i64) -> Self {
        Self {
            account_id,
            debit: 0,
            credit: amount,
        }
    }

    /// Debit-positive signed amount.
    pub fn signed_amount(&self) -> i128 {
        self.debit as i128 - self.credit as i128
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    pub debit: i64,
    pub credit: i64,
}

/// Check that `lines` form a balanced double entry.
///
/// Every line must carry exactly one non-negative side. The entry must have lines, and
/// total debits must equal total credits with both totals above zero; anything else is
/// `UnbalancedEntry`.
pub fn validate_lines(lines: &[LedgerLine]) -> DomainResult<EntryTotals> {
    let mut debit: i64 = 0;
    let mut credit: i64 = 0;

    for (idx, line) in lines.iter().enumerate() {
        if line.debit < 0 || line.credit < 0 {
            return Err(DomainError::validation(format!(
                "line {idx}: amounts must not be negative"
            )));
        }
        match (line.debit > 0, line.credit > 0) {
            (true, true) => {
                return Err(DomainError::validation(format!(
                    "line {idx}: a line is either a debit or a credit, not both"
                )));
            }
            (false, false) => {
                return Err(DomainError::validation(format!("line {idx}: amount is zero")));
            }
            _ => {}
        }

        debit = debit
            .checked_add(line.debit)
            .ok_or_else(|| DomainError::validation("debit total overflows"))?;
        credit = credit
            .checked_add(line.credit)
            .ok_or_else(|| DomainError::validation("credit total overflows"))?;
    }

    if debit != credit || debit == 0 {
        return Err(DomainError::UnbalancedEntry { debit, credit });
    }

    Ok(EntryTotals { debit, credit })
}

/// One balanced double-entry accounting transaction.
///
/// Entries are written once, together with their lines, and never updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: JournalEntryId,
    pub tenant_id: TenantId,
    /// Per-tenant sequence number.
    pub entry_number: u64,
    pub description: String,
    /// Effective posting timestamp. Assigned by the day-book gate; callers never set it.
    pub date: DateTime<Utc>,
    pub lines: Vec<LedgerLine>,
    pub created_by: UserId,
}

impl JournalEntry {
    /// A not-yet-persisted entry. `provisional_date` is replaced by the posting gate.
    pub fn draft(
        tenant_id: TenantId,
        entry_number: u64,
        description: impl Into<String>,
        provisional_date: DateTime<Utc>,
        lines: Vec<LedgerLine>,
        created_by: UserId,
    ) -> Self {
        Self {
            id: JournalEntryId::new(),
            tenant_id,
            entry_number,
            description: description.into(),
            date: provisional_date,
            lines,
            created_by,
        }
    }

    pub fn totals(&self) -> DomainResult<EntryTotals> {
        validate_lines(&self.lines)
    }

    /// Distinct accounts referenced by the lines, in first-seen order.
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if !ids.contains(&line.account_id) {
                ids.push(line.account_id);
            }
        }
        ids
    }

    pub fn references_account(&self, account_id: AccountId) -> bool {
        self.lines.iter().any(|l| l.account_id == account_id)
    }

    /// Human-facing reference, e.g. `JE-000042`.
    pub fn reference(&self) -> String {
        format!("JE-{:06}", self.entry_number)
    }
}

impl HookEntity for JournalEntry {
    const ENTITY_TYPE: EntityType = EntityType::JournalEntry;

    fn entity_key(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn accounts() -> (AccountId, AccountId) {
        (AccountId::new(), AccountId::new())
    }

    #[test]
    fn balanced_entry_reports_totals() {
        let (cash, savings) = accounts();
        let lines = vec![
            LedgerLine::debit(cash, 1000),
            LedgerLine::credit(savings, 600),
            LedgerLine::credit(savings, 400),
        ];

        let totals = validate_lines(&lines).unwrap();
        assert_eq!(totals, EntryTotals { debit: 1000, credit: 1000 });
    }

    #[test]
    fn unbalanced_entry_is_rejected() {
        let (cash, savings) = accounts();
        let lines = vec![LedgerLine::debit(cash, 100), LedgerLine::credit(savings, 90)];

        let err = validate_lines(&lines).unwrap_err();
        assert_eq!(err, DomainError::UnbalancedEntry { debit: 100, credit: 90 });
    }

    #[test]
    fn empty_entry_is_unbalanced() {
        let err = validate_lines(&[]).unwrap_err();
        assert_eq!(err, DomainError::UnbalancedEntry { debit: 0, credit: 0 });
    }

    #[test]
    fn two_sided_and_negative_lines_are_invalid() {
        let (cash, _) = accounts();
        let both = LedgerLine {
            account_id: cash,
            debit: 10,
            credit: 10,
        };
        assert!(matches!(validate_lines(&[both]), Err(DomainError::Validation(_))));

        let negative = LedgerLine::debit(cash, -5);
        assert!(matches!(validate_lines(&[negative]), Err(DomainError::Validation(_))));
    }

    #[test]
    fn account_ids_are_distinct_in_first_seen_order() {
        let (cash, savings) = accounts();
        let entry = JournalEntry::draft(
            TenantId::new(),
            42,
            "deposit",
            Utc::now(),
            vec![
                LedgerLine::debit(cash, 50),
                LedgerLine::credit(savings, 25),
                LedgerLine::credit(savings, 25),
            ],
            UserId::new(),
        );

        assert_eq!(entry.account_ids(), vec![cash, savings]);
        assert_eq!(entry.reference(), "JE-000042");
    }

    proptest! {
        /// Property: validation accepts exactly the line sets whose debit and credit
        /// totals are equal and non-zero.
        #[test]
        fn accepts_only_balanced_line_sets(
            debits in prop::collection::vec(1i64..1_000_000, 0..6),
            credits in prop::collection::vec(1i64..1_000_000, 0..6),
        ) {
            let (dr, cr) = accounts();
            let mut lines: Vec<LedgerLine> = debits.iter().map(|a| LedgerLine::debit(dr, *a)).collect();
            lines.extend(credits.iter().map(|a| LedgerLine::credit(cr, *a)));

            let debit: i64 = debits.iter().sum();
            let credit: i64 = credits.iter().sum();

            match validate_lines(&lines) {
                Ok(totals) => {
                    prop_assert_eq!(totals.debit, totals.credit);
                    prop_assert!(totals.debit > 0);
                }
                Err(DomainError::UnbalancedEntry { debit: d, credit: c }) => {
                    prop_assert!(d != c || d == 0);
                    prop_assert_eq!((d, c), (debit, credit));
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }
}
