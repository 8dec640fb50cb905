use std::collections::HashMap;

use coopbooks_core::AccountId;

use crate::account::{AccountKind, ChartOfAccount};
use crate::journal::JournalEntry;

/// Per-account balance derived from posted journal entries.
///
/// Balances are signed (debit-positive convention).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub account_code: String,
    pub account_name: String,
    pub kind: AccountKind,
    pub debit_total: i128,
    pub credit_total: i128,
    pub balance: i128,
}

/// Fold `entries` into one balance per account, ordered by account code.
///
/// Every account of `chart` appears, including those without postings. Lines against an
/// account missing from `chart` are still counted, labelled by the account id.
pub fn trial_balance<'a>(
    chart: &[ChartOfAccount],
    entries: impl IntoIterator<Item = &'a JournalEntry>,
) -> Vec<AccountBalance> {
    let mut rows: HashMap<AccountId, AccountBalance> = chart
        .iter()
        .map(|account| {
            (
                account.id,
                AccountBalance {
                    account_id: account.id,
                    account_code: account.code.clone(),
                    account_name: account.name.clone(),
                    kind: account.kind,
                    debit_total: 0,
                    credit_total: 0,
                    balance: 0,
                },
            )
        })
        .collect();

    for entry in entries {
        for line in &entry.lines {
            let row = rows.entry(line.account_id).or_insert_with(|| AccountBalance {
                account_id: line.account_id,
                account_code: line.account_id.to_string(),
                account_name: String::new(),
                kind: AccountKind::Asset,
                debit_total: 0,
                credit_total: 0,
                balance: 0,
            });
            row.debit_total += line.debit as i128;
            row.credit_total += line.credit as i128;
            row.balance += line.signed_amount();
        }
    }

    let mut out: Vec<AccountBalance> = rows.into_values().collect();
    out.sort_by(|a, b| a.account_code.cmp(&b.account_code));
    out
}
