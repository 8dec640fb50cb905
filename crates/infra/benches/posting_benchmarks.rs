use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::NaiveDate;
use coopbooks_accounting::{AccountKind, ChartOfAccount, LedgerLine};
use coopbooks_core::{FixedClock, MemberId, TenantId, UserId};
use coopbooks_events::InMemoryEventBus;
use coopbooks_infra::{
    Engine, EngineConfig, InMemoryLedgerStore, PostJournalEntry, SharesPurchasedEnvelope,
};
use std::sync::Arc;

type BenchEngine = Engine<InMemoryLedgerStore, Arc<InMemoryEventBus<SharesPurchasedEnvelope>>>;

struct Ledger {
    engine: BenchEngine,
    tenant_id: TenantId,
    user: UserId,
    accounts: Vec<ChartOfAccount>,
}

/// Engine with an open day-book and `account_count` active accounts.
fn setup(account_count: usize, audit: bool) -> Ledger {
    let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
    let clock = Arc::new(FixedClock::new(
        date.and_hms_opt(10, 0, 0).unwrap().and_utc(),
    ));
    let engine = Engine::new(
        InMemoryLedgerStore::new(),
        Arc::new(InMemoryEventBus::new()),
        clock,
        EngineConfig::default().with_audit_enabled(audit),
    )
    .unwrap();

    let tenant_id = TenantId::new();
    let user = UserId::new();
    engine.day_books().begin_day(tenant_id, date, user).unwrap();
    let accounts = (0..account_count)
        .map(|i| {
            engine
                .chart()
                .create_account(
                    tenant_id,
                    &format!("{:04}", 1000 + i),
                    &format!("Account {i}"),
                    AccountKind::Asset,
                    user,
                )
                .unwrap()
        })
        .collect();

    Ledger {
        engine,
        tenant_id,
        user,
        accounts,
    }
}

/// One debit line per account except the last, balanced by a single credit.
fn request(ledger: &Ledger, line_count: usize) -> PostJournalEntry {
    let (credit, debits) = ledger.accounts.split_last().unwrap();
    let mut lines: Vec<LedgerLine> = debits
        .iter()
        .cycle()
        .take(line_count - 1)
        .map(|a| LedgerLine::debit(a.id, 100))
        .collect();
    lines.push(LedgerLine::credit(credit.id, 100 * (line_count as i64 - 1)));
    PostJournalEntry {
        tenant_id: ledger.tenant_id,
        description: "Benchmark posting".to_string(),
        lines,
        acting_user: ledger.user,
    }
}

fn bench_post_journal_entry_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_journal_entry_latency");
    group.sample_size(500);

    for audit in [true, false] {
        let ledger = setup(2, audit);
        let label = if audit { "with_audit" } else { "without_audit" };
        group.bench_function(label, |b| {
            b.iter(|| {
                let entry = ledger
                    .engine
                    .poster()
                    .post_journal_entry(request(&ledger, 2))
                    .unwrap();
                black_box(entry);
            });
        });
    }

    group.finish();
}

fn bench_lines_per_entry(c: &mut Criterion) {
    let mut group = c.benchmark_group("lines_per_entry");
    let ledger = setup(16, true);

    for line_count in [2usize, 8, 32, 128].iter() {
        group.throughput(Throughput::Elements(*line_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(line_count),
            line_count,
            |b, &line_count| {
                b.iter(|| {
                    ledger
                        .engine
                        .poster()
                        .post_journal_entry(request(&ledger, line_count))
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_share_account_provisioning(c: &mut Criterion) {
    let mut group = c.benchmark_group("share_account_provisioning");
    group.sample_size(20);

    for owner_count in [10usize, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*owner_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(owner_count),
            owner_count,
            |b, &owner_count| {
                b.iter_batched(
                    || {
                        let ledger = setup(2, true);
                        let owners: Vec<MemberId> =
                            (0..owner_count).map(|_| MemberId::new()).collect();
                        (ledger, owners)
                    },
                    |(ledger, owners)| {
                        let report = ledger
                            .engine
                            .share_accounts()
                            .provision_missing(ledger.tenant_id, &owners, ledger.user)
                            .unwrap();
                        assert_eq!(report.created_count(), owner_count);
                    },
                    criterion::BatchSize::LargeInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_trial_balance(c: &mut Criterion) {
    let mut group = c.benchmark_group("trial_balance");

    for entry_count in [100usize, 1000, 10000].iter() {
        let ledger = setup(8, false);
        for _ in 0..*entry_count {
            ledger
                .engine
                .poster()
                .post_journal_entry(request(&ledger, 4))
                .unwrap();
        }
        group.bench_with_input(
            BenchmarkId::from_parameter(entry_count),
            entry_count,
            |b, _| {
                b.iter(|| black_box(ledger.engine.chart().trial_balance(ledger.tenant_id).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_post_journal_entry_latency,
    bench_lines_per_entry,
    bench_share_account_provisioning,
    bench_trial_balance
);
criterion_main!(benches);
