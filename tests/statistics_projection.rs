use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;
use waste_payments::domain::invoice::Invoice;
use waste_payments::domain::ledger::{EntityRef, LedgerEntry, LedgerStatus};
use waste_payments::domain::payment::MonthlyPayment;
use waste_payments::repo::memory_ledger_repo::MemoryLedgerRepo;
use waste_payments::repo::settings_repo::StaticSettings;
use waste_payments::repo::special_requests_repo::MemorySpecialRequests;
use waste_payments::service::ledger::Ledger;
use waste_payments::service::reconciliation::ReconciliationAuthority;
use waste_payments::service::statistics::{project, StatisticsProjector, StatsScope, ROLLUP_MONTHS};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("date")
}

fn monthly(user_id: i64, month: NaiveDate, amount: i64, status: LedgerStatus) -> LedgerEntry {
    LedgerEntry::Monthly(MonthlyPayment {
        id: Uuid::new_v4(),
        user_id,
        month,
        amount: Decimal::new(amount, 0),
        transaction_reference: Uuid::new_v4().to_string(),
        status,
        gateway_ref_id: None,
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    })
}

fn invoice(user_id: i64, created: NaiveDate, amount: i64, status: LedgerStatus) -> LedgerEntry {
    LedgerEntry::Invoice(Invoice {
        id: Uuid::new_v4(),
        special_request_id: request_id_for_test(),
        user_id,
        weight_kg: Decimal::new(amount, 0) / Decimal::new(50, 0),
        per_kg_rate: Decimal::new(50, 0),
        amount: Decimal::new(amount, 0),
        transaction_reference: Uuid::new_v4().to_string(),
        status,
        gateway_ref_id: None,
        created_at: Utc
            .from_utc_datetime(&created.and_hms_opt(10, 0, 0).unwrap()),
    })
}

fn request_id_for_test() -> i64 {
    (Uuid::new_v4().as_u128() % 1_000_000) as i64
}

fn sample() -> Vec<LedgerEntry> {
    vec![
        monthly(1, date(2026, 10, 1), 500, LedgerStatus::Completed),
        monthly(1, date(2026, 9, 1), 500, LedgerStatus::Failed),
        monthly(1, date(2026, 8, 1), 500, LedgerStatus::Pending),
        monthly(2, date(2026, 3, 1), 500, LedgerStatus::Completed),
        invoice(1, date(2026, 9, 10), 625, LedgerStatus::Paid),
        invoice(2, date(2026, 10, 2), 250, LedgerStatus::Processing),
    ]
}

#[test]
fn global_totals_count_only_settled_revenue() {
    let stats = project(StatsScope::Global, &sample(), date(2026, 10, 19));

    assert_eq!(stats.monthly_revenue, Decimal::new(1000, 0));
    assert_eq!(stats.invoice_revenue, Decimal::new(625, 0));
    assert_eq!(stats.total_revenue, Decimal::new(1625, 0));
    assert_eq!(stats.pending_amount, Decimal::new(500, 0));
    assert_eq!(stats.processing_amount, Decimal::new(250, 0));

    assert_eq!(stats.monthly_counts.completed, 2);
    assert_eq!(stats.monthly_counts.failed, 1);
    assert_eq!(stats.monthly_counts.pending, 1);
    assert_eq!(stats.invoice_counts.paid, 1);
    assert_eq!(stats.invoice_counts.processing, 1);
}

#[test]
fn periods_cover_the_trailing_six_months_oldest_first() {
    let stats = project(StatsScope::Global, &sample(), date(2026, 10, 19));

    assert_eq!(stats.periods.len(), ROLLUP_MONTHS);
    assert_eq!(stats.periods[0].month, date(2026, 5, 1));
    assert_eq!(stats.periods[5].month, date(2026, 10, 1));
    assert_eq!(stats.periods[5].label, "Oct 2026");

    let october = &stats.periods[5];
    assert_eq!(october.monthly_revenue, Decimal::new(500, 0));
    assert_eq!(october.invoice_revenue, Decimal::ZERO);

    let september = &stats.periods[4];
    assert_eq!(september.monthly_revenue, Decimal::ZERO);
    assert_eq!(september.invoice_revenue, Decimal::new(625, 0));

    // March falls outside the window but still counts toward the total.
    assert!(stats.periods.iter().all(|p| p.month != date(2026, 3, 1)));
}

#[test]
fn empty_ledger_projects_zeroes() {
    let stats = project(StatsScope::User(99), &[], date(2025, 2, 14));
    assert_eq!(stats.total_revenue, Decimal::ZERO);
    assert_eq!(stats.periods.len(), ROLLUP_MONTHS);
    assert_eq!(stats.periods[0].month, date(2024, 9, 1));
    assert!(stats
        .periods
        .iter()
        .all(|p| p.monthly_revenue.is_zero() && p.invoice_revenue.is_zero()));
}

#[tokio::test]
async fn projector_scopes_to_one_user() {
    let store = MemoryLedgerRepo::new();
    let ledger = Ledger {
        store: Arc::new(store.clone()),
        settings: Arc::new(StaticSettings::default()),
        special_requests: Arc::new(MemorySpecialRequests::new()),
    };
    let reconciliation = ReconciliationAuthority {
        ledger: ledger.clone(),
    };
    let projector = StatisticsProjector {
        store: Arc::new(store),
    };

    let mine = ledger.open_monthly_payment(1, "2026-10-01").await.expect("open");
    ledger.open_monthly_payment(2, "2026-10-01").await.expect("open");
    reconciliation
        .admin_transition(EntityRef::monthly(mine.id), LedgerStatus::Completed, 1)
        .await
        .expect("complete");

    let as_of = date(2026, 10, 19);
    let user = projector.stats(StatsScope::User(1), as_of).await.expect("stats");
    assert_eq!(user.total_revenue, mine.amount);
    assert_eq!(user.pending_amount, Decimal::ZERO);

    let global = projector.stats(StatsScope::Global, as_of).await.expect("stats");
    assert_eq!(global.total_revenue, mine.amount);
    assert_eq!(global.monthly_counts.pending, 1);
    assert_eq!(global.monthly_counts.completed, 1);
}
