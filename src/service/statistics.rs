use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::ledger::{EntityKind, LedgerEntry, LedgerStatus};
use crate::domain::payment::BillingMonth;
use crate::error::LedgerResult;
use crate::repo::ledger_repo::LedgerStore;

pub const ROLLUP_MONTHS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "user_id", rename_all = "snake_case")]
pub enum StatsScope {
    Global,
    User(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub paid: u64,
}

impl StatusCounts {
    fn bump(&mut self, status: LedgerStatus) {
        match status {
            LedgerStatus::Pending => self.pending += 1,
            LedgerStatus::Processing => self.processing += 1,
            LedgerStatus::Completed => self.completed += 1,
            LedgerStatus::Failed => self.failed += 1,
            LedgerStatus::Paid => self.paid += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodRollup {
    pub month: NaiveDate,
    pub label: String,
    pub monthly_revenue: Decimal,
    pub invoice_revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStats {
    pub scope: StatsScope,
    pub total_revenue: Decimal,
    pub monthly_revenue: Decimal,
    pub invoice_revenue: Decimal,
    pub pending_amount: Decimal,
    pub processing_amount: Decimal,
    pub monthly_counts: StatusCounts,
    pub invoice_counts: StatusCounts,
    /// Oldest first, ending with the month containing `as_of`.
    pub periods: Vec<PeriodRollup>,
}

/// Folds a consistent snapshot of ledger entries into totals and rollups.
/// Monthly payments roll up by billing month, invoices by creation month.
pub fn project(scope: StatsScope, entries: &[LedgerEntry], as_of: NaiveDate) -> LedgerStats {
    let mut monthly_revenue = Decimal::ZERO;
    let mut invoice_revenue = Decimal::ZERO;
    let mut pending_amount = Decimal::ZERO;
    let mut processing_amount = Decimal::ZERO;
    let mut monthly_counts = StatusCounts::default();
    let mut invoice_counts = StatusCounts::default();
    let mut by_period: HashMap<(BillingMonth, EntityKind), Decimal> = HashMap::new();

    for entry in entries {
        let status = entry.status();
        match status {
            LedgerStatus::Pending => pending_amount += entry.amount(),
            LedgerStatus::Processing => processing_amount += entry.amount(),
            _ => {}
        }

        match entry {
            LedgerEntry::Monthly(p) => {
                monthly_counts.bump(status);
                if status.is_settled() {
                    monthly_revenue += p.amount;
                    *by_period
                        .entry((BillingMonth::containing(p.month), EntityKind::Monthly))
                        .or_default() += p.amount;
                }
            }
            LedgerEntry::Invoice(i) => {
                invoice_counts.bump(status);
                if status.is_settled() {
                    invoice_revenue += i.amount;
                    *by_period
                        .entry((
                            BillingMonth::containing(i.created_at.date_naive()),
                            EntityKind::Invoice,
                        ))
                        .or_default() += i.amount;
                }
            }
        }
    }

    let mut periods = Vec::with_capacity(ROLLUP_MONTHS);
    let mut month = BillingMonth::containing(as_of);
    for _ in 0..ROLLUP_MONTHS {
        periods.push(PeriodRollup {
            month: month.date(),
            label: month.label(),
            monthly_revenue: by_period
                .get(&(month, EntityKind::Monthly))
                .copied()
                .unwrap_or_default(),
            invoice_revenue: by_period
                .get(&(month, EntityKind::Invoice))
                .copied()
                .unwrap_or_default(),
        });
        month = month.previous();
    }
    periods.reverse();

    LedgerStats {
        scope,
        total_revenue: monthly_revenue + invoice_revenue,
        monthly_revenue,
        invoice_revenue,
        pending_amount,
        processing_amount,
        monthly_counts,
        invoice_counts,
        periods,
    }
}

/// Read-only projection over the ledger store.
#[derive(Clone)]
pub struct StatisticsProjector {
    pub store: Arc<dyn LedgerStore>,
}

impl StatisticsProjector {
    pub async fn stats(&self, scope: StatsScope, as_of: NaiveDate) -> LedgerResult<LedgerStats> {
        let user_id = match scope {
            StatsScope::Global => None,
            StatsScope::User(id) => Some(id),
        };
        let entries = self.store.list_entries(user_id).await?;
        Ok(project(scope, &entries, as_of))
    }
}
