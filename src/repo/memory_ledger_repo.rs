use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::invoice::{Invoice, InvoicePricing};
use crate::domain::ledger::{EntityKind, EntityRef, LedgerEntry, LedgerStatus, TransitionRecord};
use crate::domain::payment::MonthlyPayment;
use crate::repo::ledger_repo::{InsertOutcome, LedgerStore};

#[derive(Default)]
struct MemoryLedger {
    monthly: Vec<MonthlyPayment>,
    invoices: Vec<Invoice>,
    transitions: Vec<TransitionRecord>,
}

impl MemoryLedger {
    fn reference_taken(&self, reference: &str) -> bool {
        self.monthly.iter().any(|p| p.transaction_reference == reference)
            || self.invoices.iter().any(|i| i.transaction_reference == reference)
    }

    fn entry(&self, entity: EntityRef) -> Option<LedgerEntry> {
        match entity.kind {
            EntityKind::Monthly => self
                .monthly
                .iter()
                .find(|p| p.id == entity.id)
                .cloned()
                .map(LedgerEntry::Monthly),
            EntityKind::Invoice => self
                .invoices
                .iter()
                .find(|i| i.id == entity.id)
                .cloned()
                .map(LedgerEntry::Invoice),
        }
    }

    fn entries(&self) -> impl Iterator<Item = LedgerEntry> + '_ {
        self.monthly
            .iter()
            .cloned()
            .map(LedgerEntry::Monthly)
            .chain(self.invoices.iter().cloned().map(LedgerEntry::Invoice))
    }
}

/// Process-local ledger with the same uniqueness and compare-and-set
/// guarantees as the Postgres store. Every operation holds one lock.
#[derive(Clone, Default)]
pub struct MemoryLedgerRepo {
    inner: Arc<Mutex<MemoryLedger>>,
}

impl MemoryLedgerRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn monthly_count(&self, user_id: i64, month: NaiveDate) -> usize {
        let guard = self.inner.lock().await;
        guard
            .monthly
            .iter()
            .filter(|p| p.user_id == user_id && p.month == month)
            .count()
    }

    pub async fn invoice_count(&self, special_request_id: i64) -> usize {
        let guard = self.inner.lock().await;
        guard
            .invoices
            .iter()
            .filter(|i| i.special_request_id == special_request_id)
            .count()
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerRepo {
    async fn find_monthly(&self, user_id: i64, month: NaiveDate) -> Result<Option<MonthlyPayment>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .monthly
            .iter()
            .find(|p| p.user_id == user_id && p.month == month)
            .cloned())
    }

    async fn insert_monthly(&self, payment: &MonthlyPayment) -> Result<InsertOutcome<MonthlyPayment>> {
        let mut guard = self.inner.lock().await;
        let duplicate = guard
            .monthly
            .iter()
            .any(|p| p.user_id == payment.user_id && p.month == payment.month);
        if duplicate || guard.reference_taken(&payment.transaction_reference) {
            return Ok(InsertOutcome::Conflict);
        }
        guard.monthly.push(payment.clone());
        Ok(InsertOutcome::Inserted(payment.clone()))
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let guard = self.inner.lock().await;
        Ok(guard.invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn find_invoice_by_request(&self, special_request_id: i64) -> Result<Option<Invoice>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .invoices
            .iter()
            .find(|i| i.special_request_id == special_request_id)
            .cloned())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<InsertOutcome<Invoice>> {
        let mut guard = self.inner.lock().await;
        let duplicate = guard
            .invoices
            .iter()
            .any(|i| i.special_request_id == invoice.special_request_id);
        if duplicate || guard.reference_taken(&invoice.transaction_reference) {
            return Ok(InsertOutcome::Conflict);
        }
        guard.invoices.push(invoice.clone());
        Ok(InsertOutcome::Inserted(invoice.clone()))
    }

    async fn reprice_pending_invoice(
        &self,
        special_request_id: i64,
        pricing: &InvoicePricing,
    ) -> Result<Option<Invoice>> {
        let mut guard = self.inner.lock().await;
        let Some(invoice) = guard
            .invoices
            .iter_mut()
            .find(|i| i.special_request_id == special_request_id && i.status == LedgerStatus::Pending)
        else {
            return Ok(None);
        };
        invoice.weight_kg = pricing.weight_kg;
        invoice.per_kg_rate = pricing.per_kg_rate;
        invoice.amount = pricing.amount;
        invoice.transaction_reference = pricing.transaction_reference.clone();
        Ok(Some(invoice.clone()))
    }

    async fn find_by_reference(&self, transaction_reference: &str) -> Result<Option<LedgerEntry>> {
        let guard = self.inner.lock().await;
        let found = guard
            .entries()
            .find(|e| e.transaction_reference() == transaction_reference);
        Ok(found)
    }

    async fn get_entry(&self, entity: EntityRef) -> Result<Option<LedgerEntry>> {
        let guard = self.inner.lock().await;
        Ok(guard.entry(entity))
    }

    async fn compare_and_set_status(&self, record: &TransitionRecord) -> Result<bool> {
        let mut guard = self.inner.lock().await;
        let applied = match record.entity.kind {
            EntityKind::Monthly => match guard
                .monthly
                .iter_mut()
                .find(|p| p.id == record.entity.id && p.status == record.from_status)
            {
                Some(p) => {
                    p.status = record.to_status;
                    if record.gateway_ref_id.is_some() {
                        p.gateway_ref_id = record.gateway_ref_id.clone();
                    }
                    true
                }
                None => false,
            },
            EntityKind::Invoice => match guard
                .invoices
                .iter_mut()
                .find(|i| i.id == record.entity.id && i.status == record.from_status)
            {
                Some(i) => {
                    i.status = record.to_status;
                    if record.gateway_ref_id.is_some() {
                        i.gateway_ref_id = record.gateway_ref_id.clone();
                    }
                    true
                }
                None => false,
            },
        };
        if applied {
            guard.transitions.push(record.clone());
        }
        Ok(applied)
    }

    async fn list_entries(&self, user_id: Option<i64>) -> Result<Vec<LedgerEntry>> {
        let guard = self.inner.lock().await;
        let mut entries: Vec<LedgerEntry> = guard
            .entries()
            .filter(|e| user_id.map_or(true, |u| e.user_id() == u))
            .collect();
        entries.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(entries)
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<LedgerEntry>> {
        let guard = self.inner.lock().await;
        let mut entries: Vec<LedgerEntry> = guard
            .entries()
            .filter(|e| e.status() == LedgerStatus::Pending && e.created_at() < cutoff)
            .collect();
        entries.sort_by_key(|e| e.created_at());
        Ok(entries)
    }

    async fn list_transitions(&self, entity: EntityRef) -> Result<Vec<TransitionRecord>> {
        let guard = self.inner.lock().await;
        Ok(guard
            .transitions
            .iter()
            .filter(|t| t.entity == entity)
            .cloned()
            .collect())
    }
}
