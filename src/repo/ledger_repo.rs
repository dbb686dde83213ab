use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::invoice::{Invoice, InvoicePricing};
use crate::domain::ledger::{EntityRef, LedgerEntry, TransitionRecord};
use crate::domain::payment::MonthlyPayment;

#[derive(Debug, Clone)]
pub enum InsertOutcome<T> {
    Inserted(T),
    /// A row with the same natural key or reference already exists.
    Conflict,
}

/// Durable storage for ledger entities.
///
/// Implementations must enforce the natural keys (`user_id`+`month`,
/// `special_request_id`, `transaction_reference`) themselves and must make
/// `compare_and_set_status` a single atomic check-and-write.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_monthly(&self, user_id: i64, month: NaiveDate) -> Result<Option<MonthlyPayment>>;

    async fn insert_monthly(&self, payment: &MonthlyPayment) -> Result<InsertOutcome<MonthlyPayment>>;

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>>;

    async fn find_invoice_by_request(&self, special_request_id: i64) -> Result<Option<Invoice>>;

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<InsertOutcome<Invoice>>;

    /// Re-prices the invoice for `special_request_id` only while it is still
    /// pending. Returns `None` when no pending invoice matched.
    async fn reprice_pending_invoice(
        &self,
        special_request_id: i64,
        pricing: &InvoicePricing,
    ) -> Result<Option<Invoice>>;

    async fn find_by_reference(&self, transaction_reference: &str) -> Result<Option<LedgerEntry>>;

    async fn get_entry(&self, entity: EntityRef) -> Result<Option<LedgerEntry>>;

    /// Moves `record.entity` from `record.from_status` to `record.to_status`
    /// and appends `record` to the transition log. Returns `false` without
    /// writing anything when the entity is no longer in `from_status`.
    async fn compare_and_set_status(&self, record: &TransitionRecord) -> Result<bool>;

    /// All entries, newest first, optionally scoped to one user.
    async fn list_entries(&self, user_id: Option<i64>) -> Result<Vec<LedgerEntry>>;

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<LedgerEntry>>;

    async fn list_transitions(&self, entity: EntityRef) -> Result<Vec<TransitionRecord>>;
}
