use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ledger::LedgerStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub special_request_id: i64,
    pub user_id: i64,
    pub weight_kg: Decimal,
    pub per_kg_rate: Decimal,
    pub amount: Decimal,
    pub transaction_reference: String,
    pub status: LedgerStatus,
    pub gateway_ref_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Largest weight `NUMERIC(12,3)` holds.
pub fn max_weight_kg() -> Decimal {
    Decimal::new(999_999_999_999, 3)
}

/// Largest amount `NUMERIC(12,2)` holds.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Rounds half-up to the stored three decimals. `None` unless the result is
/// positive and fits the column.
pub fn normalize_weight(weight_kg: Decimal) -> Option<Decimal> {
    let weight = weight_kg.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
    (weight > Decimal::ZERO && weight <= max_weight_kg()).then_some(weight)
}

/// `weight_kg * per_kg_rate`, rounded half-up to cents. `None` on overflow or
/// when the result is not a chargeable amount.
pub fn invoice_amount(weight_kg: Decimal, per_kg_rate: Decimal) -> Option<Decimal> {
    let amount = weight_kg
        .checked_mul(per_kg_rate)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (amount > Decimal::ZERO && amount <= max_amount()).then_some(amount)
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueInvoiceRequest {
    pub special_request_id: i64,
    pub weight_kg: Decimal,
}

/// Price and reference for an invoice write, computed before touching the store.
#[derive(Debug, Clone)]
pub struct InvoicePricing {
    pub weight_kg: Decimal,
    pub per_kg_rate: Decimal,
    pub amount: Decimal,
    pub transaction_reference: String,
}
