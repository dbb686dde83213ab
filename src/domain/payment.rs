use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ledger::LedgerStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyPayment {
    pub id: Uuid,
    pub user_id: i64,
    pub month: NaiveDate,
    pub amount: Decimal,
    pub transaction_reference: String,
    pub status: LedgerStatus,
    pub gateway_ref_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A validated billing period: always the first day of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BillingMonth(NaiveDate);

impl BillingMonth {
    pub fn new(date: NaiveDate) -> Option<Self> {
        (date.day() == 1).then_some(Self(date))
    }

    /// Accepts `YYYY-MM-DD` where the day is `01`.
    pub fn parse(raw: &str) -> Option<Self> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .and_then(Self::new)
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn previous(&self) -> Self {
        let (year, month) = if self.0.month() == 1 {
            (self.0.year() - 1, 12)
        } else {
            (self.0.year(), self.0.month() - 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Self)
            .unwrap_or(*self)
    }

    pub fn label(&self) -> String {
        self.0.format("%b %Y").to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenMonthlyPaymentRequest {
    pub month: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}
