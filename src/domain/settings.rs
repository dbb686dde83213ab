use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSettings {
    pub monthly_fee: Decimal,
    pub per_kg_rate: Decimal,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            monthly_fee: Decimal::new(50000, 2),
            per_kg_rate: Decimal::new(5000, 2),
        }
    }
}
