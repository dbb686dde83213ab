use anyhow::Result;
use sqlx::{PgPool, Row};

use crate::domain::settings::PaymentSettings;

/// Read-only view of the portal's payment settings.
#[async_trait::async_trait]
pub trait SettingsSource: Send + Sync {
    async fn get_settings(&self) -> Result<PaymentSettings>;
}

#[derive(Clone)]
pub struct PgSettingsRepo {
    pub pool: PgPool,
}

#[async_trait::async_trait]
impl SettingsSource for PgSettingsRepo {
    async fn get_settings(&self) -> Result<PaymentSettings> {
        let row = sqlx::query("SELECT monthly_fee, per_kg_rate FROM payment_settings ORDER BY id ASC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(row
            .map(|r| PaymentSettings {
                monthly_fee: r.get("monthly_fee"),
                per_kg_rate: r.get("per_kg_rate"),
            })
            .unwrap_or_default())
    }
}

/// Settings held in memory; the value can be swapped to simulate the portal
/// changing its prices.
#[derive(Clone, Default)]
pub struct StaticSettings {
    inner: std::sync::Arc<tokio::sync::RwLock<PaymentSettings>>,
}

impl StaticSettings {
    pub fn new(settings: PaymentSettings) -> Self {
        Self {
            inner: std::sync::Arc::new(tokio::sync::RwLock::new(settings)),
        }
    }

    pub async fn replace(&self, settings: PaymentSettings) {
        *self.inner.write().await = settings;
    }
}

#[async_trait::async_trait]
impl SettingsSource for StaticSettings {
    async fn get_settings(&self) -> Result<PaymentSettings> {
        Ok(self.inner.read().await.clone())
    }
}
