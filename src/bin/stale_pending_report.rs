use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;
use waste_payments::config::AppConfig;
use waste_payments::repo::pg_ledger_repo::PgLedgerRepo;
use waste_payments::repo::settings_repo::PgSettingsRepo;
use waste_payments::repo::special_requests_repo::PgSpecialRequestsRepo;
use waste_payments::service::ledger::Ledger;
use waste_payments::service::reconciliation::ReconciliationAuthority;

/// Periodically logs entries that have sat in `pending` past the configured
/// age. Never changes state; resolution stays with administrators.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env();
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&cfg.database_url)
        .await?;

    let reconciliation = ReconciliationAuthority {
        ledger: Ledger {
            store: Arc::new(PgLedgerRepo { pool: pool.clone() }),
            settings: Arc::new(PgSettingsRepo { pool: pool.clone() }),
            special_requests: Arc::new(PgSpecialRequestsRepo { pool }),
        },
    };
    let older_than = chrono::Duration::try_hours(cfg.stale_pending_hours)
        .ok_or_else(|| anyhow::anyhow!("STALE_PENDING_HOURS out of range: {}", cfg.stale_pending_hours))?;

    loop {
        match reconciliation.stale_pending(older_than).await {
            Ok(stale) if stale.is_empty() => {
                tracing::debug!(hours = cfg.stale_pending_hours, "no stale pending entries");
            }
            Ok(stale) => {
                for entry in &stale {
                    tracing::warn!(
                        entity = %entry.entity_ref(),
                        user_id = entry.user_id(),
                        amount = %entry.amount(),
                        transaction_reference = %entry.transaction_reference(),
                        created_at = %entry.created_at(),
                        "entry still pending"
                    );
                }
                tracing::info!(count = stale.len(), hours = cfg.stale_pending_hours, "stale pending report");
            }
            Err(e) => tracing::error!(error = %e, "stale pending scan failed"),
        }

        tokio::time::sleep(std::time::Duration::from_secs(300)).await;
    }
}
