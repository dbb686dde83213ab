use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::domain::ledger::{Actor, EntityKind, EntityRef, LedgerEntry, LedgerStatus};
use crate::error::{LedgerError, LedgerResult};
use crate::service::ledger::Ledger;

#[derive(Debug, Clone, Deserialize)]
pub struct AdminTransitionRequest {
    pub kind: EntityKind,
    pub id: uuid::Uuid,
    pub target_status: LedgerStatus,
}

/// Administrator-driven resolution. Uses the same transition table as the
/// gateway; admins only get the edges the table grants them.
#[derive(Clone)]
pub struct ReconciliationAuthority {
    pub ledger: Ledger,
}

impl ReconciliationAuthority {
    pub async fn admin_transition(
        &self,
        entity: EntityRef,
        target_status: LedgerStatus,
        admin_id: i64,
    ) -> LedgerResult<LedgerEntry> {
        let result = self
            .ledger
            .transition(entity, target_status, Actor::Admin { admin_id }, None)
            .await;
        match result {
            Ok(t) => Ok(t.entry),
            Err(e) => {
                tracing::info!(admin_id, entity = %entity, to = %target_status, error = %e, "admin transition refused");
                Err(e)
            }
        }
    }

    /// Entries still pending after `older_than`. Reporting only: nothing
    /// here changes state.
    pub async fn stale_pending(&self, older_than: Duration) -> LedgerResult<Vec<LedgerEntry>> {
        let cutoff = Utc::now()
            .checked_sub_signed(older_than)
            .ok_or(LedgerError::InvalidWindow)?;
        self.ledger.pending_created_before(cutoff).await
    }
}
