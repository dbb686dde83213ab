use serde::Serialize;

use crate::domain::ledger::{Actor, EntityKind, EntityRef, LedgerStatus};
use crate::error::{LedgerError, LedgerResult};
use crate::gateways::{GatewayCallback, GatewayOutcome};
use crate::service::ledger::Ledger;
use crate::service::redirect_builder::{SignedRedirectBuilder, Verification};

#[derive(Debug, Clone, Serialize)]
pub struct CallbackResult {
    pub entity: EntityRef,
    pub status: LedgerStatus,
    /// `false` for replays and for outcomes that leave the entry pending.
    pub applied: bool,
}

/// Where a verified gateway outcome moves a pending entry, if anywhere.
/// Invoices have no failed state: a failed attempt leaves them payable.
pub fn callback_target(kind: EntityKind, outcome: GatewayOutcome) -> Option<LedgerStatus> {
    match (kind, outcome) {
        (EntityKind::Monthly, GatewayOutcome::Success) => Some(LedgerStatus::Completed),
        (EntityKind::Monthly, GatewayOutcome::Failure) => Some(LedgerStatus::Failed),
        (EntityKind::Invoice, GatewayOutcome::Success) => Some(LedgerStatus::Processing),
        (EntityKind::Invoice, GatewayOutcome::Failure) => None,
    }
}

#[derive(Clone)]
pub struct GatewayCallbackHandler {
    pub ledger: Ledger,
    pub redirects: SignedRedirectBuilder,
}

impl GatewayCallbackHandler {
    pub async fn handle_callback(&self, callback: GatewayCallback) -> LedgerResult<CallbackResult> {
        let Some(entry) = self
            .ledger
            .find_by_reference(callback.transaction_reference())
            .await?
        else {
            tracing::warn!(
                target: "security",
                transaction_reference = %callback.transaction_reference(),
                status = ?callback.status(),
                "callback for unknown transaction rejected"
            );
            return Err(LedgerError::UnknownTransaction);
        };
        let entity = entry.entity_ref();

        if let Verification::Rejected(reason) = self.redirects.verify_callback(&entry, &callback)? {
            tracing::warn!(
                target: "security",
                transaction_reference = %callback.transaction_reference(),
                entity = %entity,
                status = %entry.status(),
                gateway_status = ?callback.status(),
                reason,
                "callback rejected"
            );
            return Err(LedgerError::SignatureMismatch);
        }

        if entry.status() != LedgerStatus::Pending {
            tracing::info!(entity = %entity, status = %entry.status(), "replayed callback ignored");
            return Ok(CallbackResult {
                entity,
                status: entry.status(),
                applied: false,
            });
        }

        let Some(outcome) = callback.outcome() else {
            tracing::info!(entity = %entity, gateway_status = ?callback.status(), "unsettled gateway status, entry stays pending");
            return Ok(CallbackResult {
                entity,
                status: entry.status(),
                applied: false,
            });
        };

        let Some(target) = callback_target(entity.kind, outcome) else {
            tracing::info!(entity = %entity, "failed invoice payment attempt, invoice stays pending");
            return Ok(CallbackResult {
                entity,
                status: entry.status(),
                applied: false,
            });
        };

        match self
            .ledger
            .transition(entity, target, Actor::Gateway, callback.gateway_ref_id())
            .await
        {
            Ok(t) => Ok(CallbackResult {
                entity,
                status: t.entry.status(),
                applied: t.changed,
            }),
            // Resolved by someone else between our read and our write.
            Err(LedgerError::IllegalTransition { from, .. }) if from != LedgerStatus::Pending => {
                tracing::info!(entity = %entity, status = %from, "callback arrived after entry was resolved");
                Ok(CallbackResult {
                    entity,
                    status: from,
                    applied: false,
                })
            }
            Err(e) => Err(e),
        }
    }
}
