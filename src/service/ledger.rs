use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::invoice::{invoice_amount, normalize_weight, Invoice, InvoicePricing};
use crate::domain::ledger::{
    check_transition, Actor, EntityRef, LedgerEntry, LedgerStatus, TransitionCheck,
    TransitionRecord,
};
use crate::domain::payment::{BillingMonth, MonthlyPayment};
use crate::domain::settings::PaymentSettings;
use crate::error::{LedgerError, LedgerResult};
use crate::repo::ledger_repo::{InsertOutcome, LedgerStore};
use crate::repo::settings_repo::SettingsSource;
use crate::repo::special_requests_repo::SpecialRequestDirectory;

/// Attempts per write: the first try plus one retry after a lost race.
const WRITE_ATTEMPTS: usize = 2;

fn new_transaction_reference() -> String {
    Uuid::new_v4().to_string()
}

/// Result of a transition request. `changed` is false for no-ops.
#[derive(Debug, Clone)]
pub struct Transitioned {
    pub entry: LedgerEntry,
    pub changed: bool,
}

/// The only component that persists ledger state.
#[derive(Clone)]
pub struct Ledger {
    pub store: Arc<dyn LedgerStore>,
    pub settings: Arc<dyn SettingsSource>,
    pub special_requests: Arc<dyn SpecialRequestDirectory>,
}

impl Ledger {
    pub async fn settings(&self) -> LedgerResult<PaymentSettings> {
        Ok(self.settings.get_settings().await?)
    }

    /// Returns the payment for (`user_id`, `month`), creating it in `pending`
    /// at the current monthly fee when none exists yet.
    pub async fn open_monthly_payment(&self, user_id: i64, month: &str) -> LedgerResult<MonthlyPayment> {
        let period =
            BillingMonth::parse(month).ok_or_else(|| LedgerError::InvalidPeriod(month.to_string()))?;

        if let Some(existing) = self.store.find_monthly(user_id, period.date()).await? {
            return Ok(existing);
        }

        let settings = self.settings.get_settings().await?;
        let payment = MonthlyPayment {
            id: Uuid::new_v4(),
            user_id,
            month: period.date(),
            amount: settings.monthly_fee,
            transaction_reference: new_transaction_reference(),
            status: LedgerStatus::Pending,
            gateway_ref_id: None,
            created_at: Utc::now(),
        };

        match self.store.insert_monthly(&payment).await? {
            InsertOutcome::Inserted(created) => {
                tracing::info!(
                    payment_id = %created.id,
                    user_id,
                    month = %created.month,
                    amount = %created.amount,
                    "monthly payment opened"
                );
                Ok(created)
            }
            InsertOutcome::Conflict => {
                tracing::debug!(user_id, month = %period.date(), "monthly payment insert lost race, reading winner");
                self.store
                    .find_monthly(user_id, period.date())
                    .await?
                    .ok_or(LedgerError::PersistenceConflict)
            }
        }
    }

    /// Creates the invoice for an approved special request, or re-prices it
    /// while it is still pending.
    pub async fn open_invoice(&self, special_request_id: i64, weight_kg: Decimal) -> LedgerResult<Invoice> {
        let weight_kg = normalize_weight(weight_kg).ok_or(LedgerError::InvalidWeight)?;
        if !self.special_requests.is_approved(special_request_id).await? {
            return Err(LedgerError::RequestNotApproved(special_request_id));
        }
        let user_id = self
            .special_requests
            .get_owner(special_request_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("special request {}", special_request_id)))?;

        let settings = self.settings.get_settings().await?;
        let amount = invoice_amount(weight_kg, settings.per_kg_rate).ok_or(LedgerError::InvalidWeight)?;

        for _ in 0..WRITE_ATTEMPTS {
            match self.store.find_invoice_by_request(special_request_id).await? {
                None => {
                    let invoice = Invoice {
                        id: Uuid::new_v4(),
                        special_request_id,
                        user_id,
                        weight_kg,
                        per_kg_rate: settings.per_kg_rate,
                        amount,
                        transaction_reference: new_transaction_reference(),
                        status: LedgerStatus::Pending,
                        gateway_ref_id: None,
                        created_at: Utc::now(),
                    };
                    if let InsertOutcome::Inserted(created) = self.store.insert_invoice(&invoice).await? {
                        tracing::info!(
                            invoice_id = %created.id,
                            special_request_id,
                            weight_kg = %created.weight_kg,
                            amount = %created.amount,
                            "invoice issued"
                        );
                        return Ok(created);
                    }
                }
                Some(existing) if existing.status == LedgerStatus::Pending => {
                    let pricing = InvoicePricing {
                        weight_kg,
                        per_kg_rate: settings.per_kg_rate,
                        amount,
                        transaction_reference: new_transaction_reference(),
                    };
                    if let Some(updated) = self
                        .store
                        .reprice_pending_invoice(special_request_id, &pricing)
                        .await?
                    {
                        tracing::info!(
                            invoice_id = %updated.id,
                            special_request_id,
                            weight_kg = %updated.weight_kg,
                            amount = %updated.amount,
                            "pending invoice re-priced"
                        );
                        return Ok(updated);
                    }
                }
                Some(existing) => return Err(LedgerError::InvoiceLocked(existing.status)),
            }
            tracing::debug!(special_request_id, "invoice write lost race, re-reading");
        }

        Err(LedgerError::PersistenceConflict)
    }

    /// Applies one edge of the transition table. Requesting the current
    /// status again succeeds without writing.
    pub async fn transition(
        &self,
        entity: EntityRef,
        target: LedgerStatus,
        actor: Actor,
        gateway_ref_id: Option<String>,
    ) -> LedgerResult<Transitioned> {
        for _ in 0..WRITE_ATTEMPTS {
            let entry = self.get_entry(entity).await?;
            let from = entry.status();

            match check_transition(entity.kind, from, target, &actor) {
                TransitionCheck::NoOp => {
                    return Ok(Transitioned {
                        entry,
                        changed: false,
                    })
                }
                TransitionCheck::Illegal => {
                    return Err(LedgerError::IllegalTransition {
                        kind: entity.kind,
                        from,
                        to: target,
                    })
                }
                TransitionCheck::Allowed => {}
            }

            let record = TransitionRecord {
                entity,
                from_status: from,
                to_status: target,
                actor: actor.label(),
                gateway_ref_id: gateway_ref_id.clone(),
                recorded_at: Utc::now(),
            };
            if self.store.compare_and_set_status(&record).await? {
                tracing::info!(
                    entity = %entity,
                    from = %from,
                    to = %target,
                    actor = %record.actor,
                    "ledger transition committed"
                );
                return Ok(Transitioned {
                    entry: self.get_entry(entity).await?,
                    changed: true,
                });
            }
            tracing::warn!(entity = %entity, from = %from, to = %target, "status changed underneath transition, retrying");
        }

        Err(LedgerError::PersistenceConflict)
    }

    pub async fn get_entry(&self, entity: EntityRef) -> LedgerResult<LedgerEntry> {
        self.store
            .get_entry(entity)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("{} {}", entity.kind, entity.id)))
    }

    pub async fn find_by_reference(&self, transaction_reference: &str) -> LedgerResult<Option<LedgerEntry>> {
        Ok(self.store.find_by_reference(transaction_reference).await?)
    }

    /// The caller's own invoice; someone else's invoice reads as missing.
    pub async fn invoice_for_user(&self, user_id: i64, invoice_id: Uuid) -> LedgerResult<Invoice> {
        match self.store.get_invoice(invoice_id).await? {
            Some(invoice) if invoice.user_id == user_id => Ok(invoice),
            _ => Err(LedgerError::NotFound(format!("invoice {}", invoice_id))),
        }
    }

    pub async fn history(&self, user_id: Option<i64>) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(self.store.list_entries(user_id).await?)
    }

    pub async fn pending_created_before(&self, cutoff: DateTime<Utc>) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(self.store.list_pending_created_before(cutoff).await?)
    }

    pub async fn transitions(&self, entity: EntityRef) -> LedgerResult<Vec<TransitionRecord>> {
        Ok(self.store.list_transitions(entity).await?)
    }
}
