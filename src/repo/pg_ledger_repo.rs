use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::invoice::{Invoice, InvoicePricing};
use crate::domain::ledger::{EntityKind, EntityRef, LedgerEntry, LedgerStatus, TransitionRecord};
use crate::domain::payment::MonthlyPayment;
use crate::repo::ledger_repo::{InsertOutcome, LedgerStore};

const MONTHLY_COLUMNS: &str =
    "id, user_id, month, amount, transaction_reference, status, gateway_ref_id, created_at";
const INVOICE_COLUMNS: &str = "id, special_request_id, user_id, weight_kg, per_kg_rate, amount, transaction_reference, status, gateway_ref_id, created_at";

#[derive(Clone)]
pub struct PgLedgerRepo {
    pub pool: PgPool,
}

fn parse_status(raw: String) -> Result<LedgerStatus> {
    LedgerStatus::parse(&raw).ok_or_else(|| anyhow!("unknown ledger status in storage: {}", raw))
}

fn monthly_from_row(row: &PgRow) -> Result<MonthlyPayment> {
    Ok(MonthlyPayment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        month: row.get("month"),
        amount: row.get("amount"),
        transaction_reference: row.get("transaction_reference"),
        status: parse_status(row.get("status"))?,
        gateway_ref_id: row.get("gateway_ref_id"),
        created_at: row.get("created_at"),
    })
}

fn invoice_from_row(row: &PgRow) -> Result<Invoice> {
    Ok(Invoice {
        id: row.get("id"),
        special_request_id: row.get("special_request_id"),
        user_id: row.get("user_id"),
        weight_kg: row.get("weight_kg"),
        per_kg_rate: row.get("per_kg_rate"),
        amount: row.get("amount"),
        transaction_reference: row.get("transaction_reference"),
        status: parse_status(row.get("status"))?,
        gateway_ref_id: row.get("gateway_ref_id"),
        created_at: row.get("created_at"),
    })
}

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Monthly => "monthly_payments",
        EntityKind::Invoice => "invoices",
    }
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerRepo {
    async fn find_monthly(&self, user_id: i64, month: NaiveDate) -> Result<Option<MonthlyPayment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM monthly_payments WHERE user_id = $1 AND month = $2",
            MONTHLY_COLUMNS
        ))
        .bind(user_id)
        .bind(month)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(monthly_from_row).transpose()
    }

    async fn insert_monthly(&self, payment: &MonthlyPayment) -> Result<InsertOutcome<MonthlyPayment>> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO monthly_payments (id, user_id, month, amount, transaction_reference, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            MONTHLY_COLUMNS
        ))
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.month)
        .bind(payment.amount)
        .bind(&payment.transaction_reference)
        .bind(payment.status.as_str())
        .bind(payment.created_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(monthly_from_row(&row)?)),
            None => Ok(InsertOutcome::Conflict),
        }
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let row = sqlx::query(&format!("SELECT {} FROM invoices WHERE id = $1", INVOICE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn find_invoice_by_request(&self, special_request_id: i64) -> Result<Option<Invoice>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE special_request_id = $1",
            INVOICE_COLUMNS
        ))
        .bind(special_request_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<InsertOutcome<Invoice>> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO invoices (
                id, special_request_id, user_id, weight_kg, per_kg_rate, amount,
                transaction_reference, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice.id)
        .bind(invoice.special_request_id)
        .bind(invoice.user_id)
        .bind(invoice.weight_kg)
        .bind(invoice.per_kg_rate)
        .bind(invoice.amount)
        .bind(&invoice.transaction_reference)
        .bind(invoice.status.as_str())
        .bind(invoice.created_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(invoice_from_row(&row)?)),
            None => Ok(InsertOutcome::Conflict),
        }
    }

    async fn reprice_pending_invoice(
        &self,
        special_request_id: i64,
        pricing: &InvoicePricing,
    ) -> Result<Option<Invoice>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE invoices
            SET weight_kg = $2, per_kg_rate = $3, amount = $4, transaction_reference = $5, updated_at = now()
            WHERE special_request_id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(special_request_id)
        .bind(pricing.weight_kg)
        .bind(pricing.per_kg_rate)
        .bind(pricing.amount)
        .bind(&pricing.transaction_reference)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn find_by_reference(&self, transaction_reference: &str) -> Result<Option<LedgerEntry>> {
        let monthly = sqlx::query(&format!(
            "SELECT {} FROM monthly_payments WHERE transaction_reference = $1",
            MONTHLY_COLUMNS
        ))
        .bind(transaction_reference)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = monthly {
            return Ok(Some(LedgerEntry::Monthly(monthly_from_row(&row)?)));
        }

        let invoice = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE transaction_reference = $1",
            INVOICE_COLUMNS
        ))
        .bind(transaction_reference)
        .fetch_optional(&self.pool)
        .await?;

        invoice
            .as_ref()
            .map(|row| invoice_from_row(row).map(LedgerEntry::Invoice))
            .transpose()
    }

    async fn get_entry(&self, entity: EntityRef) -> Result<Option<LedgerEntry>> {
        match entity.kind {
            EntityKind::Monthly => {
                let row = sqlx::query(&format!(
                    "SELECT {} FROM monthly_payments WHERE id = $1",
                    MONTHLY_COLUMNS
                ))
                .bind(entity.id)
                .fetch_optional(&self.pool)
                .await?;
                row.as_ref()
                    .map(|r| monthly_from_row(r).map(LedgerEntry::Monthly))
                    .transpose()
            }
            EntityKind::Invoice => Ok(self.get_invoice(entity.id).await?.map(LedgerEntry::Invoice)),
        }
    }

    async fn compare_and_set_status(&self, record: &TransitionRecord) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(&format!(
            r#"
            UPDATE {}
            SET status = $3, gateway_ref_id = COALESCE($4, gateway_ref_id), updated_at = now()
            WHERE id = $1 AND status = $2
            "#,
            table_for(record.entity.kind)
        ))
        .bind(record.entity.id)
        .bind(record.from_status.as_str())
        .bind(record.to_status.as_str())
        .bind(&record.gateway_ref_id)
        .execute(tx.as_mut())
        .await?;

        if updated.rows_affected() != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO ledger_transitions (entity_kind, entity_id, from_status, to_status, actor, gateway_ref_id, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.entity.kind.as_str())
        .bind(record.entity.id)
        .bind(record.from_status.as_str())
        .bind(record.to_status.as_str())
        .bind(&record.actor)
        .bind(&record.gateway_ref_id)
        .bind(record.recorded_at)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_entries(&self, user_id: Option<i64>) -> Result<Vec<LedgerEntry>> {
        let monthly = sqlx::query(&format!(
            "SELECT {} FROM monthly_payments WHERE ($1::BIGINT IS NULL OR user_id = $1)",
            MONTHLY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        let invoices = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE ($1::BIGINT IS NULL OR user_id = $1)",
            INVOICE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(monthly.len() + invoices.len());
        for row in &monthly {
            entries.push(LedgerEntry::Monthly(monthly_from_row(row)?));
        }
        for row in &invoices {
            entries.push(LedgerEntry::Invoice(invoice_from_row(row)?));
        }
        entries.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(entries)
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<LedgerEntry>> {
        let monthly = sqlx::query(&format!(
            "SELECT {} FROM monthly_payments WHERE status = 'pending' AND created_at < $1 ORDER BY created_at ASC",
            MONTHLY_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        let invoices = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE status = 'pending' AND created_at < $1 ORDER BY created_at ASC",
            INVOICE_COLUMNS
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(monthly.len() + invoices.len());
        for row in &monthly {
            entries.push(LedgerEntry::Monthly(monthly_from_row(row)?));
        }
        for row in &invoices {
            entries.push(LedgerEntry::Invoice(invoice_from_row(row)?));
        }
        entries.sort_by_key(|e| e.created_at());
        Ok(entries)
    }

    async fn list_transitions(&self, entity: EntityRef) -> Result<Vec<TransitionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT from_status, to_status, actor, gateway_ref_id, recorded_at
            FROM ledger_transitions
            WHERE entity_kind = $1 AND entity_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(entity.kind.as_str())
        .bind(entity.id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TransitionRecord {
                    entity,
                    from_status: parse_status(row.get("from_status"))?,
                    to_status: parse_status(row.get("to_status"))?,
                    actor: row.get("actor"),
                    gateway_ref_id: row.get("gateway_ref_id"),
                    recorded_at: row.get("recorded_at"),
                })
            })
            .collect()
    }
}
