use crate::domain::invoice::{Invoice, IssueInvoiceRequest};
use crate::error::{LedgerError, LedgerResult};
use crate::repo::special_requests_repo::ApprovalState;
use crate::service::ledger::Ledger;

/// Staff-facing entry point for pricing a collected special pickup.
#[derive(Clone)]
pub struct InvoiceIssuer {
    pub ledger: Ledger,
}

impl InvoiceIssuer {
    pub async fn issue(&self, admin_id: i64, req: IssueInvoiceRequest) -> LedgerResult<Invoice> {
        let request = self
            .ledger
            .special_requests
            .lookup(req.special_request_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("special request {}", req.special_request_id)))?;

        if request.approval != ApprovalState::Approved {
            tracing::info!(
                admin_id,
                special_request_id = request.id,
                approval = ?request.approval,
                "invoice refused for unapproved request"
            );
            return Err(LedgerError::RequestNotApproved(request.id));
        }

        let invoice = self.ledger.open_invoice(request.id, req.weight_kg).await?;
        tracing::info!(
            admin_id,
            invoice_id = %invoice.id,
            owner_id = request.owner_id,
            "invoice issued by staff"
        );
        Ok(invoice)
    }
}
