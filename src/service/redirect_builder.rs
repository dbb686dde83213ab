use rust_decimal::Decimal;

use crate::config::GatewayConfig;
use crate::domain::ledger::{LedgerEntry, LedgerStatus};
use crate::error::{LedgerError, LedgerResult};
use crate::gateways::esewa::{format_amount, response_message, sign, signing_message, verify, SIGNED_FIELD_NAMES};
use crate::gateways::{GatewayCallback, GatewayRedirect, RedirectForm};

/// Builds the signed form for a pending ledger entry. Holds the only copy of
/// the gateway secret; the callback handler verifies through it as well.
#[derive(Clone)]
pub struct SignedRedirectBuilder {
    pub gateway: GatewayConfig,
}

impl SignedRedirectBuilder {
    pub fn new(gateway: GatewayConfig) -> Self {
        Self { gateway }
    }

    pub fn product_code(&self) -> &str {
        &self.gateway.product_code
    }

    fn message_for(&self, entry: &LedgerEntry) -> String {
        signing_message(
            &format_amount(entry.amount()),
            entry.transaction_reference(),
            &self.gateway.product_code,
        )
    }

    pub fn build_redirect(&self, entry: &LedgerEntry) -> LedgerResult<GatewayRedirect> {
        if entry.status() != LedgerStatus::Pending {
            return Err(LedgerError::InvalidState {
                kind: entry.entity_ref().kind,
                status: entry.status(),
            });
        }

        let total_amount = format_amount(entry.amount());
        let signature = sign(&self.gateway.secret_key, &self.message_for(entry))?;

        Ok(GatewayRedirect {
            form_url: self.gateway.form_url.clone(),
            fields: RedirectForm {
                amount: total_amount.clone(),
                tax_amount: "0".to_string(),
                total_amount,
                transaction_uuid: entry.transaction_reference().to_string(),
                product_code: self.gateway.product_code.clone(),
                product_service_charge: "0".to_string(),
                product_delivery_charge: "0".to_string(),
                success_url: self.gateway.success_url(),
                failure_url: self.gateway.failure_url(),
                signed_field_names: SIGNED_FIELD_NAMES.to_string(),
                signature,
            },
        })
    }

    /// Checks a gateway response against `entry`. The signature must cover
    /// the reference, status, amount and product code, verify under our
    /// secret, and the signed amount and product code must be this entry's.
    pub fn verify_callback(&self, entry: &LedgerEntry, callback: &GatewayCallback) -> LedgerResult<Verification> {
        let Some(message) = response_message(callback) else {
            return Ok(Verification::Rejected("required fields not signed"));
        };
        if !verify(&self.gateway.secret_key, &message, callback.signature())? {
            return Ok(Verification::Rejected("signature mismatch"));
        }
        if callback.field("product_code") != Some(self.gateway.product_code.as_str()) {
            return Ok(Verification::Rejected("product code mismatch"));
        }
        let signed_amount = callback
            .field("total_amount")
            .and_then(|raw| raw.trim().replace(',', "").parse::<Decimal>().ok());
        if signed_amount != Some(entry.amount()) {
            return Ok(Verification::Rejected("amount mismatch"));
        }
        Ok(Verification::Verified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Rejected(&'static str),
}
