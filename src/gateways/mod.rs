use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod esewa;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayOutcome {
    Success,
    Failure,
}

/// An inbound gateway response, whichever endpoint it arrived on. Field
/// values are kept exactly as transmitted because the signature covers that
/// text, not a parsed form of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCallback {
    fields: BTreeMap<String, String>,
    signature: String,
}

impl GatewayCallback {
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>, signature: impl Into<String>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            signature: signature.into(),
        }
    }

    /// Reads a response document. Scalars are kept in their JSON text form,
    /// so `1000.0` stays `1000.0`; nested values are dropped.
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(object) = value else {
            bail!("callback payload is not an object");
        };

        let mut fields = BTreeMap::new();
        let mut signature = None;
        for (name, value) in object {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            if name == "signature" {
                signature = Some(text);
            } else {
                fields.insert(name, text);
            }
        }

        let signature = signature.context("callback payload has no signature")?;
        if !fields.contains_key("transaction_uuid") {
            bail!("callback payload has no transaction_uuid");
        }
        Ok(Self { fields, signature })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn transaction_reference(&self) -> &str {
        self.field("transaction_uuid").unwrap_or_default()
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Field names the signature claims to cover, in signing order.
    pub fn signed_names(&self) -> Vec<&str> {
        self.field("signed_field_names")
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_signed(&self, name: &str) -> bool {
        self.signed_names().contains(&name)
    }

    pub fn status(&self) -> Option<&str> {
        self.field("status")
    }

    /// `None` for statuses that settle nothing yet (`PENDING`, `AMBIGUOUS`,
    /// refunds).
    pub fn outcome(&self) -> Option<GatewayOutcome> {
        let status = self.status()?.trim();
        if status.eq_ignore_ascii_case("COMPLETE") {
            Some(GatewayOutcome::Success)
        } else if status.eq_ignore_ascii_case("CANCELED") || status.eq_ignore_ascii_case("NOT_FOUND") {
            Some(GatewayOutcome::Failure)
        } else {
            None
        }
    }

    /// Gateway-side transaction code, only when the signature covers it.
    pub fn gateway_ref_id(&self) -> Option<String> {
        if self.is_signed("transaction_code") {
            self.field("transaction_code").map(str::to_string)
        } else {
            None
        }
    }
}

/// The exact field set posted by the browser to the gateway form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectForm {
    pub amount: String,
    pub tax_amount: String,
    pub total_amount: String,
    pub transaction_uuid: String,
    pub product_code: String,
    pub product_service_charge: String,
    pub product_delivery_charge: String,
    pub success_url: String,
    pub failure_url: String,
    pub signed_field_names: String,
    pub signature: String,
}

/// Where the browser should post `fields`.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayRedirect {
    pub form_url: String,
    pub fields: RedirectForm,
}
