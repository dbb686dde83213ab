use anyhow::{Context, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use hmac::{Hmac, Mac};
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::Sha256;

use crate::gateways::GatewayCallback;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNED_FIELD_NAMES: &str = "total_amount,transaction_uuid,product_code";

/// Amounts always travel with two decimals, e.g. `500.00`.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

pub fn signing_message(total_amount: &str, transaction_uuid: &str, product_code: &str) -> String {
    format!(
        "total_amount={},transaction_uuid={},product_code={}",
        total_amount, transaction_uuid, product_code
    )
}

fn mac_for(secret: &str, message: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).context("invalid gateway secret key")?;
    mac.update(message.as_bytes());
    Ok(mac)
}

pub fn sign(secret: &str, message: &str) -> Result<String> {
    let mac = mac_for(secret, message)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a base64 signature. Malformed input is a mismatch.
pub fn verify(secret: &str, message: &str, provided: &str) -> Result<bool> {
    let Ok(raw) = STANDARD.decode(provided.trim()) else {
        return Ok(false);
    };
    let mac = mac_for(secret, message)?;
    Ok(mac.verify_slice(&raw).is_ok())
}

/// Fields a response signature must cover before any of them is trusted.
pub const RESPONSE_SIGNED_FIELDS: [&str; 4] = ["transaction_uuid", "status", "total_amount", "product_code"];

/// Rebuilds the text the gateway signed: `name=value` for every name in the
/// response's own `signed_field_names`, in that order. `None` when a named
/// field is absent or a required field is not covered.
pub fn response_message(callback: &GatewayCallback) -> Option<String> {
    let names = callback.signed_names();
    if !RESPONSE_SIGNED_FIELDS.iter().all(|f| names.contains(f)) {
        return None;
    }
    let pairs = names
        .iter()
        .map(|name| callback.field(name).map(|value| format!("{name}={value}")))
        .collect::<Option<Vec<_>>>()?;
    Some(pairs.join(","))
}

/// Decodes the `data` query parameter: base64 over the gateway's JSON response.
/// Accepts standard or URL-safe base64. A `+` that arrived as a space after
/// query decoding is restored first.
pub fn decode_callback_data(data: &str) -> Result<GatewayCallback> {
    let cleaned = data.trim().replace(' ', "+");
    let raw = STANDARD
        .decode(&cleaned)
        .or_else(|_| URL_SAFE.decode(&cleaned))
        .context("callback data is not valid base64")?;
    let value: serde_json::Value = serde_json::from_slice(&raw).context("callback data is not valid JSON")?;
    GatewayCallback::from_json(value)
}
