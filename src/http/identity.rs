use axum::http::HeaderMap;

use crate::error::LedgerError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const ADMIN_ID_HEADER: &str = "X-Admin-Id";

/// Administrator identity attached by the admin middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminIdentity {
    pub admin_id: i64,
}

fn numeric_header(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
}

pub fn user_id(headers: &HeaderMap) -> Result<i64, LedgerError> {
    numeric_header(headers, USER_ID_HEADER).ok_or(LedgerError::Unauthorized)
}

pub fn admin_id(headers: &HeaderMap) -> Option<i64> {
    numeric_header(headers, ADMIN_ID_HEADER)
}
