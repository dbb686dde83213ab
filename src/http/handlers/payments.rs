use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::ledger::LedgerEntry;
use crate::domain::invoice::Invoice;
use crate::domain::payment::{MonthlyPayment, OpenMonthlyPaymentRequest};
use crate::error::LedgerError;
use crate::gateways::GatewayRedirect;
use crate::http::errors::error_response;
use crate::http::identity::user_id;
use crate::service::statistics::StatsScope;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MonthlyPaymentResponse {
    pub payment: MonthlyPayment,
    /// Absent when the month's payment is no longer pending.
    pub redirect: Option<GatewayRedirect>,
}

#[derive(Debug, Serialize)]
pub struct InvoicePaymentResponse {
    pub invoice: Invoice,
    pub redirect: GatewayRedirect,
}

pub async fn get_settings(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.settings().await {
        Ok(settings) => (axum::http::StatusCode::OK, Json(settings)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn create_monthly_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<OpenMonthlyPaymentRequest>,
) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    let payment = match state.ledger.open_monthly_payment(user_id, &req.month).await {
        Ok(p) => p,
        Err(e) => return error_response(e),
    };

    let entry = LedgerEntry::Monthly(payment.clone());
    let redirect = match state.redirects.build_redirect(&entry) {
        Ok(r) => Some(r),
        Err(LedgerError::InvalidState { .. }) => None,
        Err(e) => return error_response(e),
    };

    (
        axum::http::StatusCode::OK,
        Json(MonthlyPaymentResponse { payment, redirect }),
    )
        .into_response()
}

pub async fn create_invoice_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(invoice_id): Path<Uuid>,
) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    let invoice = match state.ledger.invoice_for_user(user_id, invoice_id).await {
        Ok(i) => i,
        Err(e) => return error_response(e),
    };

    let entry = LedgerEntry::Invoice(invoice.clone());
    match state.redirects.build_redirect(&entry) {
        Ok(redirect) => (
            axum::http::StatusCode::OK,
            Json(InvoicePaymentResponse { invoice, redirect }),
        )
            .into_response(),
        Err(LedgerError::InvalidState { status, .. }) => error_response(LedgerError::InvoiceLocked(status)),
        Err(e) => error_response(e),
    }
}

pub async fn payment_history(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    match state.ledger.history(Some(user_id)).await {
        Ok(entries) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({ "user_id": user_id, "entries": entries })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn user_stats(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let user_id = match user_id(&headers) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };

    match state
        .statistics
        .stats(StatsScope::User(user_id), chrono::Utc::now().date_naive())
        .await
    {
        Ok(stats) => (axum::http::StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}
