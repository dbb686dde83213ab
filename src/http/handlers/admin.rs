use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::invoice::IssueInvoiceRequest;
use crate::domain::ledger::{EntityKind, EntityRef};
use crate::error::LedgerError;
use crate::http::errors::error_response;
use crate::http::identity::AdminIdentity;
use crate::service::reconciliation::AdminTransitionRequest;
use crate::service::statistics::StatsScope;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StaleQuery {
    pub older_than_hours: Option<i64>,
}

pub async fn issue_invoice(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Json(req): Json<IssueInvoiceRequest>,
) -> impl IntoResponse {
    match state.invoices.issue(admin.admin_id, req).await {
        Ok(invoice) => (axum::http::StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn transition(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Json(req): Json<AdminTransitionRequest>,
) -> impl IntoResponse {
    let entity = EntityRef {
        kind: req.kind,
        id: req.id,
    };
    match state
        .reconciliation
        .admin_transition(entity, req.target_status, admin.admin_id)
        .await
    {
        Ok(entry) => (axum::http::StatusCode::OK, Json(entry)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn all_payments(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.history(None).await {
        Ok(entries) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({ "entries": entries })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn global_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state
        .statistics
        .stats(StatsScope::Global, chrono::Utc::now().date_naive())
        .await
    {
        Ok(stats) => (axum::http::StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn stale_pending(
    State(state): State<AppState>,
    Query(query): Query<StaleQuery>,
) -> impl IntoResponse {
    let hours = query
        .older_than_hours
        .filter(|h| *h >= 0)
        .unwrap_or(state.stale_pending_hours);
    let Some(older_than) = chrono::Duration::try_hours(hours) else {
        return error_response(LedgerError::InvalidWindow);
    };
    match state.reconciliation.stale_pending(older_than).await {
        Ok(entries) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({
                "older_than_hours": hours,
                "count": entries.len(),
                "entries": entries
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn entry_transitions(
    State(state): State<AppState>,
    Path((kind, id)): Path<(EntityKind, Uuid)>,
) -> impl IntoResponse {
    let entity = EntityRef { kind, id };
    let entry = match state.ledger.get_entry(entity).await {
        Ok(entry) => entry,
        Err(e) => return error_response(e),
    };
    match state.ledger.transitions(entity).await {
        Ok(transitions) => (
            axum::http::StatusCode::OK,
            Json(serde_json::json!({ "entry": entry, "transitions": transitions })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
