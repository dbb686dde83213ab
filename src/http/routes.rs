use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::http::handlers::{admin, callbacks, ops, payments};
use crate::http::middleware::admin_auth::require_admin;
use crate::AppState;

/// Resident-facing routes; identity comes from `X-User-Id`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/settings", get(payments::get_settings))
        .route("/payments/monthly", post(payments::create_monthly_payment))
        .route(
            "/payments/invoices/:invoice_id/pay",
            post(payments::create_invoice_payment),
        )
        .route("/payments/history", get(payments::payment_history))
        .route("/payments/stats", get(payments::user_stats))
}

/// Unauthenticated gateway returns. Trust comes from the signature alone.
pub fn callback_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/callback/success", get(callbacks::success_redirect))
        .route("/payments/callback/failure", get(callbacks::failure_redirect))
        .route("/payments/callback", post(callbacks::notify))
}

pub fn admin_routes(admin_key: String) -> Router<AppState> {
    Router::new()
        .route("/admin/invoices", post(admin::issue_invoice))
        .route("/admin/ledger/transition", post(admin::transition))
        .route("/admin/ledger/:kind/:id/transitions", get(admin::entry_transitions))
        .route("/admin/ledger/stale-pending", get(admin::stale_pending))
        .route("/admin/payments", get(admin::all_payments))
        .route("/admin/stats", get(admin::global_stats))
        .layer(from_fn_with_state(admin_key, require_admin))
}

pub fn ops_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(ops::liveness))
        .route("/ops/readiness", get(ops::readiness))
        .route("/ops/liveness", get(ops::liveness))
}

/// The full application without rate limiting.
pub fn router(state: AppState, admin_key: String) -> Router {
    Router::new()
        .merge(api_routes())
        .merge(callback_routes())
        .merge(admin_routes(admin_key))
        .merge(ops_routes())
        .with_state(state)
}
