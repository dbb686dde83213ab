use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::gateways::esewa::decode_callback_data;
use crate::gateways::GatewayCallback;
use crate::http::errors::{bad_request, error_response};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub data: Option<String>,
}

async fn dispatch(state: &AppState, callback: GatewayCallback) -> Response {
    match state.callbacks.handle_callback(callback).await {
        Ok(result) => (axum::http::StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}

fn from_query(query: CallbackQuery) -> Result<GatewayCallback, Response> {
    let Some(data) = query.data else {
        return Err(bad_request("MALFORMED_CALLBACK", "missing data parameter"));
    };
    match decode_callback_data(&data) {
        Ok(callback) => Ok(callback),
        Err(e) => {
            tracing::warn!(target: "security", error = %e, "undecodable gateway callback");
            Err(bad_request("MALFORMED_CALLBACK", "callback data could not be decoded"))
        }
    }
}

/// Browser return from the gateway's success URL.
pub async fn success_redirect(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    match from_query(query) {
        Ok(callback) => dispatch(&state, callback).await,
        Err(resp) => resp,
    }
}

/// Browser return from the failure URL. The outcome still comes from the
/// signed status; the URL a browser lands on proves nothing.
pub async fn failure_redirect(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    match from_query(query) {
        Ok(callback) => dispatch(&state, callback).await,
        Err(resp) => resp,
    }
}

/// Server-to-server delivery of the same response document, as plain JSON.
pub async fn notify(State(state): State<AppState>, Json(payload): Json<Value>) -> impl IntoResponse {
    match GatewayCallback::from_json(payload) {
        Ok(callback) => dispatch(&state, callback).await,
        Err(e) => {
            tracing::warn!(target: "security", error = %e, "malformed gateway notification");
            bad_request("MALFORMED_CALLBACK", "callback payload is incomplete")
        }
    }
}
