use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::http::errors::envelope;
use crate::http::identity::{admin_id, AdminIdentity};

/// Requires the internal API key plus an `X-Admin-Id`; the parsed identity is
/// handed to handlers as a request extension.
pub async fn require_admin(
    State(expected): State<String>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get("X-Internal-Api-Key")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    let key_ok = !expected.is_empty() && provided == expected;

    let admin = admin_id(request.headers());
    match admin {
        Some(admin_id) if key_ok => {
            request.extensions_mut().insert(AdminIdentity { admin_id });
            next.run(request).await
        }
        _ => {
            tracing::warn!(
                target: "security",
                path = %request.uri().path(),
                has_admin_id = admin.is_some(),
                "admin request rejected"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(envelope("UNAUTHORIZED", "admin credentials required", None)),
            )
                .into_response()
        }
    }
}
