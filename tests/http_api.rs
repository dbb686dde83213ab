use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use serde_json::{json, Value};
use tower::ServiceExt;
use waste_payments::config::GatewayConfig;
use waste_payments::domain::settings::PaymentSettings;
use waste_payments::gateways::esewa::{response_message, sign};
use waste_payments::gateways::GatewayCallback;
use waste_payments::http::routes::router;
use waste_payments::repo::memory_ledger_repo::MemoryLedgerRepo;
use waste_payments::repo::settings_repo::StaticSettings;
use waste_payments::repo::special_requests_repo::{ApprovalState, MemorySpecialRequests};
use waste_payments::AppState;

const ADMIN_KEY: &str = "test-admin-key";
const SECRET: &str = "8gBm/:&EnhH.1/q";

async fn app() -> (Router, MemorySpecialRequests) {
    let requests = MemorySpecialRequests::new();
    requests.upsert(42, 7, ApprovalState::Approved).await;
    requests.upsert(43, 7, ApprovalState::Pending).await;

    let state = AppState::assemble(
        Arc::new(MemoryLedgerRepo::new()),
        Arc::new(StaticSettings::new(PaymentSettings::default())),
        Arc::new(requests.clone()),
        GatewayConfig {
            secret_key: SECRET.to_string(),
            product_code: "EPAYTEST".to_string(),
            form_url: "https://rc-epay.esewa.com.np/api/epay/main/v2/form".to_string(),
            public_base_url: "http://portal.test".to_string(),
        },
        None,
        redis::Client::open("redis://127.0.0.1:6379/").expect("redis url"),
        24,
    );
    (router(state, ADMIN_KEY.to_string()), requests)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn user_post(uri: &str, user_id: i64, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-User-Id", user_id.to_string())
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-Internal-Api-Key", ADMIN_KEY)
        .header("X-Admin-Id", "1");
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

const RESPONSE_FIELDS: &str = "transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names";

/// The JSON response the gateway sends back for a submitted form, signed over
/// its own `signed_field_names` with the merchant secret.
fn gateway_payload(fields: &Value, status: &str) -> Value {
    let text = |name: &str| fields[name].as_str().expect("form field").to_string();
    let pairs = [
        ("transaction_code", "000AWEO".to_string()),
        ("status", status.to_string()),
        ("total_amount", text("total_amount")),
        ("transaction_uuid", text("transaction_uuid")),
        ("product_code", text("product_code")),
        ("signed_field_names", RESPONSE_FIELDS.to_string()),
    ];
    let message = response_message(&GatewayCallback::new(pairs.clone(), "")).expect("message");

    let mut payload: serde_json::Map<String, Value> = pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), Value::String(value)))
        .collect();
    payload.insert("signature".to_string(), json!(sign(SECRET, &message).expect("sign")));
    Value::Object(payload)
}

fn encode(payload: &Value) -> String {
    base64::engine::general_purpose::URL_SAFE.encode(payload.to_string())
}

fn success_data(fields: &Value) -> String {
    encode(&gateway_payload(fields, "COMPLETE"))
}

fn callback_post(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/payments/callback")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn monthly_status(app: &Router, user_id: i64, month: &str) -> Value {
    let (_, body) = send(app, user_post("/payments/monthly", user_id, json!({ "month": month }))).await;
    body["payment"]["status"].clone()
}

#[tokio::test]
async fn settings_are_public() {
    let (app, _) = app().await;
    let (status, body) = send(&app, get("/payments/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monthly_fee"], "500.00");
    assert_eq!(body["per_kg_rate"], "50.00");
}

#[tokio::test]
async fn monthly_payment_requires_identity() {
    let (app, _) = app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/payments/monthly")
        .header("content-type", "application/json")
        .body(Body::from(json!({"month": "2024-05-01"}).to_string()))
        .expect("request");
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn invalid_month_is_a_bad_request() {
    let (app, _) = app().await;
    let (status, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-05-17"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PERIOD");
}

#[tokio::test]
async fn monthly_payment_redirect_and_success_callback() {
    let (app, _) = app().await;

    let (status, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-05-01"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "pending");
    let fields = body["redirect"]["fields"].clone();
    assert_eq!(fields["total_amount"], "500.00");
    assert_eq!(fields["product_code"], "EPAYTEST");
    assert_eq!(fields["product_service_charge"], "0");
    assert_eq!(fields["failure_url"], "http://portal.test/payments/callback/failure");
    assert_eq!(fields["signed_field_names"], "total_amount,transaction_uuid,product_code");
    assert_eq!(
        body["redirect"]["form_url"],
        "https://rc-epay.esewa.com.np/api/epay/main/v2/form"
    );

    let uri = format!("/payments/callback/success?data={}", success_data(&fields));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["applied"], true);

    // Replay through the same URL changes nothing.
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);

    // A settled month no longer offers a redirect.
    let (status, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-05-01"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "completed");
    assert!(body["redirect"].is_null());
}

#[tokio::test]
async fn failure_endpoint_applies_signed_cancellation() {
    let (app, _) = app().await;
    let (_, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-06-01"}))).await;
    let fields = body["redirect"]["fields"].clone();

    let uri = format!(
        "/payments/callback/failure?data={}",
        encode(&gateway_payload(&fields, "CANCELED"))
    );
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn rejected_callbacks_reveal_nothing() {
    let (app, _) = app().await;
    let (_, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-05-01"}))).await;
    let fields = body["redirect"]["fields"].clone();
    let mut payload = gateway_payload(&fields, "COMPLETE");
    payload["signature"] = json!("bm90IHRoZSByaWdodCBzaWduYXR1cmU=");

    let uri = format!("/payments/callback/success?data={}", encode(&payload));
    let (status, forged) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(forged["error"]["code"], "CALLBACK_REJECTED");

    payload["transaction_uuid"] = json!("no-such-reference");
    let uri = format!("/payments/callback/success?data={}", encode(&payload));
    let (status, unknown) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown, forged);

    let (status, body) = send(&app, get("/payments/callback/success?data=%25%25%25")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MALFORMED_CALLBACK");

    let (status, _) = send(&app, get("/payments/callback/success")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn form_signature_posted_back_is_rejected() {
    let (app, _) = app().await;
    let (_, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-05-01"}))).await;
    let fields = body["redirect"]["fields"].clone();

    let legacy_shape = json!({
        "transaction_uuid": fields["transaction_uuid"],
        "outcome": "success",
        "signature": fields["signature"],
    });
    let (status, body) = send(&app, callback_post(legacy_shape)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CALLBACK_REJECTED");

    let response_shape = json!({
        "status": "COMPLETE",
        "total_amount": fields["total_amount"],
        "transaction_uuid": fields["transaction_uuid"],
        "product_code": fields["product_code"],
        "signed_field_names": fields["signed_field_names"],
        "signature": fields["signature"],
    });
    let uri = format!("/payments/callback/success?data={}", encode(&response_shape));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CALLBACK_REJECTED");

    assert_eq!(monthly_status(&app, 7, "2024-05-01").await, "pending");
}

#[tokio::test]
async fn gateway_notification_completes_payment() {
    let (app, _) = app().await;
    let (_, body) = send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-07-01"}))).await;
    let fields = body["redirect"]["fields"].clone();

    let (status, body) = send(&app, callback_post(gateway_payload(&fields, "COMPLETE"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(monthly_status(&app, 7, "2024-07-01").await, "completed");

    let (status, body) = send(&app, callback_post(json!({"status": "COMPLETE"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MALFORMED_CALLBACK");
}

#[tokio::test]
async fn admin_routes_require_key_and_admin_id() {
    let (app, _) = app().await;

    let (status, _) = send(&app, get("/admin/payments")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong_key = Request::builder()
        .uri("/admin/payments")
        .header("X-Internal-Api-Key", "nope")
        .header("X-Admin-Id", "1")
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, wrong_key).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let no_admin = Request::builder()
        .uri("/admin/payments")
        .header("X-Internal-Api-Key", ADMIN_KEY)
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(&app, no_admin).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, admin_request("GET", "/admin/payments", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["entries"].as_array().expect("entries").is_empty());
}

#[tokio::test]
async fn invoice_lifecycle_over_http() {
    let (app, _) = app().await;

    let (status, invoice) = send(
        &app,
        admin_request(
            "POST",
            "/admin/invoices",
            Some(json!({"special_request_id": 42, "weight_kg": "12.5"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invoice["amount"], "625.00");
    assert_eq!(invoice["status"], "pending");
    let invoice_id = invoice["id"].as_str().expect("id").to_string();

    // Someone else's invoice reads as missing.
    let (status, _) = send(&app, user_post(&format!("/payments/invoices/{invoice_id}/pay"), 8, json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, user_post(&format!("/payments/invoices/{invoice_id}/pay"), 7, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let fields = body["redirect"]["fields"].clone();
    assert_eq!(fields["total_amount"], "625.00");

    let uri = format!("/payments/callback/success?data={}", success_data(&fields));
    let (status, body) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "processing");

    let (status, body) = send(&app, user_post(&format!("/payments/invoices/{invoice_id}/pay"), 7, json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVOICE_LOCKED");

    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/admin/invoices",
            Some(json!({"special_request_id": 42, "weight_kg": "3"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVOICE_LOCKED");

    let transition = json!({"kind": "invoice", "id": invoice_id, "target_status": "paid"});
    let (status, body) = send(&app, admin_request("POST", "/admin/ledger/transition", Some(transition))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");
    assert_eq!(body["type"], "invoice");

    let back = json!({"kind": "invoice", "id": invoice_id, "target_status": "processing"});
    let (status, body) = send(&app, admin_request("POST", "/admin/ledger/transition", Some(back))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ILLEGAL_TRANSITION");

    let (status, body) = send(
        &app,
        admin_request("GET", &format!("/admin/ledger/invoice/{invoice_id}/transitions"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transitions"].as_array().expect("transitions").len(), 2);
}

#[tokio::test]
async fn unapproved_request_is_refused() {
    let (app, _) = app().await;
    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/admin/invoices",
            Some(json!({"special_request_id": 43, "weight_kg": "12.5"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "REQUEST_NOT_APPROVED");

    let (_, body) = send(&app, admin_request("GET", "/admin/payments", None)).await;
    assert!(body["entries"].as_array().expect("entries").is_empty());
}

#[tokio::test]
async fn history_stats_and_stale_report() {
    let (app, _) = app().await;
    send(&app, user_post("/payments/monthly", 7, json!({"month": "2024-05-01"}))).await;
    send(&app, user_post("/payments/monthly", 8, json!({"month": "2024-05-01"}))).await;

    let history = Request::builder()
        .uri("/payments/history")
        .header("X-User-Id", "7")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, history).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().expect("entries").len(), 1);

    let stats = Request::builder()
        .uri("/payments/stats")
        .header("X-User-Id", "7")
        .body(Body::empty())
        .expect("request");
    let (status, body) = send(&app, stats).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pending_amount"], "500.00");
    assert_eq!(body["monthly_counts"]["pending"], 1);

    let (status, body) = send(&app, admin_request("GET", "/admin/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["monthly_counts"]["pending"], 2);
    assert_eq!(body["periods"].as_array().expect("periods").len(), 6);

    let (status, body) = send(&app, admin_request("GET", "/admin/ledger/stale-pending", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["older_than_hours"], 24);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn out_of_range_inputs_are_bad_requests() {
    let (app, _) = app().await;

    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/admin/invoices",
            Some(json!({"special_request_id": 42, "weight_kg": "79228162514264337593543950335"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_WEIGHT");

    for hours in ["9223372036854775807", "2562047788015"] {
        let uri = format!("/admin/ledger/stale-pending?older_than_hours={hours}");
        let (status, body) = send(&app, admin_request("GET", &uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{hours}");
        assert_eq!(body["error"]["code"], "INVALID_WINDOW");
    }
}

#[tokio::test]
async fn liveness_answers() {
    let (app, _) = app().await;
    let (status, body) = send(&app, get("/ops/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alive"], true);
}
