use rust_decimal::Decimal;
use waste_payments::gateways::esewa::{
    decode_callback_data, format_amount, response_message, sign, signing_message, verify, SIGNED_FIELD_NAMES,
};
use waste_payments::gateways::{GatewayCallback, GatewayOutcome};

const TEST_SECRET: &str = "8gBm/:&EnhH.1/q";

#[test]
fn signature_matches_known_vector() {
    let message = signing_message("100", "11-201-13", "EPAYTEST");
    assert_eq!(
        message,
        "total_amount=100,transaction_uuid=11-201-13,product_code=EPAYTEST"
    );
    assert_eq!(
        sign(TEST_SECRET, &message).expect("sign"),
        "5DZywcrTKD0gia/rsSMcrRHmJl+4Tbol6S+lWgdJ94E="
    );
}

#[test]
fn signed_field_names_are_fixed() {
    assert_eq!(SIGNED_FIELD_NAMES, "total_amount,transaction_uuid,product_code");
}

#[test]
fn amounts_are_formatted_with_two_decimals() {
    assert_eq!(format_amount(Decimal::new(500, 0)), "500.00");
    assert_eq!(format_amount(Decimal::new(6250, 1)), "625.00");
    assert_eq!(format_amount(Decimal::new(12345, 3)), "12.35");
}

#[test]
fn verify_accepts_own_signature_and_rejects_tampering() {
    let message = signing_message("500.00", "ref-1", "EPAYTEST");
    let signature = sign(TEST_SECRET, &message).expect("sign");
    assert_eq!(signature, "Zz80tV+a9ESLAaHXB0bCHfaUROh5lkc4RcewW9UyTAs=");

    assert!(verify(TEST_SECRET, &message, &signature).expect("verify"));

    let cheaper = signing_message("5.00", "ref-1", "EPAYTEST");
    assert!(!verify(TEST_SECRET, &cheaper, &signature).expect("verify"));
    assert!(!verify("another-secret", &message, &signature).expect("verify"));
}

#[test]
fn malformed_signature_is_a_mismatch_not_an_error() {
    let message = signing_message("500.00", "ref-1", "EPAYTEST");
    assert!(!verify(TEST_SECRET, &message, "not base64 at all!").expect("verify"));
    assert!(!verify(TEST_SECRET, &message, "").expect("verify"));
}

// The sample success response eSewa publishes for the UAT merchant.
const SAMPLE_RESPONSE: &str = "eyJ0cmFuc2FjdGlvbl9jb2RlIjoiMDAwQVdFTyIsInN0YXR1cyI6IkNPTVBMRVRFIiwidG90YWxfYW1vdW50IjoxMDAwLjAsInRyYW5zYWN0aW9uX3V1aWQiOiIyNTA2MTAtMTYyNDEzIiwicHJvZHVjdF9jb2RlIjoiRVBBWVRFU1QiLCJzaWduZWRfZmllbGRfbmFtZXMiOiJ0cmFuc2FjdGlvbl9jb2RlLHN0YXR1cyx0b3RhbF9hbW91bnQsdHJhbnNhY3Rpb25fdXVpZCxwcm9kdWN0X2NvZGUsc2lnbmVkX2ZpZWxkX25hbWVzIiwic2lnbmF0dXJlIjoiNjJHY2ZaVG1Wa3podFVlaCtRSjFBcWlKcmpvV1dHb2YzVStlVFBUWjdmQT0ifQ==";

#[test]
fn decodes_gateway_success_payload() {
    let callback = decode_callback_data(SAMPLE_RESPONSE).expect("decode");
    assert_eq!(callback.transaction_reference(), "250610-162413");
    assert_eq!(callback.signature(), "62GcfZTmVkzhtUeh+QJ1AqiJrjoWWGof3U+eTPTZ7fA=");
    assert_eq!(callback.field("total_amount"), Some("1000.0"));
    assert_eq!(callback.gateway_ref_id().as_deref(), Some("000AWEO"));
    assert_eq!(callback.outcome(), Some(GatewayOutcome::Success));
}

#[test]
fn sample_response_verifies_over_its_own_field_list() {
    let callback = decode_callback_data(SAMPLE_RESPONSE).expect("decode");
    let message = response_message(&callback).expect("all required fields signed");
    assert_eq!(
        message,
        "transaction_code=000AWEO,status=COMPLETE,total_amount=1000.0,transaction_uuid=250610-162413,\
product_code=EPAYTEST,signed_field_names=transaction_code,status,total_amount,transaction_uuid,product_code,signed_field_names"
    );
    assert!(verify(TEST_SECRET, &message, callback.signature()).expect("verify"));
}

#[test]
fn form_field_list_is_not_enough_for_a_response() {
    let form_signature = sign(TEST_SECRET, &signing_message("500.00", "ref-1", "EPAYTEST")).expect("sign");
    let replayed = GatewayCallback::new(
        [
            ("status", "COMPLETE"),
            ("total_amount", "500.00"),
            ("transaction_uuid", "ref-1"),
            ("product_code", "EPAYTEST"),
            ("signed_field_names", SIGNED_FIELD_NAMES),
        ],
        form_signature,
    );
    assert_eq!(response_message(&replayed), None);
}

#[test]
fn named_but_missing_field_yields_no_message() {
    let callback = GatewayCallback::new(
        [
            ("status", "COMPLETE"),
            ("total_amount", "500.00"),
            ("transaction_uuid", "ref-1"),
            ("product_code", "EPAYTEST"),
            ("signed_field_names", "transaction_code,status,total_amount,transaction_uuid,product_code"),
        ],
        "abc=",
    );
    assert_eq!(response_message(&callback), None);
}

#[test]
fn statuses_map_to_outcomes() {
    let with_status = |status: &str| GatewayCallback::new([("transaction_uuid", "abc"), ("status", status)], "x");
    assert_eq!(with_status("COMPLETE").outcome(), Some(GatewayOutcome::Success));
    assert_eq!(with_status("CANCELED").outcome(), Some(GatewayOutcome::Failure));
    assert_eq!(with_status("NOT_FOUND").outcome(), Some(GatewayOutcome::Failure));
    assert_eq!(with_status("PENDING").outcome(), None);
    assert_eq!(with_status("AMBIGUOUS").outcome(), None);
}

#[test]
fn unsigned_transaction_code_is_not_recorded() {
    let callback = GatewayCallback::new(
        [
            ("transaction_uuid", "abc"),
            ("transaction_code", "000AWEO"),
            ("signed_field_names", "status,total_amount,transaction_uuid,product_code"),
        ],
        "x",
    );
    assert_eq!(callback.gateway_ref_id(), None);
}

#[test]
fn rejects_undecodable_payloads() {
    assert!(decode_callback_data("%%%").is_err());
    use base64::Engine;
    let not_json = base64::engine::general_purpose::STANDARD.encode("hello");
    assert!(decode_callback_data(&not_json).is_err());
    let unsigned = base64::engine::general_purpose::STANDARD.encode(r#"{"status":"COMPLETE","transaction_uuid":"abc"}"#);
    assert!(decode_callback_data(&unsigned).is_err());
}
