use chrono::TimeZone;
use waf_rate_rule_provider::http::map_status_to_error;
use waf_rate_rule_provider::http::sigv4::{sign_json_post, signing_key, Credentials};

#[test]
fn status_error_mapping() {
    let e = map_status_to_error(
        400,
        r#"{"__type":"WAFNonexistentItemException","message":"The referenced item does not exist."}"#,
    );
    assert!(e.is_nonexistent_item());
    assert!(e.to_string().contains("does not exist"));

    let e = map_status_to_error(500, "<html>oops</html>");
    assert!(!e.is_nonexistent_item());
    assert!(e.to_string().starts_with("ServiceUnavailable (500)"));
}

#[test]
fn signing_is_deterministic_for_fixed_time() {
    let creds = Credentials {
        access_key_id: "AKID",
        secret_access_key: "secret",
        session_token: None,
    };
    let now = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let target = "AWSWAF_20150824.GetChangeTokenStatus";
    let body = br#"{"ChangeToken":"abc"}"#;
    let a = sign_json_post(&creds, "us-east-1", "waf", "waf.amazonaws.com", target, body, now);
    let b = sign_json_post(&creds, "us-east-1", "waf", "waf.amazonaws.com", target, body, now);
    assert_eq!(a, b);
    assert_eq!(a.amz_date, "20240102T030405Z");

    let other_body = sign_json_post(&creds, "us-east-1", "waf", "waf.amazonaws.com", target, b"{}", now);
    assert_ne!(a.authorization, other_body.authorization);
}

#[test]
fn signing_key_depends_on_scope() {
    let k1 = signing_key("secret", "20240102", "us-east-1", "waf");
    let k2 = signing_key("secret", "20240102", "eu-west-1", "waf");
    assert_eq!(k1.len(), 32);
    assert_ne!(k1, k2);
}
