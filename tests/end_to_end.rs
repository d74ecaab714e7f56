//! Call definitions on disk, asserted against requests and served as stubs.

use http::Method;
use http_call_mock::{
    assert_matches, stub_all, stub_requests, CallError, CallParser, DirectorySource, Expectations,
    InMemoryMockServer, MatchField, MockServer, ObservedRequest, ParseStage, Placeholders,
    StubRequest,
};
use serde_json::json;
use std::path::PathBuf;

fn calls_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/calls")
}

fn parser() -> CallParser {
    CallParser::new(DirectorySource::new(calls_dir()))
}

fn price_update(price: u32, query: &str) -> ObservedRequest {
    ObservedRequest::new(
        Method::POST,
        &format!("http://localhost:8080/price/update{query}"),
    )
    .unwrap()
    .with_header("Content-Type", "application/json")
    .with_body(format!("{{\"price\":{price}}}"))
}

fn params(value: serde_json::Value) -> Placeholders {
    let mut placeholders = Placeholders::new();
    placeholders.insert("new-price-param".to_string(), value);
    placeholders
}

#[tokio::test]
async fn test_stubbed_call_answers_matching_request() {
    let server = InMemoryMockServer::default();
    stub_all(&server, &parser(), &Placeholders::new(), &["update-price.txt"])
        .await
        .unwrap();

    let response = server.respond(&price_update(1111, "?currency=EUR")).await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_str(response.body.as_deref().unwrap()).unwrap();
    assert_eq!(body, json!({"oldPrice": 222, "newPrice": 1111}));

    let response = server.respond(&price_update(5, "?currency=EUR")).await;
    assert_eq!(response.status, 404);
    assert_eq!(server.total_matched(), 1);
    assert_eq!(server.total_unmatched(), 1);
}

#[tokio::test]
async fn test_parameter_flows_into_request_and_response() {
    let server = InMemoryMockServer::default();
    stub_requests(
        &server,
        &parser(),
        &[StubRequest::with_placeholders(
            "update-price-with-param.txt",
            params(json!(99)),
        )],
    )
    .await
    .unwrap();

    let response = server.respond(&price_update(99, "")).await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body.as_deref(),
        Some("{\"oldPrice\":222,\"newPrice\":99}")
    );
}

#[tokio::test]
async fn test_missing_source_fails_the_batch() {
    let server = InMemoryMockServer::default();
    let err = stub_requests(
        &server,
        &parser(),
        &[
            StubRequest::of("update-price.txt"),
            StubRequest::of("no-such-call.txt"),
        ],
    )
    .await
    .unwrap_err();

    match err {
        CallError::SourceNotFound { source_id, .. } => assert_eq!(source_id, "no-such-call.txt"),
        other => panic!("Expected SourceNotFound, got {other:?}"),
    }
    assert_eq!(server.stubs().await.len(), 1);
    assert!(server.check_ready().await.is_ok());
}

#[test]
fn test_request_line_without_path_is_rejected() {
    let err = parser()
        .parse("bare-method.txt", &Placeholders::new())
        .unwrap_err();
    assert_eq!(err.stage(), Some(ParseStage::RequestLine));
}

#[test]
fn test_assertions_against_definitions_on_disk() {
    let call = parser()
        .parse("update-price-with-param.txt", &params(json!(99)))
        .unwrap();

    assert!(assert_matches(&price_update(99, "?trace=1"), &call).is_ok());

    let err = assert_matches(&price_update(100, ""), &call).unwrap_err();
    match err {
        CallError::Mismatch(m) => assert_eq!(m.field, MatchField::Body),
        other => panic!("Expected Mismatch, got {other:?}"),
    }
}

#[test]
fn test_form_expectations_session() {
    let mut expectations = Expectations::new(parser());
    expectations.set_parameter("user", "alice");
    expectations.expect("login-form.txt");

    let request = ObservedRequest::new(Method::POST, "http://localhost/login")
        .unwrap()
        .with_header("Content-Type", "application/x-www-form-urlencoded")
        .with_body("remember=true&user=alice&lang=en");

    let response = expectations.respond(&request).unwrap();
    assert_eq!(response.status, 302);
    assert_eq!(response.headers.first("Location"), Some("/home"));
    assert!(response.body.is_none());
    assert!(expectations.verify_complete().is_ok());
}

#[test]
fn test_glob_lists_every_definition() {
    let source = DirectorySource::new(calls_dir());
    let ids = source.resolve_glob("update-price*.txt").unwrap();
    assert_eq!(ids, vec!["update-price-with-param.txt", "update-price.txt"]);

    let calls = CallParser::new(source)
        .parse_all(&ids, &params(json!(7)))
        .unwrap();
    assert!(calls.iter().all(|c| c.request_method == Method::POST));
}
