//! Integration tests for batch dispatch
//!
//! These tests drive the crate end-to-end: a real route table, the
//! dispatcher's fan-out/fan-in, and result extraction, without any network.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use batch_request::prelude::*;
use std::sync::Arc;

// =============================================================================
// Test Route Table
// =============================================================================

async fn get_value(request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
    let id = request.param("id").unwrap_or("none").to_string();
    Ok(SyntheticResponse::text(
        200,
        "text/plain; charset=utf-8",
        format!("value {}", id),
    ))
}

async fn create_value(request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
    let mut response = SyntheticResponse::new();
    response.set_status(201);
    response.set_content_type("application/octet-stream");
    response.write(request.body());
    Ok(response)
}

async fn whoami(request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
    let name = request
        .principal()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "anonymous".to_string());
    Ok(SyntheticResponse::text(200, "text/plain; charset=utf-8", name))
}

async fn hello_text(_request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
    Ok(SyntheticResponse::text(200, "text/plain; charset=utf-8", "hello"))
}

async fn blob(_request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
    let mut response = SyntheticResponse::new();
    response.set_content_type("application/octet-stream");
    response.write(&[0xDE, 0xAD, 0xBE, 0xEF]);
    Ok(response)
}

async fn broken(_request: SyntheticRequest) -> DispatchResult<SyntheticResponse> {
    Err(BatchError::internal("backing store offline"))
}

fn test_table() -> RouteTable {
    RouteTable::new()
        .route(RouteEntry::new("api/values/{id}", get_value).with_method(HttpMethod::Get))
        .route(RouteEntry::new("api/values", create_value).with_method(HttpMethod::Post))
        .route(RouteEntry::new("api/whoami", whoami))
        .route(RouteEntry::new("api/text", hello_text))
        .route(RouteEntry::new("api/blob", blob))
        .route(RouteEntry::new("api/broken", broken))
        .route(RouteEntry::new("api/internal", get_value).ignore_for_batch())
        .group(
            RouteGroup::new("admin")
                .ignore_for_batch()
                .route(RouteEntry::new("health", hello_text).allow_for_batch())
                .route(RouteEntry::new("reset", hello_text)),
        )
}

fn test_dispatcher() -> BatchDispatcher {
    BatchDispatcher::new(Arc::new(test_table()), BatchOptions::default())
}

// =============================================================================
// Length, Order, and Slot Filling
// =============================================================================

#[tokio::test]
async fn test_results_are_order_preserving_and_complete() {
    let dispatcher = test_dispatcher();
    let descriptors = vec![
        SubRequest::get("/api/values/1"),
        SubRequest::get("/does/not/exist"),
        SubRequest::get("/api/values/2"),
        SubRequest::get("/api/internal"),
        SubRequest::get("/api/values/3"),
    ];

    let results = dispatcher.run(&descriptors, None).await.unwrap();

    assert_eq!(results.len(), descriptors.len());
    assert_eq!(results[0].body.as_deref(), Some("value 1"));
    assert_eq!(results[1].status_code, 404);
    assert_eq!(results[2].body.as_deref(), Some("value 2"));
    assert_eq!(results[3].status_code, 404);
    assert_eq!(results[4].body.as_deref(), Some("value 3"));
}

// =============================================================================
// Policy Exclusion
// =============================================================================

#[tokio::test]
async fn test_excluded_route_always_yields_404() {
    let dispatcher = test_dispatcher();

    let plain = SubRequest::get("/api/internal");
    let with_body = SubRequest::get("/api/internal")
        .with_content_type("application/json")
        .with_body(r#"{"force": true}"#);

    let results = dispatcher.run(&[plain, with_body], None).await.unwrap();
    assert_eq!(results[0].status_code, 404);
    assert_eq!(results[1].status_code, 404);
}

#[tokio::test]
async fn test_group_exclusion_with_route_level_override() {
    let dispatcher = test_dispatcher();
    let descriptors = vec![
        SubRequest::get("/admin/reset"),
        SubRequest::get("/admin/health"),
    ];

    let results = dispatcher.run(&descriptors, None).await.unwrap();
    assert_eq!(results[0].status_code, 404);
    assert_eq!(results[1].status_code, 200);
    assert_eq!(results[1].body.as_deref(), Some("hello"));
}

// =============================================================================
// Method Validation
// =============================================================================

#[tokio::test]
async fn test_known_verb_without_route_is_partial_success() {
    let dispatcher = test_dispatcher();
    let descriptors = vec![SubRequest::new(HttpMethod::Patch, "/api/values/1")];

    let results = dispatcher.run(&descriptors, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status_code, 404);
}

#[tokio::test]
async fn test_unknown_verb_fails_validation_with_no_results() {
    let dispatcher = test_dispatcher();
    let mut bad = SubRequest::get("/api/values/1");
    bad.method = "banana".to_string();
    let descriptors = vec![SubRequest::get("/api/values/1"), bad];

    let error = dispatcher.run(&descriptors, None).await.unwrap_err();
    assert_eq!(error.code, BatchErrorCode::UnknownMethod);
}

// =============================================================================
// Body Decoding
// =============================================================================

#[tokio::test]
async fn test_undecodable_base64_body_fails_whole_batch() {
    let dispatcher = test_dispatcher();
    let descriptors = vec![
        SubRequest::get("/api/values/1"),
        SubRequest::new(HttpMethod::Post, "/api/values").with_base64_body("not-base64!!"),
    ];

    let error = dispatcher.run(&descriptors, None).await.unwrap_err();
    assert_eq!(error.code, BatchErrorCode::InvalidBase64);
    assert_eq!(error.details.unwrap()["body"], "not-base64!!");
}

#[tokio::test]
async fn test_base64_body_reaches_handler_as_raw_bytes() {
    let dispatcher = test_dispatcher();
    let payload = BASE64.encode([0x01, 0x02, 0x03]);
    let descriptors =
        vec![SubRequest::new(HttpMethod::Post, "/api/values").with_base64_body(payload.clone())];

    let results = dispatcher.run(&descriptors, None).await.unwrap();
    // The handler echoes the decoded bytes; extraction base64s them again.
    assert_eq!(results[0].status_code, 201);
    assert!(results[0].base64_encoded);
    assert_eq!(results[0].body.as_deref(), Some(payload.as_str()));
}

// =============================================================================
// Charset-Aware Extraction
// =============================================================================

#[tokio::test]
async fn test_charset_response_comes_back_as_text() {
    let dispatcher = test_dispatcher();
    let results = dispatcher
        .run(&[SubRequest::get("/api/text")], None)
        .await
        .unwrap();

    assert_eq!(results[0].status_code, 200);
    assert_eq!(
        results[0].content_type.as_deref(),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(results[0].body.as_deref(), Some("hello"));
    assert!(!results[0].base64_encoded);
}

#[tokio::test]
async fn test_charsetless_response_comes_back_as_base64() {
    let dispatcher = test_dispatcher();
    let results = dispatcher
        .run(&[SubRequest::get("/api/blob")], None)
        .await
        .unwrap();

    assert_eq!(
        results[0].content_type.as_deref(),
        Some("application/octet-stream")
    );
    assert!(results[0].base64_encoded);
    assert_eq!(
        results[0].body.as_deref(),
        Some(BASE64.encode([0xDE, 0xAD, 0xBE, 0xEF]).as_str())
    );
}

// =============================================================================
// Fault Isolation
// =============================================================================

#[tokio::test]
async fn test_faulted_slot_does_not_poison_the_batch() {
    let dispatcher = test_dispatcher();
    let descriptors = vec![
        SubRequest::get("/api/broken"),
        SubRequest::get("/api/values/9"),
    ];

    let results = dispatcher.run(&descriptors, None).await.unwrap();
    assert_eq!(results[0].status_code, 500);
    assert!(results[0].body.is_none());
    assert_eq!(results[1].status_code, 200);
    assert_eq!(results[1].body.as_deref(), Some("value 9"));
}

// =============================================================================
// Principal Carry-Over
// =============================================================================

#[tokio::test]
async fn test_ambient_principal_is_shared_by_sub_requests() {
    let dispatcher = test_dispatcher();
    let principal = Principal::new("alice").with_roles(["admin".to_string()]);

    let with_principal = dispatcher
        .run(&[SubRequest::get("/api/whoami")], Some(&principal))
        .await
        .unwrap();
    assert_eq!(with_principal[0].body.as_deref(), Some("alice"));

    let anonymous = dispatcher
        .run(&[SubRequest::get("/api/whoami")], None)
        .await
        .unwrap();
    assert_eq!(anonymous[0].body.as_deref(), Some("anonymous"));
}

// =============================================================================
// Template Cache
// =============================================================================

#[tokio::test]
async fn test_repeat_matching_does_not_recompile() {
    let cache = Arc::new(TemplateCache::new());
    let dispatcher = BatchDispatcher::with_cache(
        Arc::new(test_table()),
        BatchOptions::default(),
        cache.clone(),
    );

    let first = dispatcher
        .run(&[SubRequest::get("/api/values/1")], None)
        .await
        .unwrap();
    let compilations_after_first = cache.compilations();

    let second = dispatcher
        .run(&[SubRequest::get("/api/values/1")], None)
        .await
        .unwrap();

    assert_eq!(cache.compilations(), compilations_after_first);
    assert_eq!(first, second);
}

// =============================================================================
// Concurrent Batches
// =============================================================================

#[tokio::test]
async fn test_concurrent_batches_do_not_interfere() {
    let cache = Arc::new(TemplateCache::new());
    let dispatcher = Arc::new(BatchDispatcher::with_cache(
        Arc::new(test_table()),
        BatchOptions::default(),
        cache,
    ));

    let first = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let descriptors: Vec<SubRequest> = (0..25)
                .map(|i| SubRequest::get(format!("/api/values/a{}", i)))
                .collect();
            dispatcher.run(&descriptors, None).await.unwrap()
        })
    };
    let second = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let descriptors: Vec<SubRequest> = (0..25)
                .map(|i| SubRequest::get(format!("/api/values/b{}", i)))
                .collect();
            dispatcher.run(&descriptors, None).await.unwrap()
        })
    };

    let (first, second) = tokio::join!(first, second);
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.len(), 25);
    assert_eq!(second.len(), 25);
    for (i, result) in first.iter().enumerate() {
        assert_eq!(result.body.as_deref(), Some(format!("value a{}", i).as_str()));
    }
    for (i, result) in second.iter().enumerate() {
        assert_eq!(result.body.as_deref(), Some(format!("value b{}", i).as_str()));
    }
}

// =============================================================================
// Endpoint Facade
// =============================================================================

#[tokio::test]
async fn test_endpoint_outcomes() {
    let enabled = BatchEndpoint::new(test_dispatcher());

    let reply = enabled
        .handle(vec![SubRequest::get("/api/values/5")], None)
        .await;
    assert_eq!(reply.status_code(), 200);

    let mut bad = SubRequest::get("/api/values/5");
    bad.method = "teleport".to_string();
    let reply = enabled.handle(vec![bad], None).await;
    assert_eq!(reply.status_code(), 400);

    let disabled = BatchEndpoint::new(BatchDispatcher::new(
        Arc::new(test_table()),
        BatchOptions::default().with_endpoint_enabled(false),
    ));
    let reply = disabled
        .handle(vec![SubRequest::get("/api/values/5")], None)
        .await;
    assert_eq!(reply.status_code(), 404);
}

// =============================================================================
// Wire Round-Trip
// =============================================================================

#[tokio::test]
async fn test_wire_payload_round_trip() {
    let dispatcher = test_dispatcher();

    let payload = r#"[
        {"relativeUri": "/api/values/5"},
        {"relativeUri": "/api/values", "method": "post", "contentType": "application/octet-stream", "body": "aGVsbG8=", "base64Encoded": true}
    ]"#;
    let descriptors: Vec<SubRequest> = serde_json::from_str(payload).unwrap();

    let results = dispatcher.run(&descriptors, None).await.unwrap();
    let wire = serde_json::to_value(&results).unwrap();

    assert_eq!(wire[0]["statusCode"], 200);
    assert_eq!(wire[0]["body"], "value 5");
    assert_eq!(wire[0]["base64Encoded"], false);
    assert_eq!(wire[1]["statusCode"], 201);
    assert_eq!(wire[1]["base64Encoded"], true);
    assert_eq!(wire[1]["body"], "aGVsbG8=");
}
