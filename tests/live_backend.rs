//! Integration tests for authentication and the live backend flows.

mod helpers;

use std::sync::Arc;

use httptest::{all_of, cycle, matchers::*, responders::*, Expectation, Server};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use cheaterbuster::analysis::{
    conversation_result, location_result, AnalysisBackend, AuthService, CredentialStore,
    LiveBackend, MemoryCredentialStore, ServiceTargets,
};
use cheaterbuster::AnalysisError;
use helpers::{fast_policies, http_client, png_upload};

fn targets(server: &Server, api_key: Option<&str>) -> ServiceTargets {
    let base = format!("http://{}", server.addr());
    ServiceTargets {
        base_url: base.clone(),
        rembg_base_url: base.clone(),
        search_base_url: base,
        search_api_key: api_key.map(String::from),
    }
}

fn expect_auth(server: &Server) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/api/user"),
            request::body(json_decoded(eq(json!({"apphud_id": "apphud-1"})))),
        ])
        .times(1)
        .respond_with(json_encoded(
            json!({"id": "user-7", "apphud_id": "apphud-1", "tokens": 3}),
        )),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/api/user/authorize"),
            request::body(json_decoded(eq(json!({"user_id": "user-7"})))),
        ])
        .times(1)
        .respond_with(json_encoded(
            json!({"access_token": "tok-7", "token_type": "bearer"}),
        )),
    );
}

#[tokio::test]
async fn test_auth_registers_once_and_persists() {
    let server = Server::run();
    expect_auth(&server);

    let store = Arc::new(MemoryCredentialStore::new());
    let auth = AuthService::new(http_client(), format!("http://{}", server.addr()), store.clone());
    let cancel = CancellationToken::new();
    let first = auth.ensure_token("apphud-1", &cancel).await.unwrap();
    let second = auth.ensure_token("apphud-1", &cancel).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.access_token, "tok-7");
    assert_eq!(first.user_id, "user-7");
    assert_eq!(store.load(), Some(first));
}

#[tokio::test]
async fn test_auth_retries_transient_failure() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/user"))
            .times(2)
            .respond_with(cycle![
                status_code(503),
                json_encoded(json!({"id": "user-8"})),
            ]),
    );
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/user/authorize"))
            .respond_with(json_encoded(json!({"access_token": "tok-8", "token_type": "bearer"}))),
    );

    let auth = AuthService::new(
        http_client(),
        format!("http://{}", server.addr()),
        Arc::new(MemoryCredentialStore::new()),
    );
    let credentials = auth
        .ensure_token("apphud-2", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(credentials.access_token, "tok-8");
}

#[tokio::test]
async fn test_auth_does_not_retry_client_errors() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/user"))
            .times(1)
            .respond_with(status_code(400)),
    );

    let auth = AuthService::new(
        http_client(),
        format!("http://{}", server.addr()),
        Arc::new(MemoryCredentialStore::new()),
    );
    let err = auth
        .ensure_token("apphud-3", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::BadServerResponse { status: 400, .. }));
    assert!(auth.current().is_none());
}

#[tokio::test]
async fn test_conversation_flow_with_bearer_token() {
    let server = Server::run();
    expect_auth(&server);
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/api/task"),
            request::headers(contains(("authorization", "Bearer tok-7"))),
        ])
        .respond_with(json_encoded(json!({"id": "c1", "status": "queued"}))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/api/task/c1"),
            request::headers(contains(("authorization", "Bearer tok-7"))),
        ])
        .times(2)
        .respond_with(cycle![
            json_encoded(json!({"id": "c1", "status": "processing", "result": null})),
            json_encoded(json!({
                "id": "c1",
                "status": "finished",
                "result": {"risk_score": 35, "red_flags": [], "recommendations": ["Ask open questions"]},
                "error": null
            })),
        ]),
    );

    let backend = LiveBackend::new(
        http_client(),
        targets(&server, None),
        Arc::new(MemoryCredentialStore::new()),
    )
    .with_policies(fast_policies())
    .with_apphud_id("apphud-1");
    let raw = backend
        .conversation(&png_upload(), &CancellationToken::new())
        .await
        .unwrap();
    let result = conversation_result(&raw, None).unwrap();
    assert_eq!(result.risk_score, 35);
    assert!(result.red_flags.is_empty());
    assert_eq!(result.recommendations[0].title, "Ask open questions");
}

#[tokio::test]
async fn test_location_flow_without_credentials() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/task/place"))
            .respond_with(json_encoded(json!({"id": "l1", "status": "queued"}))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/task/l1")).respond_with(
            json_encoded(json!({"id": "l1", "status": "finished", "result": "Old Town, Tallinn"})),
        ),
    );

    let backend = LiveBackend::new(
        http_client(),
        targets(&server, None),
        Arc::new(MemoryCredentialStore::new()),
    )
    .with_policies(fast_policies());
    let raw = backend
        .location(&png_upload(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(location_result(&raw, None).unwrap().location_text, "Old Town, Tallinn");
}

#[tokio::test]
async fn test_reverse_search_uses_api_key_and_normalizes() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/task"),
            request::headers(contains(("x-api-key", "secret-key"))),
        ])
        .respond_with(json_encoded(json!({"task_id": "s1"}))),
    );
    server.expect(
        Expectation::matching(all_of![
            request::method_path("GET", "/task/s1"),
            request::headers(contains(("x-api-key", "secret-key"))),
        ])
        .respond_with(json_encoded(json!({
            "status": {"google": "completed", "bing": "completed"},
            "results": {
                "google": {"visual_matches": [{"link": "https://a.example/p", "thumbnail": "https://a.example/t.jpg"}]},
                "bing": {"visual_matches": []}
            }
        }))),
    );

    let backend = LiveBackend::new(
        http_client(),
        targets(&server, Some("secret-key")),
        Arc::new(MemoryCredentialStore::new()),
    )
    .with_policies(fast_policies());
    let envelope = backend
        .reverse_search(&png_upload(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(envelope.results.len(), 1);
    assert_eq!(envelope.status.len(), 2);
    let google = &envelope.results["google"];
    assert_eq!(google.visual_matches[0].link.as_deref(), Some("https://a.example/p"));
    assert_eq!(
        google.visual_matches[0].image.as_deref(),
        Some("https://a.example/t.jpg")
    );
}

#[tokio::test]
async fn test_reverse_search_stops_once_results_name_an_engine() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/task"))
            .respond_with(json_encoded(json!({"task_id": "s2"}))),
    );
    server.expect(
        Expectation::matching(request::method_path("GET", "/task/s2"))
            .times(1)
            .respond_with(json_encoded(json!({
                "results": {"google": {"visual_matches": []}}
            }))),
    );

    let backend = LiveBackend::new(
        http_client(),
        targets(&server, Some("secret-key")),
        Arc::new(MemoryCredentialStore::new()),
    )
    .with_policies(fast_policies());
    let envelope = backend
        .reverse_search(&png_upload(), &CancellationToken::new())
        .await
        .unwrap();

    assert!(envelope.results.is_empty());
    assert!(envelope.has_engines());
    assert_eq!(envelope.empty_engines.iter().collect::<Vec<_>>(), vec!["google"]);
}
