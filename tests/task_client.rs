//! Integration tests for the submit-and-poll task client.
//!
//! Every HTTP interaction goes to an `httptest` mock server.

mod helpers;

use std::time::Instant;

use httptest::{all_of, cycle, matchers::*, responders::*, Expectation, Server};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use cheaterbuster::task::{is_task_finished, TaskAuth, TaskClient, TaskEndpoint};
use cheaterbuster::AnalysisError;
use helpers::{fast_policy, http_client, png_upload};

fn endpoint(server: &Server) -> TaskEndpoint {
    TaskEndpoint::new(format!("http://{}", server.addr()), "/api/task", "/api/task")
}

#[tokio::test]
async fn test_poll_stops_after_exact_budget() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/task/t1"))
            .times(4)
            .respond_with(json_encoded(json!({"id": "t1", "status": "processing"}))),
    );

    let client = TaskClient::new(http_client());
    let policy = fast_policy(4);
    let start = Instant::now();
    let err = client
        .poll(
            &endpoint(&server),
            "t1",
            is_task_finished,
            &policy,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisError::TimedOut { ref task_id, attempts: 4 } if task_id == "t1"));
    assert!(start.elapsed() >= policy.minimum_budget());
}

#[tokio::test]
async fn test_poll_returns_finished_task() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/task/t2"))
            .times(2)
            .respond_with(cycle![
                json_encoded(json!({"id": "t2", "status": "processing", "result": null})),
                json_encoded(json!({"id": "t2", "status": "finished", "result": "Nice"})),
            ]),
    );

    let raw = TaskClient::new(http_client())
        .poll(
            &endpoint(&server),
            "t2",
            is_task_finished,
            &fast_policy(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(raw["result"], "Nice");
}

#[tokio::test]
async fn test_failed_poll_attempts_use_up_budget() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", "/api/task/t3"))
            .times(3)
            .respond_with(cycle![
                status_code(502),
                status_code(200).body("not json"),
                status_code(500),
            ]),
    );

    let err = TaskClient::new(http_client())
        .poll(
            &endpoint(&server),
            "t3",
            is_task_finished,
            &fast_policy(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::TimedOut { attempts: 3, .. }));
}

#[tokio::test]
async fn test_submit_returns_task_id_with_bearer() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/api/task"),
            request::headers(contains(("authorization", "Bearer tok"))),
            request::headers(contains(key("content-type"))),
        ])
        .respond_with(json_encoded(json!({"id": "t4", "status": "queued"}))),
    );

    let endpoint = endpoint(&server).with_auth(TaskAuth::Bearer("tok".to_string()));
    let task_id = TaskClient::new(http_client())
        .submit(
            &endpoint,
            "files",
            &png_upload(),
            &[("conversation", ""), ("app_bundle", "com.example")],
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(task_id, "t4");
}

#[tokio::test]
async fn test_submit_non_2xx_is_bad_server_response() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/api/task"))
            .respond_with(status_code(401).body(r#"{"detail":"Not authenticated"}"#)),
    );

    let err = TaskClient::new(http_client())
        .submit(
            &endpoint(&server),
            "files",
            &png_upload(),
            &[],
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
    match err {
        AnalysisError::BadServerResponse { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("Not authenticated"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_without_task_id_is_decode_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/task"))
            .respond_with(json_encoded(json!({"status": "queued"}))),
    );

    let endpoint = TaskEndpoint::new(format!("http://{}", server.addr()), "/task", "/task")
        .with_id_field("task_id");
    let err = TaskClient::new(http_client())
        .submit(&endpoint, "image", &png_upload(), &[], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Decode(_)));
}

#[tokio::test]
async fn test_cancelled_poll_stops_early() {
    let server = Server::run();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = TaskClient::new(http_client())
        .poll(
            &endpoint(&server),
            "t5",
            is_task_finished,
            &fast_policy(100),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Cancelled));
}
