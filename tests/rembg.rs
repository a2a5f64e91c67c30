//! Integration tests for the background removal client.

mod helpers;

use httptest::{all_of, matchers::*, responders::*, Expectation, Server};
use tokio_util::sync::CancellationToken;

use cheaterbuster::analysis::remove_background;
use cheaterbuster::AnalysisError;
use helpers::{http_client, png_upload, PNG_BYTES};

#[tokio::test]
async fn test_rembg_returns_image_bytes() {
    let server = Server::run();
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", "/rembg"),
            request::headers(contains(key("content-type"))),
        ])
        .respond_with(
            status_code(200)
                .insert_header("content-type", "image/png")
                .body(PNG_BYTES.to_vec()),
        ),
    );

    let base = format!("http://{}", server.addr());
    let out = remove_background(&http_client(), &base, &png_upload(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(out.bytes, PNG_BYTES);
    assert_eq!(out.mime_type, "image/png");
}

#[tokio::test]
async fn test_rembg_fastapi_validation_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/rembg")).respond_with(
            status_code(422).body(
                r#"{"detail":[{"loc":["body","file"],"msg":"field required","type":"value_error.missing"}]}"#,
            ),
        ),
    );

    let base = format!("http://{}", server.addr());
    let err = remove_background(&http_client(), &base, &png_upload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "REMBG failed (422): field required");
    assert_eq!(err.user_message(), "REMBG failed (422): field required");
}

#[tokio::test]
async fn test_rembg_plain_text_error() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/rembg"))
            .respond_with(status_code(500).body("model not loaded")),
    );

    let base = format!("http://{}", server.addr());
    let err = remove_background(&http_client(), &base, &png_upload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::BackgroundRemoval { status: 500, message: Some(ref m) } if m == "model not loaded"
    ));
}

#[tokio::test]
async fn test_rembg_rejects_non_image_success_body() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("POST", "/rembg"))
            .respond_with(status_code(200).body("")),
    );

    let base = format!("http://{}/", server.addr());
    let err = remove_background(&http_client(), &base, &png_upload(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::Decode(_)));
}
