use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use docdigest::{
    api::create_router,
    ocr::{HttpOcrEngine, OcrInvoker},
    processing::{ProcessingService, UploadPolicy},
    retry::RetryPolicy,
    summarization::{DEGRADED_SUMMARY, OpenAiClient, SummarizationClient, SummaryProvider},
};
use httpmock::{Method::POST, MockServer};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "pipeline-boundary";

fn service(ocr_server: &MockServer, openai_server: &MockServer, upload_dir: &Path) -> ProcessingService {
    let ocr = OcrInvoker::new(
        Box::new(HttpOcrEngine::new(ocr_server.url("/ocr"), Duration::from_secs(5)).expect("ocr")),
        RetryPolicy::linear(2, Duration::from_millis(5)),
    );
    let openai: Arc<dyn SummarizationClient> = Arc::new(
        OpenAiClient::new(
            "sk-test".into(),
            "gpt-4o-mini".into(),
            openai_server.url("/v1"),
            Duration::from_secs(5),
        )
        .expect("openai"),
    );
    let summarizer = SummaryProvider::new(
        vec![openai],
        RetryPolicy::exponential(2, Duration::from_millis(5)),
    );
    ProcessingService::new(ocr, summarizer, UploadPolicy::new(1024 * 1024, 10), upload_dir)
}

fn upload_request(parts: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (file_name, content) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn upload_returns_one_outcome_per_file_in_order() {
    let ocr_server = MockServer::start_async().await;
    let openai_server = MockServer::start_async().await;
    let upload_dir = tempfile::tempdir().expect("tempdir");

    let ocr_ok = ocr_server
        .mock_async(|when, then| {
            when.method(POST).path("/ocr").body_contains("invoice-scan");
            then.status(200).json_body(json!({
                "status": "success",
                "extracted_text": "Invoice 42 total 99 EUR",
                "word_count": 5,
                "character_count": 23,
                "confidence": 0.91
            }));
        })
        .await;
    let ocr_broken = ocr_server
        .mock_async(|when, then| {
            when.method(POST).path("/ocr").body_contains("unreadable-scan");
            then.status(200).json_body(json!({
                "status": "error",
                "error": "Unable to read image file"
            }));
        })
        .await;
    let summary = openai_server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains("Invoice 42 total 99 EUR");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "An invoice for 99 EUR." } }]
            }));
        })
        .await;

    let app = create_router(Arc::new(service(&ocr_server, &openai_server, upload_dir.path())));
    let response = app
        .oneshot(upload_request(&[
            ("invoice.pdf", "invoice-scan"),
            ("broken.png", "unreadable-scan"),
            ("copy.jpg", "invoice-scan"),
        ]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let files = json["files"].as_array().expect("files array");
    assert_eq!(files.len(), 3);

    assert_eq!(files[0]["fileName"], "invoice.pdf");
    assert_eq!(files[0]["documentType"], "PDF");
    assert_eq!(files[0]["extractedText"], "Invoice 42 total 99 EUR");
    assert_eq!(files[0]["wordCount"], 5);
    assert_eq!(files[0]["summary"]["text"], "An invoice for 99 EUR.");
    assert_eq!(files[0]["summary"]["provider"], "openai");

    assert_eq!(files[1]["fileName"], "broken.png");
    assert!(files[1]["error"].as_str().unwrap().contains("Unable to read image file"));
    assert!(files[1].get("summary").is_none());

    assert_eq!(files[2]["fileName"], "copy.jpg");
    assert_eq!(files[2]["documentType"], "JPG");

    ocr_ok.assert_hits_async(2).await;
    ocr_broken.assert_hits_async(2).await;
    summary.assert_hits_async(2).await;

    let leftovers = std::fs::read_dir(upload_dir.path()).expect("dir").count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn exhausted_summaries_degrade_to_extracted_text() {
    let ocr_server = MockServer::start_async().await;
    let openai_server = MockServer::start_async().await;
    let upload_dir = tempfile::tempdir().expect("tempdir");

    ocr_server
        .mock_async(|when, then| {
            when.method(POST).path("/ocr");
            then.status(200).json_body(json!({
                "status": "success",
                "extracted_text": "Meeting notes from Monday"
            }));
        })
        .await;
    let quota = openai_server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).json_body(json!({
                "error": { "type": "insufficient_quota", "message": "You exceeded your current quota" }
            }));
        })
        .await;

    let app = create_router(Arc::new(service(&ocr_server, &openai_server, upload_dir.path())));
    let response = app
        .oneshot(upload_request(&[("notes.png", "meeting")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let file = &json["files"][0];
    assert_eq!(file["wordCount"], 4);
    assert_eq!(file["summary"]["text"], DEGRADED_SUMMARY);
    assert_eq!(file["summary"]["extractedText"], "Meeting notes from Monday");
    assert_eq!(file["summary"]["error"], "All fallback APIs failed");
    quota.assert_hits_async(1).await;
}

#[tokio::test]
async fn unsupported_upload_is_rejected_without_side_effects() {
    let ocr_server = MockServer::start_async().await;
    let openai_server = MockServer::start_async().await;
    let upload_dir = tempfile::tempdir().expect("tempdir");

    let ocr = ocr_server
        .mock_async(|when, then| {
            when.method(POST).path("/ocr");
            then.status(500);
        })
        .await;

    let app = create_router(Arc::new(service(&ocr_server, &openai_server, upload_dir.path())));
    let response = app
        .oneshot(upload_request(&[("report.docx", "text")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(
        json["error"],
        "File type '.docx' is not supported. Allowed types: .pdf, .png, .jpg, .jpeg"
    );
    ocr.assert_hits_async(0).await;
    assert_eq!(std::fs::read_dir(upload_dir.path()).expect("dir").count(), 0);
}
