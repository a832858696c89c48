mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use promptagro_wizard::{
    routes::{router, AppState},
    BackendAdapter,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{honey_design, jpeg, local_config};

const BOUNDARY: &str = "wizard-test-boundary";

async fn app(server: &MockServer) -> Router {
    let config = local_config(server);
    let adapter = BackendAdapter::from_config(&config.api).unwrap();
    router(AppState::new(adapter, config))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let (status, bytes) = send(app, request).await;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

fn image_upload(uri: &str, image: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"honey.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn new_session(app: &Router) -> String {
    let (status, body) = send_json(app, Method::POST, "/api/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"]["step"], "upload");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn full_walk_through_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(honey_design()))
        .expect(1)
        .mount(&server)
        .await;
    let app = app(&server).await;
    let id = new_session(&app).await;
    let base = format!("/api/sessions/{id}");

    let (status, body) = send(&app, image_upload(&format!("{base}/image"), &jpeg())).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["state"]["form"]["image"]["contentType"], "image/jpeg");
    assert_eq!(body["notices"][0]["level"], "success");

    let (status, _) = send_json(&app, Method::POST, &format!("{base}/next"), None).await;
    assert_eq!(status, StatusCode::OK);

    let patch = json!({"productName": "Golden Honey", "preferredColors": ["green", "yellow"], "salesPlatform": "farmers-market"});
    let (status, body) = send_json(&app, Method::PATCH, &format!("{base}/form"), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["form"]["salesPlatform"], "farmers-market");

    let (_, body) = send_json(&app, Method::POST, &format!("{base}/next"), None).await;
    assert_eq!(body["state"]["step"], "preferences");

    let (status, body) = send_json(&app, Method::POST, &format!("{base}/next?wait=true"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["step"], "preview");
    assert_eq!(body["state"]["status"]["status"], "ready");
    assert_eq!(body["state"]["preview"]["designId"], "d1");

    let (status, html) = send(&app, Request::get(format!("{base}/view")).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(html).unwrap();
    assert_eq!(html.matches(r#"class="concept-item""#).count(), 1);
    assert_eq!(html.matches(r#"class="color-swatch""#).count(), 1);

    let (_, body) = send_json(&app, Method::POST, &format!("{base}/next"), None).await;
    assert_eq!(body["state"]["step"], "download");

    let response = app
        .clone()
        .oneshot(Request::get(format!("{base}/report.pdf")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let pdf = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn validation_and_transition_errors_map_to_statuses() {
    let server = MockServer::start().await;
    let app = app(&server).await;
    let id = new_session(&app).await;
    let base = format!("/api/sessions/{id}");

    let (status, body) = send_json(&app, Method::POST, &format!("{base}/next"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);

    let (status, _) = send_json(&app, Method::POST, &format!("{base}/goto/download"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_json(&app, Method::POST, &format!("{base}/goto/magic"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_json(&app, Method::POST, &format!("{base}/save"), Some(json!({"userEmail": "a@b.co", "designName": "x"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send_json(&app, Method::GET, "/api/sessions/00000000-0000-0000-0000-000000000000", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn language_falls_back_to_default() {
    let server = MockServer::start().await;
    let app = app(&server).await;
    let id = new_session(&app).await;
    let uri = format!("/api/sessions/{id}/language");

    let (_, body) = send_json(&app, Method::PUT, &uri, Some(json!({"language": "sw"}))).await;
    assert_eq!(body["language"], "sw");
    let (_, body) = send_json(&app, Method::PUT, &uri, Some(json!({"language": "de"}))).await;
    assert_eq!(body["language"], "en");
}

#[tokio::test]
async fn health_reports_backend_state() {
    let server = MockServer::start().await;
    let app = app(&server).await;

    let (status, body) = send_json(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "local");
    assert_eq!(body["backendError"], "Service not found.");

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;
    let (_, body) = send_json(&app, Method::GET, "/api/health", None).await;
    assert_eq!(body["backendStatus"], "healthy");
}

#[tokio::test]
async fn photos_up_to_the_configured_size_are_accepted() {
    let server = MockServer::start().await;
    let app = app(&server).await;
    let id = new_session(&app).await;
    let uri = format!("/api/sessions/{id}/image");

    let mut photo = jpeg().to_vec();
    photo.resize(3 * 1024 * 1024, 0);
    let (status, body) = send(&app, image_upload(&uri, &photo)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["state"]["form"]["image"]["size"], 3 * 1024 * 1024);

    photo.resize(10 * 1024 * 1024 + 1, 0);
    let (status, body) = send(&app, image_upload(&uri, &photo)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn malformed_bodies_are_rejected_before_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(honey_design()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/regenerate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"designId": "d1"}})))
        .expect(0)
        .mount(&server)
        .await;
    let app = app(&server).await;

    let (status, _) = send_json(&app, Method::POST, "/api/sessions", Some(json!({"language": 7}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let id = new_session(&app).await;
    let base = format!("/api/sessions/{id}");
    send(&app, image_upload(&format!("{base}/image"), &jpeg())).await;
    send_json(&app, Method::POST, &format!("{base}/next"), None).await;
    send_json(&app, Method::PATCH, &format!("{base}/form"), Some(json!({"productName": "Golden Honey"}))).await;
    send_json(&app, Method::POST, &format!("{base}/next"), None).await;
    let (_, body) = send_json(&app, Method::POST, &format!("{base}/next?wait=true"), None).await;
    assert_eq!(body["state"]["step"], "preview");

    let tweaks = json!({"brightness": 300, "fontStyle": "comic-sans"});
    let (status, body) = send_json(&app, Method::POST, &format!("{base}/regenerate"), Some(tweaks)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = send_json(&app, Method::GET, &base, None).await;
    assert_eq!(body["state"]["preview"]["customizations"]["brightness"], 100);
}

#[tokio::test]
async fn report_needs_a_generated_design() {
    let server = MockServer::start().await;
    let app = app(&server).await;
    let id = new_session(&app).await;

    let (status, body) = send_json(&app, Method::GET, &format!("/api/sessions/{id}/report.pdf"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
}
