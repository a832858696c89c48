mod common;

use pretty_assertions::assert_eq;
use promptagro_wizard::{
    config::{ApiConfig, AppConfig, BackendKind},
    models::{ApiResponse, Customizations, GenerationRequest, SaveDesignRequest},
    state::StateStore,
    BackendAdapter,
};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{hosted_config, local_config};

fn request() -> GenerationRequest {
    let store = StateStore::new("sw");
    let mut form = store.get_state().form;
    form.product_name = "  Golden Honey ".into();
    GenerationRequest::from_form(&form, "sw")
}

fn adapter(api: &ApiConfig) -> BackendAdapter {
    BackendAdapter::from_config(api).expect("backend client")
}

async fn generate_with(response: ResponseTemplate) -> ApiResponse<promptagro_wizard::models::CanonicalResult> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(response)
        .mount(&server)
        .await;
    adapter(&local_config(&server).api).generate(&request()).await
}

#[tokio::test]
async fn local_envelope_is_unwrapped() {
    let response = generate_with(ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "data": {
            "designId": "design_42",
            "mockupUrl": "/uploads/design_42.png",
            "concepts": ["Hillside gold", "Morning dew"],
            "aiConfidence": 0.87
        }
    })))
    .await;

    assert!(response.success);
    let data = response.data.unwrap();
    assert_eq!(data.design_id, "design_42");
    assert_eq!(data.mockup_url.as_deref(), Some("/uploads/design_42.png"));
    assert_eq!(data.concepts.len(), 2);
}

#[tokio::test]
async fn not_found_reads_as_service_not_found() {
    let response = generate_with(ResponseTemplate::new(404)).await;
    assert_eq!(response, ApiResponse::fail("Service not found."));
}

#[tokio::test]
async fn malformed_body_is_a_generic_failure() {
    let response = generate_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
    assert_eq!(response, ApiResponse::fail("An unexpected error occurred."));
}

#[tokio::test]
async fn provider_reported_failure_is_a_generic_failure() {
    let response = generate_with(
        ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "Model overloaded"})),
    )
    .await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("An unexpected error occurred."));
}

#[tokio::test]
async fn slow_backend_times_out_as_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let mut config = local_config(&server);
    config.api.timeout = Duration::from_millis(200);

    let response = adapter(&config.api).generate(&request()).await;
    assert_eq!(response, ApiResponse::fail("Network error. Please check your connection."));
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let mut config = AppConfig::default();
    config.api.base_url = "http://127.0.0.1:9/api".into();
    let response = adapter(&config.api).generate(&request()).await;
    assert_eq!(response.error.as_deref(), Some("Network error. Please check your connection."));
}

#[tokio::test]
async fn local_sends_trimmed_fields_and_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::honey_design()))
        .mount(&server)
        .await;
    adapter(&local_config(&server).api).generate(&request()).await;

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"productName\"\r\n\r\nGolden Honey\r\n"));
    assert!(body.contains("name=\"language\"\r\n\r\nsw\r\n"));
    assert!(body.contains("name=\"preferredColors\"\r\n\r\n[]\r\n"));
    assert!(!body.contains("name=\"image\""));
}

#[tokio::test]
async fn regenerate_and_save_use_json_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/regenerate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"designId": "d1", "mockupUrl": "/uploads/d1_v2.png"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/save-design"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "savedDesignId": "saved_9",
            "message": "Design saved successfully"
        })))
        .mount(&server)
        .await;
    let adapter = adapter(&local_config(&server).api);

    let customizations = Customizations { contrast: 120, ..Default::default() };
    let regenerated = adapter.regenerate("d1", &customizations, "fr").await;
    assert_eq!(regenerated.data.unwrap().mockup_url.as_deref(), Some("/uploads/d1_v2.png"));

    let saved = adapter
        .save_design(&SaveDesignRequest {
            design_id: "d1".into(),
            user_email: "achieng@example.com".into(),
            design_name: "Honey v1".into(),
        })
        .await;
    assert_eq!(saved.data.unwrap().saved_design_id.as_deref(), Some("saved_9"));

    let requests = server.received_requests().await.unwrap();
    let regenerate_body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(regenerate_body["designId"], "d1");
    assert_eq!(regenerate_body["customizations"]["contrast"], 120);
    assert_eq!(regenerate_body["customizations"]["fontStyle"], "serif");
    assert_eq!(regenerate_body["language"], "fr");
    let save_body: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(save_body["userEmail"], "achieng@example.com");
}

#[tokio::test]
async fn hosted_backend_cannot_regenerate() {
    let server = MockServer::start().await;
    let adapter = adapter(&hosted_config(&server).api);
    assert_eq!(adapter.kind(), BackendKind::Hosted);

    let response = adapter.regenerate("hf_1", &Customizations::default(), "en").await;
    assert_eq!(response.error.as_deref(), Some("An unexpected error occurred."));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn health_probes_each_backend_root() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "services": {"ai": true, "storage": true}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .mount(&server)
        .await;

    let local = adapter(&local_config(&server).api).health().await.unwrap();
    assert_eq!(local.status, "healthy");
    assert_eq!(local.services.get("ai"), Some(&true));

    let hosted = adapter(&hosted_config(&server).api).health().await.unwrap();
    assert_eq!(hosted.status, "running");
}
