mod common;

use pretty_assertions::assert_eq;
use promptagro_wizard::{
    models::{GenerationStatus, NoticeLevel, Step},
    state::FormUpdate,
    wizard::{Advance, ValidationError, WizardError},
};
use serde_json::json;
use std::collections::BTreeSet;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{honey_design, hosted_config, jpeg, local_config, wizard};

async fn run_to_completion(advance: Advance) -> Step {
    match advance {
        Advance::Generating(handle) => handle.await.expect("generation task"),
        Advance::Moved(step) => panic!("expected generation to start, stayed on {step}"),
    }
}

#[tokio::test]
async fn golden_honey_reaches_preview() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(honey_design()))
        .expect(1)
        .mount(&server)
        .await;

    let wizard = wizard(local_config(&server));
    wizard.upload_image(Some("honey.jpg"), Some("image/jpeg"), jpeg()).unwrap();
    assert_eq!(wizard.next().unwrap().step(), Step::Story);

    wizard.update_form(FormUpdate::ProductName("Golden Honey".into()));
    assert_eq!(wizard.next().unwrap().step(), Step::Preferences);

    let colors: BTreeSet<String> = ["green", "yellow"].into_iter().map(String::from).collect();
    wizard.update_form(FormUpdate::PreferredColors(colors));
    assert_eq!(run_to_completion(wizard.next().unwrap()).await, Step::Preview);

    let state = wizard.snapshot();
    assert_eq!(state.status, GenerationStatus::Ready);
    assert_eq!(state.preview.design_id.as_deref(), Some("d1"));

    let html = wizard.render();
    assert_eq!(html.matches(r#"class="concept-item""#).count(), 1);
    assert_eq!(html.matches(r#"class="color-swatch""#).count(), 1);
    assert!(html.contains("Design generated successfully!"));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"productName\""));
    assert!(body.contains("Golden Honey"));
    assert!(body.contains(r#"["green","yellow"]"#));
    assert!(body.contains("name=\"image\"; filename=\"honey.jpg\""));
}

#[tokio::test]
async fn single_letter_name_never_reaches_the_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(honey_design()))
        .expect(0)
        .mount(&server)
        .await;

    let wizard = wizard(local_config(&server));
    wizard.upload_image(None, None, jpeg()).unwrap();
    wizard.next().unwrap();
    wizard.update_form(FormUpdate::ProductName("A".into()));
    wizard.take_notices();

    let err = wizard.next().unwrap_err();
    assert!(matches!(err, WizardError::Validation(ValidationError::ProductNameTooShort { min: 2 })));
    assert_eq!(wizard.current_step(), Step::Story);

    let html = wizard.render();
    assert!(html.contains(r#"class="toast toast-error""#));
    assert!(html.contains("Please enter a product name (at least 2 characters)"));
    assert!(html.contains(r#"data-step="story""#));
}

#[tokio::test]
async fn server_error_leaves_a_retryable_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "model crashed"})))
        .expect(1)
        .mount(&server)
        .await;

    let wizard = wizard(local_config(&server));
    wizard.upload_image(None, None, jpeg()).unwrap();
    wizard.next().unwrap();
    wizard.update_form(FormUpdate::ProductName("Golden Honey".into()));
    wizard.next().unwrap();
    wizard.take_notices();

    assert_eq!(run_to_completion(wizard.next().unwrap()).await, Step::Generating);
    let state = wizard.snapshot();
    assert!(!state.loading.is_loading);
    assert_eq!(
        state.status,
        GenerationStatus::Failed { message: "Server error. Please try again later.".into() }
    );

    let notices = wizard.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(wizard.render().contains("Try Again"));
}

#[tokio::test]
async fn hosted_space_result_is_filled_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-packaging/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "image_data": "iVBORw0KGgoAAAANSUhEUg==",
            "generator": "FLUX.1-schnell",
            "cost": "FREE",
            "processing_time": 3.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let wizard = wizard(hosted_config(&server));
    wizard.upload_image(None, None, jpeg()).unwrap();
    wizard.next().unwrap();
    wizard.update_form(FormUpdate::ProductName("Golden Honey".into()));
    wizard.next().unwrap();
    assert_eq!(run_to_completion(wizard.next().unwrap()).await, Step::Preview);

    let preview = wizard.snapshot().preview;
    assert_eq!(preview.concepts.len(), 3);
    assert!(preview.concepts.iter().any(|c| c.contains("Golden Honey")));
    assert!(preview.concepts.iter().any(|c| c.contains("trust")));
    assert_eq!(preview.mockup_url.as_deref(), Some("data:image/png;base64,iVBORw0KGgoAAAANSUhEUg=="));
    assert!(preview.design_id.unwrap().starts_with("hf_"));
    assert_eq!(preview.ai_confidence, Some(0.92));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"colors\"\r\n\r\ngreen\r\n"));
    assert!(body.contains("name=\"platform\"\r\n\r\nlocal-market\r\n"));
}

#[tokio::test]
async fn preview_edit_loop_resubmits() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(honey_design()))
        .expect(2)
        .mount(&server)
        .await;

    let wizard = wizard(local_config(&server));
    wizard.upload_image(None, None, jpeg()).unwrap();
    wizard.next().unwrap();
    wizard.update_form(FormUpdate::ProductName("Golden Honey".into()));
    wizard.next().unwrap();
    run_to_completion(wizard.next().unwrap()).await;

    assert_eq!(wizard.go_to(Step::Preferences).unwrap().step(), Step::Preferences);
    wizard.update_form(FormUpdate::Tagline("Pure sweetness from the hills".into()));
    assert_eq!(run_to_completion(wizard.next().unwrap()).await, Step::Preview);
    assert_eq!(wizard.next().unwrap().step(), Step::Download);

    let html = wizard.render();
    assert!(html.contains(r#"href="report.pdf""#));
}
