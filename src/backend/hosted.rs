use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use reqwest::{multipart::Form, Client};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::{http_client, read_json, BackendError, GenerationBackend};
use crate::{
    config::BackendKind,
    models::{CanonicalResult, GenerationRequest, HealthStatus},
};

const DEFAULT_PRODUCT_NAME: &str = "Agricultural Product";
const DEFAULT_COLOR: &str = "green";
const DEFAULT_PALETTE: [&str; 2] = ["#2E7D32", "#4CAF50"];
const DEFAULT_STYLES: [&str; 3] = ["Modern", "Professional", "Agricultural"];
const DEFAULT_CONFIDENCE: f64 = 0.92;

/// Hugging Face Space exposing `/generate-packaging/`. It only takes text
/// fields and answers with a base64 image, so its reply is filled out into a
/// full [`CanonicalResult`].
pub struct HostedBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

/// Native reply of the Space. The optional design fields are honored when a
/// newer Space build starts sending them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct HostedResponse {
    pub success: bool,
    pub image_data: Option<String>,
    pub generator: Option<String>,
    pub cost: Option<serde_json::Value>,
    pub processing_time: Option<f64>,
    pub prompt_used: Option<String>,
    pub error: Option<String>,
    pub design_id: Option<String>,
    pub concepts: Option<Vec<String>>,
    pub style_suggestions: Option<Vec<String>>,
    pub color_palette: Option<Vec<String>>,
    pub ai_confidence: Option<f64>,
}

impl HostedBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub(crate) fn build_form(request: &GenerationRequest) -> Form {
        let colors = if request.preferred_colors.is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            request.preferred_colors.join(",")
        };
        Form::new()
            .text("product_name", product_name(request).to_string())
            .text("colors", colors)
            .text("emotion", request.desired_emotion.as_str())
            .text("platform", request.sales_platform.as_str())
    }
}

fn product_name(request: &GenerationRequest) -> &str {
    if request.product_name.is_empty() {
        DEFAULT_PRODUCT_NAME
    } else {
        &request.product_name
    }
}

/// Stand-in concepts for a Space that sends none.
pub fn placeholder_concepts(product_name: &str, emotion: &str) -> Vec<String> {
    vec![
        format!("Premium {product_name} - AI Generated"),
        "Professional packaging design".to_string(),
        format!("{emotion} focused branding"),
    ]
}

/// Reshapes the Space's reply into the canonical result, filling every
/// field the preview needs.
pub(crate) fn reshape(
    response: HostedResponse,
    request: &GenerationRequest,
    now_millis: i64,
) -> Result<CanonicalResult, BackendError> {
    if !response.success {
        return Err(BackendError::Provider(
            response.error.filter(|e| !e.is_empty()).unwrap_or_else(|| "Generation failed".into()),
        ));
    }

    let non_empty = |v: Option<Vec<String>>| v.filter(|items| !items.is_empty());
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let concepts = non_empty(response.concepts)
        .unwrap_or_else(|| placeholder_concepts(product_name(request), request.desired_emotion.as_str()));
    let color_palette = non_empty(response.color_palette)
        .or_else(|| non_empty(Some(request.preferred_colors.clone())))
        .unwrap_or_else(|| owned(&DEFAULT_PALETTE[..]));

    Ok(CanonicalResult {
        design_id: response
            .design_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("hf_{now_millis}")),
        mockup_url: response.image_data.as_deref().map(image_data_uri),
        report_url: None,
        concepts,
        color_palette,
        styles_suggestions: non_empty(response.style_suggestions).unwrap_or_else(|| owned(&DEFAULT_STYLES[..])),
        ai_confidence: Some(response.ai_confidence.unwrap_or(DEFAULT_CONFIDENCE)),
        processing_time: response.processing_time,
        generator: response.generator,
        cost: response.cost,
        prompt_used: response.prompt_used,
        professional_advice: None,
    })
}

/// The Space returns either a ready `data:` URI or bare base64; bare data is
/// wrapped using the MIME type sniffed from its first bytes.
pub(crate) fn image_data_uri(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("data:") || raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    let head: String = raw.chars().filter(char::is_ascii).take(64).collect();
    let head = &head[..head.len() - head.len() % 4];
    let mime = base64::engine::general_purpose::STANDARD
        .decode(head)
        .ok()
        .and_then(|bytes| image::guess_format(&bytes).ok())
        .map(|format| format.to_mime_type())
        .unwrap_or_else(|| {
            warn!("⚠️ Could not sniff image type of hosted result, assuming PNG");
            "image/png"
        });
    format!("data:{mime};base64,{raw}")
}

#[async_trait]
impl GenerationBackend for HostedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Hosted
    }

    async fn submit_generation(&self, request: &GenerationRequest) -> Result<CanonicalResult, BackendError> {
        let url = format!("{}/generate-packaging/", self.base_url);
        info!("🚀 Sending '{}' to hosted Space: {}", product_name(request), url);

        let response = self
            .client
            .post(&url)
            .multipart(Self::build_form(request))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.timeout))?;
        let parsed: HostedResponse = read_json(response, self.timeout).await?;

        if let Some(generator) = &parsed.generator {
            info!("🖼️ Space answered via {} in {:?}s", generator, parsed.processing_time);
        }
        reshape(parsed, request, Utc::now().timestamp_millis())
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.timeout))?;
        read_json(response, self.timeout).await
    }
}
