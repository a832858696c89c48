use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use super::{http_client, read_json, BackendError, GenerationBackend};
use crate::{
    config::BackendKind,
    models::{
        ApiResponse, CanonicalResult, Customizations, GenerationRequest, HealthStatus, RegenerateRequest,
        SaveDesignRequest, SavedDesign,
    },
};

/// Our own REST backend: multipart `/generate`, JSON everywhere else.
pub struct LocalBackend {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveDesignResponse {
    #[serde(default)]
    success: bool,
    saved_design_id: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl LocalBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn build_form(request: &GenerationRequest) -> Result<Form, BackendError> {
        let mut form = Form::new();
        if let Some(image) = &request.image {
            let part = Part::bytes(image.data.to_vec())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)
                .map_err(|e| BackendError::Protocol(format!("invalid image type {}: {}", image.content_type, e)))?;
            form = form.part("image", part);
        }
        let colors = serde_json::to_string(&request.preferred_colors)
            .map_err(|e| BackendError::Protocol(e.to_string()))?;
        Ok(form
            .text("productName", request.product_name.clone())
            .text("tagline", request.tagline.clone())
            .text("preferredColors", colors)
            .text("salesPlatform", request.sales_platform.as_str())
            .text("desiredEmotion", request.desired_emotion.as_str())
            .text("productStory", request.product_story.clone())
            .text("language", request.language.clone()))
    }

    async fn send_envelope(
        &self,
        builder: reqwest::RequestBuilder,
        fallback_error: &str,
    ) -> Result<CanonicalResult, BackendError> {
        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.timeout))?;
        let envelope: ApiResponse<CanonicalResult> = read_json(response, self.timeout).await?;
        match envelope {
            ApiResponse { success: true, data: Some(data), .. } => Ok(data),
            ApiResponse { success: true, data: None, .. } => {
                Err(BackendError::Protocol("envelope reported success without data".into()))
            }
            ApiResponse { error, .. } => Err(BackendError::Provider(
                error.filter(|e| !e.is_empty()).unwrap_or_else(|| fallback_error.to_string()),
            )),
        }
    }
}

#[async_trait]
impl GenerationBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn submit_generation(&self, request: &GenerationRequest) -> Result<CanonicalResult, BackendError> {
        let form = Self::build_form(request)?;
        let url = self.endpoint("/generate");
        info!("🔗 POST {}", url);
        self.send_envelope(self.client.post(&url).multipart(form), "Failed to generate packaging")
            .await
    }

    async fn regenerate(
        &self,
        design_id: &str,
        customizations: &Customizations,
        language: &str,
    ) -> Result<CanonicalResult, BackendError> {
        let body = RegenerateRequest { design_id, customizations, language };
        let url = self.endpoint("/regenerate");
        info!("🔗 POST {} for design {}", url, design_id);
        self.send_envelope(self.client.post(&url).json(&body), "Failed to regenerate design")
            .await
    }

    async fn save_design(&self, request: &SaveDesignRequest) -> Result<SavedDesign, BackendError> {
        let url = self.endpoint("/save-design");
        info!("🔗 POST {} for design {}", url, request.design_id);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.timeout))?;
        let saved: SaveDesignResponse = read_json(response, self.timeout).await?;
        if saved.success {
            Ok(SavedDesign { saved_design_id: saved.saved_design_id, message: saved.message })
        } else {
            Err(BackendError::Provider(saved.error.unwrap_or_else(|| "Failed to save design".into())))
        }
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self
            .client
            .get(self.endpoint("/health"))
            .send()
            .await
            .map_err(|e| BackendError::from_transport(e, self.timeout))?;
        read_json(response, self.timeout).await
    }
}
