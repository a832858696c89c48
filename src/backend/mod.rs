pub mod hosted;
pub mod local;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
    config::{ApiConfig, BackendKind},
    models::{ApiResponse, CanonicalResult, Customizations, GenerationRequest, HealthStatus, SaveDesignRequest, SavedDesign},
};

pub use hosted::HostedBackend;
pub use local::LocalBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {status}: {detail}")]
    Http { status: u16, detail: String },
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("{0}")]
    Provider(String),
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";

const ERROR_MESSAGES: &[(&str, &str)] = &[
    ("Failed to fetch", "Network error. Please check your connection."),
    ("HTTP 400", "Invalid request. Please check your inputs."),
    ("HTTP 401", "Authentication required. Please log in."),
    ("HTTP 403", "Access denied."),
    ("HTTP 404", "Service not found."),
    ("HTTP 500", "Server error. Please try again later."),
];

impl BackendError {
    fn lookup_key(&self) -> Option<String> {
        match self {
            BackendError::Network(_) | BackendError::Timeout(_) => Some("Failed to fetch".into()),
            BackendError::Http { status, .. } => Some(format!("HTTP {status}")),
            BackendError::Provider(message) => Some(message.clone()),
            BackendError::Protocol(_) | BackendError::Unsupported(_) => None,
        }
    }

    /// Short text safe to show a user.
    pub fn user_message(&self) -> &'static str {
        self.lookup_key()
            .and_then(|key| ERROR_MESSAGES.iter().find(|(k, _)| *k == key))
            .map(|(_, message)| *message)
            .unwrap_or(GENERIC_ERROR_MESSAGE)
    }

    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout)
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

/// A generation service the wizard can submit to.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn submit_generation(&self, request: &GenerationRequest) -> Result<CanonicalResult, BackendError>;

    async fn regenerate(
        &self,
        _design_id: &str,
        _customizations: &Customizations,
        _language: &str,
    ) -> Result<CanonicalResult, BackendError> {
        Err(BackendError::Unsupported("regeneration"))
    }

    async fn save_design(&self, _request: &SaveDesignRequest) -> Result<SavedDesign, BackendError> {
        Err(BackendError::Unsupported("saving designs"))
    }

    async fn health(&self) -> Result<HealthStatus, BackendError>;
}

/// Front door to the configured backend. Every call settles into an
/// [`ApiResponse`]; failures are logged and turned into user-facing text.
#[derive(Clone)]
pub struct BackendAdapter {
    backend: Arc<dyn GenerationBackend>,
}

impl BackendAdapter {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(api: &ApiConfig) -> Result<Self, BackendError> {
        let backend: Arc<dyn GenerationBackend> = match api.backend {
            BackendKind::Local => Arc::new(LocalBackend::new(&api.base_url, api.timeout)?),
            BackendKind::Hosted => Arc::new(HostedBackend::new(&api.base_url, api.timeout)?),
        };
        info!("🔌 Using {:?} backend at {}", api.backend, api.base_url);
        Ok(Self::new(backend))
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn generate(&self, request: &GenerationRequest) -> ApiResponse<CanonicalResult> {
        info!(
            "🚀 Submitting '{}' to {:?} backend ({} colors, image: {})",
            request.product_name,
            self.kind(),
            request.preferred_colors.len(),
            request.image.as_ref().map(|i| i.size).unwrap_or_default()
        );
        settle("generation", self.backend.submit_generation(request).await)
    }

    pub async fn regenerate(
        &self,
        design_id: &str,
        customizations: &Customizations,
        language: &str,
    ) -> ApiResponse<CanonicalResult> {
        settle("regeneration", self.backend.regenerate(design_id, customizations, language).await)
    }

    pub async fn save_design(&self, request: &SaveDesignRequest) -> ApiResponse<SavedDesign> {
        settle("save", self.backend.save_design(request).await)
    }

    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        self.backend.health().await
    }
}

fn settle<T>(operation: &str, result: Result<T, BackendError>) -> ApiResponse<T> {
    match result {
        Ok(data) => {
            info!("✅ Backend {} succeeded", operation);
            ApiResponse::ok(data)
        }
        Err(e) => {
            error!("❌ Backend {} failed: {}", operation, e);
            ApiResponse::fail(e.user_message())
        }
    }
}

/// Makes a backend asset reference displayable: absolute URLs (including
/// `data:` URIs) pass through, anything else is prefixed with `base`.
pub fn resolve_asset_url(base: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    let base = base.trim_end_matches('/');
    if raw.starts_with('/') {
        format!("{base}{raw}")
    } else {
        format!("{base}/{raw}")
    }
}

/// Reads a JSON body, classifying non-2xx statuses and undecodable payloads.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    timeout: Duration,
) -> Result<T, BackendError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::from_transport(e, timeout))?;

    if !status.is_success() {
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .or_else(|| v.get("detail"))
                    .and_then(|d| d.as_str().map(str::to_string))
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
        return Err(BackendError::Http { status: status.as_u16(), detail });
    }

    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        BackendError::Protocol(format!("{e}: {preview}"))
    })
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Network(e.to_string()))
}
