use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Wizard steps in the order a session walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    #[default]
    Upload,
    Story,
    Preferences,
    Generating,
    Preview,
    Download,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::Upload,
        Step::Story,
        Step::Preferences,
        Step::Generating,
        Step::Preview,
        Step::Download,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::Story => "story",
            Step::Preferences => "preferences",
            Step::Generating => "generating",
            Step::Preview => "preview",
            Step::Download => "download",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown step '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SalesPlatform {
    #[default]
    LocalMarket,
    FarmersMarket,
    Supermarket,
    Online,
    Export,
}

impl SalesPlatform {
    pub const ALL: [SalesPlatform; 5] = [
        SalesPlatform::LocalMarket,
        SalesPlatform::FarmersMarket,
        SalesPlatform::Supermarket,
        SalesPlatform::Online,
        SalesPlatform::Export,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SalesPlatform::LocalMarket => "local-market",
            SalesPlatform::FarmersMarket => "farmers-market",
            SalesPlatform::Supermarket => "supermarket",
            SalesPlatform::Online => "online",
            SalesPlatform::Export => "export",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DesiredEmotion {
    #[default]
    Trust,
    Joy,
    Freshness,
    Premium,
    Natural,
    Tradition,
}

impl DesiredEmotion {
    pub const ALL: [DesiredEmotion; 6] = [
        DesiredEmotion::Trust,
        DesiredEmotion::Joy,
        DesiredEmotion::Freshness,
        DesiredEmotion::Premium,
        DesiredEmotion::Natural,
        DesiredEmotion::Tradition,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DesiredEmotion::Trust => "trust",
            DesiredEmotion::Joy => "joy",
            DesiredEmotion::Freshness => "freshness",
            DesiredEmotion::Premium => "premium",
            DesiredEmotion::Natural => "natural",
            DesiredEmotion::Tradition => "tradition",
        }
    }
}

/// An uploaded product photo. The raw bytes stay server-side; only metadata
/// and the preview URI are serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    pub preview: String,
    #[serde(skip_serializing)]
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    pub image: Option<ImageUpload>,
    pub product_name: String,
    pub tagline: String,
    pub product_story: String,
    pub preferred_colors: BTreeSet<String>,
    pub sales_platform: SalesPlatform,
    pub desired_emotion: DesiredEmotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    #[default]
    Serif,
    SansSerif,
    Script,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    #[default]
    TopLabel,
    CenterLabel,
    BottomLabel,
    Wrap,
}

/// Post-generation adjustments sent along with a regeneration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customizations {
    pub brightness: u8,
    pub contrast: u8,
    pub saturation: u8,
    pub font_style: FontStyle,
    pub layout: Layout,
}

impl Default for Customizations {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            saturation: 100,
            font_style: FontStyle::default(),
            layout: Layout::default(),
        }
    }
}

impl Customizations {
    pub const MAX_PERCENT: u8 = 200;

    pub fn clamped(self) -> Self {
        Self {
            brightness: self.brightness.min(Self::MAX_PERCENT),
            contrast: self.contrast.min(Self::MAX_PERCENT),
            saturation: self.saturation.min(Self::MAX_PERCENT),
            ..self
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewState {
    pub mockup_url: Option<String>,
    pub pdf_url: Option<String>,
    pub design_id: Option<String>,
    pub concepts: Vec<String>,
    pub color_palette: Vec<String>,
    pub styles_suggestions: Vec<String>,
    pub ai_confidence: Option<f64>,
    pub professional_advice: Option<String>,
    pub customizations: Customizations,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadingState {
    pub is_loading: bool,
    pub progress: f32,
    pub message: String,
}

/// Where the session stands with respect to design generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum GenerationStatus {
    #[default]
    NotSubmitted,
    Loading,
    Ready,
    Failed { message: String },
}

/// The backend-agnostic design both backends are normalized into.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanonicalResult {
    pub design_id: String,
    pub mockup_url: Option<String>,
    pub report_url: Option<String>,
    pub concepts: Vec<String>,
    pub color_palette: Vec<String>,
    pub styles_suggestions: Vec<String>,
    pub ai_confidence: Option<f64>,
    pub processing_time: Option<f64>,
    pub generator: Option<String>,
    pub cost: Option<serde_json::Value>,
    pub prompt_used: Option<String>,
    pub professional_advice: Option<String>,
}

/// `{success, data?, error?}` as spoken by the local backend and returned by
/// the adapter.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(error.into()) }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_default()),
        }
    }
}

/// Everything a backend needs to produce a design, captured from a form
/// snapshot at submit time.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: Option<ImageUpload>,
    pub product_name: String,
    pub tagline: String,
    pub product_story: String,
    pub preferred_colors: Vec<String>,
    pub sales_platform: SalesPlatform,
    pub desired_emotion: DesiredEmotion,
    pub language: String,
}

impl GenerationRequest {
    pub fn from_form(form: &FormState, language: &str) -> Self {
        Self {
            image: form.image.clone(),
            product_name: form.product_name.trim().to_string(),
            tagline: form.tagline.trim().to_string(),
            product_story: form.product_story.trim().to_string(),
            preferred_colors: form.preferred_colors.iter().cloned().collect(),
            sales_platform: form.sales_platform,
            desired_emotion: form.desired_emotion,
            language: language.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateRequest<'a> {
    pub design_id: &'a str,
    pub customizations: &'a Customizations,
    pub language: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDesignRequest {
    pub design_id: String,
    pub user_email: String,
    pub design_name: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedDesign {
    pub saved_design_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: Option<String>,
    pub services: std::collections::BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// A toast-style message queued for the next render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }
}
