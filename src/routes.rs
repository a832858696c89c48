use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::{BTreeSet, HashMap}, sync::Arc};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    backend::BackendAdapter,
    config::AppConfig,
    i18n::Translator,
    models::{ApiResponse, Customizations, DesiredEmotion, GenerationStatus, Notice, SalesPlatform, SavedDesign, Step},
    report::{design_report, ReportError},
    state::{FormUpdate, StateSnapshot},
    wizard::{Advance, Wizard, WizardError},
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, Wizard>>>,
    pub adapter: BackendAdapter,
    pub translator: Arc<Translator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(adapter: BackendAdapter, config: AppConfig) -> Self {
        Self {
            sessions: Arc::default(),
            adapter,
            translator: Arc::new(Translator::new(config.wizard.default_language.clone())),
            config: Arc::new(config),
        }
    }

    fn session(&self, id: Uuid) -> Result<Wizard, ApiError> {
        self.sessions.read().get(&id).cloned().ok_or(ApiError::NotFound)
    }
}

/// Room for multipart boundaries and part headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.api.max_file_size + MULTIPART_OVERHEAD;
    Router::new()
        .route("/api/health", get(health))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/view", get(view_session))
        .route("/api/sessions/:id/image", post(upload_image))
        .route("/api/sessions/:id/form", patch(update_form))
        .route("/api/sessions/:id/next", post(next_step))
        .route("/api/sessions/:id/back", post(previous_step))
        .route("/api/sessions/:id/goto/:step", post(goto_step))
        .route("/api/sessions/:id/language", put(set_language))
        .route("/api/sessions/:id/regenerate", post(regenerate))
        .route("/api/sessions/:id/save", post(save_design))
        .route("/api/sessions/:id/report.pdf", get(export_report))
        .layer(
            ServiceBuilder::new()
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Wizard(WizardError),
    Report(ReportError),
}

impl From<WizardError> for ApiError {
    fn from(e: WizardError) -> Self {
        ApiError::Wizard(e)
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        ApiError::Report(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "session not found".to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Wizard(e) => {
                let status = match &e {
                    WizardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    WizardError::InvalidTransition { .. } | WizardError::RequestInFlight | WizardError::NoDesign => {
                        StatusCode::CONFLICT
                    }
                    WizardError::FeatureDisabled(_) => StatusCode::FORBIDDEN,
                    WizardError::Backend(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            ApiError::Report(e) => {
                error!("❌ {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ApiResponse::<()>::fail(message))).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub state: StateSnapshot,
    pub notices: Vec<Notice>,
}

fn view(id: Uuid, wizard: &Wizard) -> Json<SessionView> {
    Json(SessionView { id, state: wizard.snapshot(), notices: wizard.take_notices() })
}

/// An empty body means defaults; anything else must decode cleanly.
fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewSession {
    pub language: Option<String>,
}

pub async fn create_session(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let body: NewSession = optional_json(&body)?;
    let id = Uuid::new_v4();
    let wizard = Wizard::new(state.adapter.clone(), state.translator.clone(), state.config.clone());
    if let Some(language) = body.language {
        wizard.set_language(&language);
    }
    state.sessions.write().insert(id, wizard.clone());
    info!("🌱 Created wizard session {}", id);
    Ok((StatusCode::CREATED, view(id, &wizard)))
}

pub async fn get_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    let wizard = state.session(id)?;
    Ok(view(id, &wizard))
}

pub async fn view_session(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.session(id)?.render()))
}

pub async fn upload_image(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, ApiError> {
    let wizard = state.session(id)?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        info!("📸 Session {} uploaded {} bytes", id, data.len());
        wizard.upload_image(file_name.as_deref(), content_type.as_deref(), data)?;
        return Ok(view(id, &wizard));
    }
    Err(ApiError::BadRequest("multipart body has no 'image' field".into()))
}

/// Partial form update; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormPatch {
    pub product_name: Option<String>,
    pub tagline: Option<String>,
    pub product_story: Option<String>,
    pub preferred_colors: Option<BTreeSet<String>>,
    pub sales_platform: Option<SalesPlatform>,
    pub desired_emotion: Option<DesiredEmotion>,
}

impl FormPatch {
    fn into_updates(self) -> Vec<FormUpdate> {
        let mut updates = Vec::new();
        if let Some(v) = self.product_name {
            updates.push(FormUpdate::ProductName(v));
        }
        if let Some(v) = self.tagline {
            updates.push(FormUpdate::Tagline(v));
        }
        if let Some(v) = self.product_story {
            updates.push(FormUpdate::ProductStory(v));
        }
        if let Some(v) = self.preferred_colors {
            updates.push(FormUpdate::PreferredColors(v));
        }
        if let Some(v) = self.sales_platform {
            updates.push(FormUpdate::SalesPlatform(v));
        }
        if let Some(v) = self.desired_emotion {
            updates.push(FormUpdate::DesiredEmotion(v));
        }
        updates
    }
}

pub async fn update_form(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<FormPatch>,
) -> Result<Json<SessionView>, ApiError> {
    let wizard = state.session(id)?;
    for update in body.into_updates() {
        wizard.update_form(update);
    }
    Ok(view(id, &wizard))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StepParams {
    /// Hold the response until a started generation settles.
    pub wait: bool,
}

async fn settle(id: Uuid, wizard: &Wizard, advance: Advance, wait: bool) -> (StatusCode, Json<SessionView>) {
    match advance {
        Advance::Generating(handle) if wait => {
            if let Err(e) = handle.await {
                error!("❌ Generation task for session {} panicked: {}", id, e);
            }
            (StatusCode::OK, view(id, wizard))
        }
        Advance::Generating(_) => (StatusCode::ACCEPTED, view(id, wizard)),
        Advance::Moved(_) => (StatusCode::OK, view(id, wizard)),
    }
}

pub async fn next_step(
    Path(id): Path<Uuid>,
    Query(params): Query<StepParams>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let wizard = state.session(id)?;
    let advance = wizard.next()?;
    Ok(settle(id, &wizard, advance, params.wait).await)
}

pub async fn previous_step(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    let wizard = state.session(id)?;
    wizard.back()?;
    Ok(view(id, &wizard))
}

pub async fn goto_step(
    Path((id, step)): Path<(Uuid, String)>,
    Query(params): Query<StepParams>,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let wizard = state.session(id)?;
    let step: Step = step.parse().map_err(ApiError::BadRequest)?;
    let advance = wizard.go_to(step)?;
    Ok(settle(id, &wizard, advance, params.wait).await)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LanguageBody {
    pub language: String,
}

pub async fn set_language(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<LanguageBody>,
) -> Result<Json<LanguageBody>, ApiError> {
    let language = state.session(id)?.set_language(&body.language);
    Ok(Json(LanguageBody { language }))
}

pub async fn regenerate(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionView>, ApiError> {
    let wizard = state.session(id)?;
    let customizations: Customizations = optional_json(&body)?;
    wizard.regenerate(customizations).await?;
    Ok(view(id, &wizard))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBody {
    pub user_email: String,
    pub design_name: String,
}

pub async fn save_design(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> Result<Json<ApiResponse<SavedDesign>>, ApiError> {
    let wizard = state.session(id)?;
    let saved = wizard.save_design(&body.user_email, &body.design_name).await?;
    Ok(Json(ApiResponse::ok(saved)))
}

pub async fn export_report(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.session(id)?.snapshot();
    if snapshot.status != GenerationStatus::Ready {
        return Err(WizardError::NoDesign.into());
    }
    let pdf_bytes = design_report(&snapshot)?;
    let file_name = snapshot.preview.design_id.as_deref().unwrap_or("design");
    let disposition = format!("attachment; filename=\"promptagro_{}.pdf\"", file_name.replace('"', ""));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf_bytes,
    )
        .into_response())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: &'static str,
    pub backend: String,
    pub backend_status: Option<String>,
    pub backend_error: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let backend = format!("{:?}", state.adapter.kind()).to_lowercase();
    let (backend_status, backend_error) = match state.adapter.health().await {
        Ok(status) => (Some(status.status), None),
        Err(e) => (None, Some(e.user_message().to_string())),
    };
    Json(HealthReport { status: "ok", backend, backend_status, backend_error })
}
