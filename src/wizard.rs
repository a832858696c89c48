use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    backend::{resolve_asset_url, BackendAdapter, GENERIC_ERROR_MESSAGE},
    config::{AppConfig, FailurePolicy},
    i18n::Translator,
    models::{
        ApiResponse, CanonicalResult, Customizations, GenerationRequest, GenerationStatus, Notice,
        SaveDesignRequest, SavedDesign, Step,
    },
    progress::ProgressTicker,
    render::{self, safe_url, RenderContext},
    state::{FormUpdate, LoadingUpdate, PreviewUpdate, StateSnapshot, StateStore},
    upload::{validate_image, UploadError},
};

/// User input that blocks a transition. Never reaches the backend.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("no product image uploaded")]
    MissingImage,
    #[error("product name must have at least {min} characters")]
    ProductNameTooShort { min: usize },
    #[error("product story must have at most {max} characters")]
    StoryTooLong { max: usize },
    #[error("invalid image: {0}")]
    InvalidImage(#[from] UploadError),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("design name is empty")]
    DesignNameMissing,
}

impl ValidationError {
    fn message(&self, translator: &Translator, language: &str) -> String {
        match self {
            ValidationError::MissingImage => translator.t(language, "errors.missingImage"),
            ValidationError::ProductNameTooShort { min } => {
                translator.translate(language, "errors.productNameTooShort", &[("min", min.to_string().as_str())])
            }
            ValidationError::StoryTooLong { max } => {
                translator.translate(language, "errors.storyTooLong", &[("max", max.to_string().as_str())])
            }
            ValidationError::InvalidImage(UploadError::TooLarge { max, .. }) => {
                let megabytes = (max / (1024 * 1024)).max(1);
                translator.translate(language, "errors.imageTooLarge", &[("max", megabytes.to_string().as_str())])
            }
            ValidationError::InvalidImage(_) => translator.t(language, "errors.invalidImage"),
            ValidationError::InvalidEmail => translator.t(language, "errors.invalidEmail"),
            ValidationError::DesignNameMissing => translator.t(language, "errors.designNameMissing"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot move from {from} to {to}")]
    InvalidTransition { from: Step, to: Step },
    #[error("a generation request is already in flight")]
    RequestInFlight,
    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),
    #[error("no design has been generated yet")]
    NoDesign,
    #[error("{0}")]
    Backend(String),
}

/// Result of a forward move. Entering `generating` hands back the task that
/// runs the request; it resolves to the step the session ends up on.
#[derive(Debug)]
pub enum Advance {
    Moved(Step),
    Generating(JoinHandle<Step>),
}

impl Advance {
    pub fn step(&self) -> Step {
        match self {
            Advance::Moved(step) => *step,
            Advance::Generating(_) => Step::Generating,
        }
    }
}

/// One visitor's walk through the wizard. Clones share the session.
#[derive(Clone)]
pub struct Wizard {
    store: StateStore,
    adapter: BackendAdapter,
    translator: Arc<Translator>,
    config: Arc<AppConfig>,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl Wizard {
    pub fn new(adapter: BackendAdapter, translator: Arc<Translator>, config: Arc<AppConfig>) -> Self {
        Self {
            store: StateStore::new(config.wizard.default_language.clone()),
            adapter,
            translator,
            config,
            notices: Arc::default(),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.store.get_state()
    }

    pub fn current_step(&self) -> Step {
        self.store.read(|s| s.step)
    }

    fn language(&self) -> String {
        self.store.read(|s| s.language.clone())
    }

    fn tr(&self, key: &str) -> String {
        self.translator.t(&self.language(), key)
    }

    fn push_notice(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.notices.lock())
    }

    fn reject<T>(&self, error: ValidationError) -> Result<T, WizardError> {
        warn!("🚫 Validation failed on step {}: {}", self.current_step(), error);
        self.push_notice(Notice::error(error.message(&self.translator, &self.language())));
        Err(error.into())
    }

    pub fn upload_image(
        &self,
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<(), WizardError> {
        match validate_image(file_name, content_type, data, &self.config.api) {
            Ok(upload) => {
                self.store.update_form(FormUpdate::Image(upload));
                self.push_notice(Notice::success(self.tr("notices.imageUploaded")));
                Ok(())
            }
            Err(e) => self.reject(e.into()),
        }
    }

    /// Stores raw input; constraints are checked when leaving a step.
    pub fn update_form(&self, update: FormUpdate) {
        self.store.update_form(update);
    }

    /// Switches UI language, falling back to the default for unknown codes.
    pub fn set_language(&self, requested: &str) -> String {
        let settings = &self.config.wizard;
        let resolved = self.translator.resolve_language(requested);
        let language = if settings.languages.contains(&resolved) {
            resolved
        } else {
            settings.default_language.clone()
        };
        self.store.set_language(language.clone());
        language
    }

    fn validate_story(&self, snapshot: &StateSnapshot) -> Result<(), ValidationError> {
        let settings = &self.config.wizard;
        if snapshot.form.product_name.trim().chars().count() < settings.min_product_name_length {
            return Err(ValidationError::ProductNameTooShort { min: settings.min_product_name_length });
        }
        if snapshot.form.product_story.trim().chars().count() > settings.max_story_length {
            return Err(ValidationError::StoryTooLong { max: settings.max_story_length });
        }
        if snapshot.form.image.is_none() {
            return Err(ValidationError::MissingImage);
        }
        Ok(())
    }

    pub fn next(&self) -> Result<Advance, WizardError> {
        let (from, status) = self.store.read(|s| (s.step, s.status.clone()));
        let target = match from {
            Step::Upload => Step::Story,
            Step::Story => Step::Preferences,
            Step::Preferences => Step::Generating,
            Step::Generating => match status {
                GenerationStatus::Loading => return Err(WizardError::RequestInFlight),
                GenerationStatus::Ready => Step::Preview,
                _ => Step::Generating,
            },
            Step::Preview => Step::Download,
            Step::Download => return Err(WizardError::InvalidTransition { from, to: from }),
        };
        self.go_to(target)
    }

    pub fn back(&self) -> Result<Step, WizardError> {
        let from = self.current_step();
        let target = match from {
            Step::Story => Step::Upload,
            Step::Preferences => Step::Story,
            Step::Generating => Step::Preferences,
            Step::Preview => Step::Story,
            Step::Upload | Step::Download => return Err(WizardError::InvalidTransition { from, to: from }),
        };
        self.go_to(target).map(|advance| advance.step())
    }

    /// Moves to `target` if an edge leads there from the current step.
    /// Re-entering the current step is a no-op that re-renders.
    pub fn go_to(&self, target: Step) -> Result<Advance, WizardError> {
        let snapshot = self.store.get_state();
        let from = snapshot.step;
        let failed = matches!(snapshot.status, GenerationStatus::Failed { .. });
        let ready = snapshot.status == GenerationStatus::Ready;

        match (from, target) {
            (Step::Upload, Step::Story) => {
                if snapshot.form.image.is_none() {
                    return self.reject(ValidationError::MissingImage);
                }
            }
            (Step::Story, Step::Preferences) => {
                if let Err(e) = self.validate_story(&snapshot) {
                    return self.reject(e);
                }
            }
            (Step::Preferences, Step::Generating) => return self.start_generation().map(Advance::Generating),
            (Step::Generating, Step::Generating) if failed => {
                info!("🔁 Retrying generation");
                return self.start_generation().map(Advance::Generating);
            }
            (Step::Generating, Step::Preview) | (Step::Preview, Step::Download) => {
                if !ready {
                    return Err(WizardError::NoDesign);
                }
            }
            (Step::Generating, Step::Preferences) => {
                if snapshot.loading.is_loading {
                    return Err(WizardError::RequestInFlight);
                }
            }
            (Step::Story, Step::Upload)
            | (Step::Preferences, Step::Story)
            | (Step::Preview, Step::Story)
            | (Step::Preview, Step::Preferences) => {}
            (a, b) if a == b => return Ok(Advance::Moved(a)),
            _ => return Err(WizardError::InvalidTransition { from, to: target }),
        }

        self.store.set_step(target);
        info!("➡️ Wizard moved {} → {}", from, target);
        Ok(Advance::Moved(target))
    }

    fn start_generation(&self) -> Result<JoinHandle<Step>, WizardError> {
        let snapshot = self.store.get_state();
        if !self.store.try_begin_request("Preparing your design...") {
            self.push_notice(Notice::error(self.tr("errors.requestInFlight")));
            return Err(WizardError::RequestInFlight);
        }
        self.store.set_status(GenerationStatus::Loading);
        self.store.set_step(Step::Generating);

        let request = GenerationRequest::from_form(&snapshot.form, &snapshot.language);
        let wizard = self.clone();
        Ok(tokio::spawn(async move { wizard.run_generation(request).await }))
    }

    async fn run_generation(&self, request: GenerationRequest) -> Step {
        let settings = &self.config.wizard;
        let ticker = ProgressTicker::start(
            self.store.clone(),
            settings.progress_update_interval,
            settings.max_progress_time,
        );
        let outcome = self.adapter.generate(&request).await;
        ticker.cancel().await;
        self.finish_generation(outcome)
    }

    fn finish_generation(&self, outcome: ApiResponse<CanonicalResult>) -> Step {
        match outcome.into_result() {
            Ok(result) => {
                self.apply_result(result);
                self.store.update_loading(LoadingUpdate::Progress(100.0));
                self.store.update_loading(LoadingUpdate::Message("Design ready!".into()));
                self.store.update_loading(LoadingUpdate::IsLoading(false));
                self.store.set_status(GenerationStatus::Ready);
                self.store.set_step(Step::Preview);
                self.push_notice(Notice::success(self.tr("notices.designGenerated")));
                info!("🎨 Design ready, showing preview");
                Step::Preview
            }
            Err(message) => {
                let message = if message.is_empty() { GENERIC_ERROR_MESSAGE.to_string() } else { message };
                self.store.update_loading(LoadingUpdate::Message(message.clone()));
                self.store.update_loading(LoadingUpdate::IsLoading(false));
                self.store.set_status(GenerationStatus::Failed { message: message.clone() });
                self.push_notice(Notice::error(message));
                let step = match self.config.wizard.on_failure {
                    FailurePolicy::Stay => Step::Generating,
                    FailurePolicy::ReturnTo(step) => step,
                };
                self.store.set_step(step);
                warn!("⚠️ Generation failed, session now on {}", step);
                step
            }
        }
    }

    fn resolve(&self, url: Option<String>) -> Option<String> {
        url.filter(|u| !u.trim().is_empty())
            .map(|u| resolve_asset_url(&self.config.api.asset_base_url, &u))
            .filter(|u| safe_url(u).is_some())
    }

    fn apply_result(&self, result: CanonicalResult) {
        let design_id = Some(result.design_id).filter(|id| !id.is_empty());
        self.store.update_preview(PreviewUpdate::MockupUrl(self.resolve(result.mockup_url)));
        self.store.update_preview(PreviewUpdate::PdfUrl(self.resolve(result.report_url)));
        self.store.update_preview(PreviewUpdate::DesignId(design_id));
        self.store.update_preview(PreviewUpdate::Concepts(result.concepts));
        self.store.update_preview(PreviewUpdate::ColorPalette(result.color_palette));
        self.store.update_preview(PreviewUpdate::StylesSuggestions(result.styles_suggestions));
        self.store.update_preview(PreviewUpdate::AiConfidence(result.ai_confidence));
        self.store.update_preview(PreviewUpdate::ProfessionalAdvice(result.professional_advice));
    }

    fn require_design(&self) -> Result<(StateSnapshot, String), WizardError> {
        let snapshot = self.store.get_state();
        if snapshot.status != GenerationStatus::Ready {
            return Err(WizardError::NoDesign);
        }
        let design_id = snapshot.preview.design_id.clone().ok_or(WizardError::NoDesign)?;
        Ok((snapshot, design_id))
    }

    /// Asks the backend for a new mockup with adjusted customizations.
    pub async fn regenerate(&self, customizations: Customizations) -> Result<(), WizardError> {
        if !self.config.features.design_regeneration {
            return Err(WizardError::FeatureDisabled("design regeneration"));
        }
        let (snapshot, design_id) = self.require_design()?;
        if snapshot.step != Step::Preview {
            return Err(WizardError::InvalidTransition { from: snapshot.step, to: Step::Preview });
        }

        if !self.store.try_begin_request("Applying your changes...") {
            return Err(WizardError::RequestInFlight);
        }
        let customizations = customizations.clamped();
        self.store.update_preview(PreviewUpdate::Customizations(customizations));

        let settings = &self.config.wizard;
        let ticker = ProgressTicker::start(
            self.store.clone(),
            settings.progress_update_interval,
            settings.max_progress_time,
        );
        let outcome = self.adapter.regenerate(&design_id, &customizations, &snapshot.language).await;
        ticker.cancel().await;
        self.store.update_loading(LoadingUpdate::IsLoading(false));

        match outcome.into_result() {
            Ok(result) => {
                if let Some(url) = self.resolve(result.mockup_url) {
                    self.store.update_preview(PreviewUpdate::MockupUrl(Some(url)));
                }
                if result.ai_confidence.is_some() {
                    self.store.update_preview(PreviewUpdate::AiConfidence(result.ai_confidence));
                }
                self.store.update_loading(LoadingUpdate::Progress(100.0));
                self.push_notice(Notice::success(self.tr("notices.designRegenerated")));
                Ok(())
            }
            Err(message) => {
                self.push_notice(Notice::error(message.clone()));
                Err(WizardError::Backend(message))
            }
        }
    }

    pub async fn save_design(&self, user_email: &str, design_name: &str) -> Result<SavedDesign, WizardError> {
        if !self.config.features.user_accounts {
            return Err(WizardError::FeatureDisabled("user accounts"));
        }
        let (_, design_id) = self.require_design()?;

        let user_email = user_email.trim();
        let valid_email = user_email
            .split_once('@')
            .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.') && !domain.ends_with('.'));
        if !valid_email {
            return self.reject(ValidationError::InvalidEmail);
        }
        if design_name.trim().is_empty() {
            return self.reject(ValidationError::DesignNameMissing);
        }

        let request = SaveDesignRequest {
            design_id,
            user_email: user_email.to_string(),
            design_name: design_name.trim().to_string(),
        };
        match self.adapter.save_design(&request).await.into_result() {
            Ok(saved) => {
                self.push_notice(Notice::success(self.tr("notices.designSaved")));
                Ok(saved)
            }
            Err(message) => {
                self.push_notice(Notice::error(message.clone()));
                Err(WizardError::Backend(message))
            }
        }
    }

    /// HTML for the current step, including any pending notices.
    pub fn render(&self) -> String {
        let notices = self.take_notices();
        let snapshot = self.store.get_state();
        render::render_step(&RenderContext {
            snapshot: &snapshot,
            translator: &self.translator,
            features: &self.config.features,
            story_limit: self.config.wizard.max_story_length,
            notices: &notices,
        })
    }
}
