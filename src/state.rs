use parking_lot::RwLock;
use serde::Serialize;
use std::{collections::BTreeSet, sync::Arc};

use crate::models::{
    Customizations, DesiredEmotion, FormState, GenerationStatus, ImageUpload, LoadingState,
    PreviewState, SalesPlatform, Step,
};

#[derive(Debug, Clone)]
pub enum FormUpdate {
    Image(ImageUpload),
    ProductName(String),
    Tagline(String),
    ProductStory(String),
    PreferredColors(BTreeSet<String>),
    SalesPlatform(SalesPlatform),
    DesiredEmotion(DesiredEmotion),
}

impl FormUpdate {
    pub fn field(&self) -> &'static str {
        match self {
            FormUpdate::Image(_) => "image",
            FormUpdate::ProductName(_) => "productName",
            FormUpdate::Tagline(_) => "tagline",
            FormUpdate::ProductStory(_) => "productStory",
            FormUpdate::PreferredColors(_) => "preferredColors",
            FormUpdate::SalesPlatform(_) => "salesPlatform",
            FormUpdate::DesiredEmotion(_) => "desiredEmotion",
        }
    }
}

#[derive(Debug, Clone)]
pub enum PreviewUpdate {
    MockupUrl(Option<String>),
    PdfUrl(Option<String>),
    DesignId(Option<String>),
    Concepts(Vec<String>),
    ColorPalette(Vec<String>),
    StylesSuggestions(Vec<String>),
    AiConfidence(Option<f64>),
    ProfessionalAdvice(Option<String>),
    Customizations(Customizations),
}

impl PreviewUpdate {
    pub fn field(&self) -> &'static str {
        match self {
            PreviewUpdate::MockupUrl(_) => "mockupUrl",
            PreviewUpdate::PdfUrl(_) => "pdfUrl",
            PreviewUpdate::DesignId(_) => "designId",
            PreviewUpdate::Concepts(_) => "concepts",
            PreviewUpdate::ColorPalette(_) => "colorPalette",
            PreviewUpdate::StylesSuggestions(_) => "stylesSuggestions",
            PreviewUpdate::AiConfidence(_) => "aiConfidence",
            PreviewUpdate::ProfessionalAdvice(_) => "professionalAdvice",
            PreviewUpdate::Customizations(_) => "customizations",
        }
    }
}

#[derive(Debug, Clone)]
pub enum LoadingUpdate {
    IsLoading(bool),
    Progress(f32),
    Message(String),
}

impl LoadingUpdate {
    pub fn field(&self) -> &'static str {
        match self {
            LoadingUpdate::IsLoading(_) => "isLoading",
            LoadingUpdate::Progress(_) => "progress",
            LoadingUpdate::Message(_) => "message",
        }
    }
}

/// What subscribers receive after every mutation.
#[derive(Debug, Clone)]
pub enum StateChange {
    Form(FormUpdate),
    Preview(PreviewUpdate),
    Loading(LoadingUpdate),
    Step(Step),
    Language(String),
    Status(GenerationStatus),
}

impl StateChange {
    pub fn category(&self) -> &'static str {
        match self {
            StateChange::Form(_) => "form",
            StateChange::Preview(_) => "preview",
            StateChange::Loading(_) => "loading",
            StateChange::Step(_) => "step",
            StateChange::Language(_) => "language",
            StateChange::Status(_) => "status",
        }
    }

    /// Field name within the category; `None` for single-valued categories.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            StateChange::Form(u) => Some(u.field()),
            StateChange::Preview(u) => Some(u.field()),
            StateChange::Loading(u) => Some(u.field()),
            _ => None,
        }
    }
}

/// Owned copy of a session's state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub step: Step,
    pub language: String,
    pub status: GenerationStatus,
    pub form: FormState,
    pub preview: PreviewState,
    pub loading: LoadingState,
}

type Listener = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Per-session state container with synchronous change notification.
///
/// Clones share the same underlying state. Listeners run after the write
/// lock is released, so they may read the store.
#[derive(Clone)]
pub struct StateStore {
    state: Arc<RwLock<StateSnapshot>>,
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl StateStore {
    pub fn new(language: impl Into<String>) -> Self {
        let snapshot = StateSnapshot {
            step: Step::default(),
            language: language.into(),
            status: GenerationStatus::default(),
            form: FormState::default(),
            preview: PreviewState::default(),
            loading: LoadingState::default(),
        };
        Self {
            state: Arc::new(RwLock::new(snapshot)),
            listeners: Arc::default(),
        }
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    pub fn get_state(&self) -> StateSnapshot {
        self.state.read().clone()
    }

    /// Reads a projection without cloning the whole snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&StateSnapshot) -> R) -> R {
        f(&self.state.read())
    }

    pub fn update_form(&self, update: FormUpdate) {
        self.apply(StateChange::Form(update));
    }

    pub fn update_preview(&self, update: PreviewUpdate) {
        self.apply(StateChange::Preview(update));
    }

    pub fn update_loading(&self, update: LoadingUpdate) {
        self.apply(StateChange::Loading(update));
    }

    pub fn set_step(&self, step: Step) {
        self.apply(StateChange::Step(step));
    }

    pub fn set_language(&self, language: impl Into<String>) {
        self.apply(StateChange::Language(language.into()));
    }

    pub fn set_status(&self, status: GenerationStatus) {
        self.apply(StateChange::Status(status));
    }

    /// Marks a request as in flight unless one already is. Resets progress to
    /// zero on success.
    pub fn try_begin_request(&self, message: &str) -> bool {
        let changes = {
            let mut state = self.state.write();
            if state.loading.is_loading {
                return false;
            }
            let changes = [
                StateChange::Loading(LoadingUpdate::IsLoading(true)),
                StateChange::Loading(LoadingUpdate::Progress(0.0)),
                StateChange::Loading(LoadingUpdate::Message(message.to_string())),
            ];
            for change in &changes {
                write(&mut state, change);
            }
            changes
        };
        for change in &changes {
            self.notify(change);
        }
        true
    }

    fn apply(&self, change: StateChange) {
        write(&mut self.state.write(), &change);
        self.notify(&change);
    }

    fn notify(&self, change: &StateChange) {
        let listeners: Vec<Listener> = self.listeners.read().clone();
        for listener in listeners {
            listener(change);
        }
    }
}

fn write(state: &mut StateSnapshot, change: &StateChange) {
    match change {
        StateChange::Form(update) => {
            let form = &mut state.form;
            match update {
                FormUpdate::Image(v) => form.image = Some(v.clone()),
                FormUpdate::ProductName(v) => form.product_name = v.clone(),
                FormUpdate::Tagline(v) => form.tagline = v.clone(),
                FormUpdate::ProductStory(v) => form.product_story = v.clone(),
                FormUpdate::PreferredColors(v) => form.preferred_colors = v.clone(),
                FormUpdate::SalesPlatform(v) => form.sales_platform = *v,
                FormUpdate::DesiredEmotion(v) => form.desired_emotion = *v,
            }
        }
        StateChange::Preview(update) => {
            let preview = &mut state.preview;
            match update {
                PreviewUpdate::MockupUrl(v) => preview.mockup_url = v.clone(),
                PreviewUpdate::PdfUrl(v) => preview.pdf_url = v.clone(),
                PreviewUpdate::DesignId(v) => preview.design_id = v.clone(),
                PreviewUpdate::Concepts(v) => preview.concepts = v.clone(),
                PreviewUpdate::ColorPalette(v) => preview.color_palette = v.clone(),
                PreviewUpdate::StylesSuggestions(v) => preview.styles_suggestions = v.clone(),
                PreviewUpdate::AiConfidence(v) => preview.ai_confidence = *v,
                PreviewUpdate::ProfessionalAdvice(v) => preview.professional_advice = v.clone(),
                PreviewUpdate::Customizations(v) => preview.customizations = *v,
            }
        }
        StateChange::Loading(update) => {
            let loading = &mut state.loading;
            match update {
                LoadingUpdate::IsLoading(v) => loading.is_loading = *v,
                LoadingUpdate::Progress(v) => loading.progress = v.clamp(0.0, 100.0),
                LoadingUpdate::Message(v) => loading.message = v.clone(),
            }
        }
        StateChange::Step(step) => state.step = *step,
        StateChange::Language(language) => state.language = language.clone(),
        StateChange::Status(status) => state.status = status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[test]
    fn snapshot_reflects_update_and_is_detached() {
        let store = StateStore::new("en");
        store.update_form(FormUpdate::ProductName("Golden Honey".into()));

        let mut snapshot = store.get_state();
        assert_eq!(snapshot.form.product_name, "Golden Honey");

        snapshot.form.product_name.push_str(" (edited)");
        snapshot.form.preferred_colors.insert("red".into());
        snapshot.loading.is_loading = true;

        let fresh = store.get_state();
        assert_eq!(fresh.form.product_name, "Golden Honey");
        assert!(fresh.form.preferred_colors.is_empty());
        assert!(!fresh.loading.is_loading);
    }

    #[test]
    fn listeners_fire_in_registration_order_with_category_and_field() {
        let store = StateStore::new("en");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            store.subscribe(move |change| {
                seen.lock().push(format!("{tag}:{}:{}", change.category(), change.field().unwrap_or("-")));
            });
        }

        store.update_form(FormUpdate::Tagline("Pure sweetness".into()));
        store.update_loading(LoadingUpdate::Progress(12.5));
        store.set_step(Step::Story);

        assert_eq!(
            *seen.lock(),
            vec![
                "first:form:tagline",
                "second:form:tagline",
                "first:loading:progress",
                "second:loading:progress",
                "first:step:-",
                "second:step:-",
            ]
        );
    }

    #[test]
    fn listener_can_read_store_during_notification() {
        let store = StateStore::new("en");
        let observed = Arc::new(Mutex::new(None));
        {
            let reader = store.clone();
            let observed = observed.clone();
            store.subscribe(move |_| {
                *observed.lock() = Some(reader.read(|s| s.form.tagline.clone()));
            });
        }
        store.update_form(FormUpdate::Tagline("From the hills".into()));
        assert_eq!(observed.lock().as_deref(), Some("From the hills"));
    }

    #[test]
    fn only_one_request_may_begin() {
        let store = StateStore::new("en");
        store.update_loading(LoadingUpdate::Progress(40.0));

        assert!(store.try_begin_request("Preparing your design..."));
        let loading = store.get_state().loading;
        assert!(loading.is_loading);
        assert_eq!(loading.progress, 0.0);
        assert_eq!(loading.message, "Preparing your design...");

        assert!(!store.try_begin_request("again"));
        store.update_loading(LoadingUpdate::IsLoading(false));
        assert!(store.try_begin_request("again"));
    }

    #[test]
    fn progress_is_clamped() {
        let store = StateStore::new("en");
        store.update_loading(LoadingUpdate::Progress(140.0));
        assert_eq!(store.get_state().loading.progress, 100.0);
    }
}
