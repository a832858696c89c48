use include_dir::{include_dir, Dir};
use parking_lot::RwLock;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::{error, info};

static CATALOGS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/i18n");

/// Resolves UI text by dotted key, loading a language's catalog the first
/// time it is asked for. Only codes with an embedded catalog are cached.
pub struct Translator {
    fallback_language: String,
    catalogs: RwLock<HashMap<String, Arc<Value>>>,
}

impl Translator {
    pub fn new(fallback_language: impl Into<String>) -> Self {
        Self {
            fallback_language: fallback_language.into(),
            catalogs: RwLock::default(),
        }
    }

    pub fn fallback_language(&self) -> &str {
        &self.fallback_language
    }

    fn catalog(&self, language: &str) -> Option<Arc<Value>> {
        if let Some(cached) = self.catalogs.read().get(language) {
            return Some(cached.clone());
        }
        let loaded = Arc::new(load_catalog(language)?);
        self.catalogs.write().insert(language.to_string(), loaded.clone());
        Some(loaded)
    }

    /// Returns `requested` if a catalog exists for it, the fallback otherwise.
    pub fn resolve_language(&self, requested: &str) -> String {
        let requested = requested.trim().to_ascii_lowercase();
        if self.catalog(&requested).is_some() {
            requested
        } else {
            self.fallback_language.clone()
        }
    }

    pub fn t(&self, language: &str, key: &str) -> String {
        self.translate(language, key, &[])
    }

    /// Looks `key` up in `language`, then in the fallback language, and
    /// substitutes `{{name}}` placeholders. Unknown keys come back verbatim.
    pub fn translate(&self, language: &str, key: &str, params: &[(&str, &str)]) -> String {
        let found = self
            .lookup(language, key)
            .or_else(|| (language != self.fallback_language).then(|| self.lookup(&self.fallback_language, key)).flatten());

        match found {
            Some(template) => params.iter().fold(template, |text, (name, value)| {
                text.replace(&format!("{{{{{name}}}}}"), value)
            }),
            None => key.to_string(),
        }
    }

    fn lookup(&self, language: &str, key: &str) -> Option<String> {
        let catalog = self.catalog(language)?;
        let mut node: &Value = &catalog;
        for part in key.split('.') {
            node = node.get(part)?;
        }
        node.as_str().map(str::to_string)
    }
}

fn load_catalog(language: &str) -> Option<Value> {
    let file = CATALOGS.get_file(format!("{language}.json"))?;
    match serde_json::from_slice::<Value>(file.contents()) {
        Ok(value) => {
            info!("🌍 Loaded translations for '{}'", language);
            Some(value)
        }
        Err(e) => {
            error!("❌ Failed to parse translations for '{}': {}", language, e);
            None
        }
    }
}

pub fn locale_for(language: &str) -> &'static str {
    match language {
        "sw" => "sw-TZ",
        "fr" => "fr-FR",
        _ => "en-US",
    }
}
