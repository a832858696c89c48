use std::{str::FromStr, time::Duration};
use thiserror::Error;
use url::Url;

use crate::models::Step;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not a valid URL ({value}): {source}")]
    InvalidUrl { key: &'static str, value: String, source: url::ParseError },
    #[error("{key} has an invalid value: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("default language '{0}' is not among the available languages")]
    UnknownDefaultLanguage(String),
}

/// Which generation service the adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Our own REST API (`/generate`, `/regenerate`, `/save-design`).
    Local,
    /// Hugging Face Space running the packaging pipeline.
    Hosted,
}

impl BackendKind {
    /// Fallback when `API_BACKEND` is unset: Spaces live under `*.hf.space`.
    pub fn detect(base_url: &str) -> Self {
        if base_url.contains("hf.space") { BackendKind::Hosted } else { BackendKind::Local }
    }

    pub fn default_timeout(self) -> Duration {
        match self {
            BackendKind::Local => Duration::from_millis(30_000),
            BackendKind::Hosted => Duration::from_millis(60_000),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "hosted" | "huggingface" | "hf" => Ok(BackendKind::Hosted),
            other => Err(other.to_string()),
        }
    }
}

/// What the wizard does when generation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Stay,
    ReturnTo(Step),
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stay" | "generating" => Ok(FailurePolicy::Stay),
            other => match other.parse::<Step>() {
                Ok(step @ (Step::Upload | Step::Story | Step::Preferences)) => Ok(FailurePolicy::ReturnTo(step)),
                _ => Err(other.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub backend: BackendKind,
    pub timeout: Duration,
    /// Prefix for relative asset URLs returned by the backend.
    pub asset_base_url: String,
    pub max_file_size: usize,
    pub supported_formats: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub default_language: String,
    pub languages: Vec<String>,
    pub min_product_name_length: usize,
    pub max_story_length: usize,
    pub progress_update_interval: Duration,
    pub max_progress_time: Duration,
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    pub user_accounts: bool,
    pub design_regeneration: bool,
    pub social_sharing: bool,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub wizard: WizardSettings,
    pub features: Features,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base_url = "http://localhost:8000/api".to_string();
        Self {
            api: ApiConfig {
                asset_base_url: origin_of(&base_url).unwrap_or_else(|| base_url.clone()),
                backend: BackendKind::Local,
                timeout: BackendKind::Local.default_timeout(),
                max_file_size: 10 * 1024 * 1024,
                supported_formats: vec!["image/jpeg".into(), "image/png".into(), "image/webp".into()],
                base_url,
            },
            wizard: WizardSettings {
                default_language: "en".into(),
                languages: vec!["en".into(), "sw".into(), "fr".into()],
                min_product_name_length: 2,
                max_story_length: 500,
                progress_update_interval: Duration::from_millis(800),
                max_progress_time: Duration::from_millis(5_000),
                on_failure: FailurePolicy::Stay,
            },
            features: Features {
                user_accounts: true,
                design_regeneration: true,
                social_sharing: true,
                debug: false,
            },
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Reads the process environment (after `.env` has been loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = get("API_BASE_URL").unwrap_or(defaults.api.base_url);
        let base_url = validate_url("API_BASE_URL", base_url.trim_end_matches('/'))?;

        let backend = match get("API_BACKEND") {
            Some(raw) => raw
                .parse()
                .map_err(|value| ConfigError::InvalidValue { key: "API_BACKEND", value })?,
            None => BackendKind::detect(&base_url),
        };

        let timeout = match get("API_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_number("API_TIMEOUT_MS", &raw)?),
            None => backend.default_timeout(),
        };

        let asset_base_url = match get("ASSET_BASE_URL") {
            Some(raw) => validate_url("ASSET_BASE_URL", raw.trim_end_matches('/'))?,
            None => origin_of(&base_url).unwrap_or_else(|| base_url.clone()),
        };

        let languages = get("LANGUAGES").map(|v| split_list(&v)).unwrap_or(defaults.wizard.languages);
        let default_language = get("DEFAULT_LANGUAGE").unwrap_or(defaults.wizard.default_language);
        if !languages.contains(&default_language) {
            return Err(ConfigError::UnknownDefaultLanguage(default_language));
        }

        let on_failure = match get("ON_FAILURE") {
            Some(raw) => raw
                .parse()
                .map_err(|value| ConfigError::InvalidValue { key: "ON_FAILURE", value })?,
            None => defaults.wizard.on_failure,
        };

        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            get(key).map_or(Ok(default), |raw| parse_number(key, &raw))
        };
        let flag = |key: &'static str, default: bool| -> Result<bool, ConfigError> {
            get(key).map_or(Ok(default), |raw| parse_flag(key, &raw))
        };

        Ok(Self {
            api: ApiConfig {
                base_url,
                backend,
                timeout,
                asset_base_url,
                max_file_size: number("MAX_FILE_SIZE", defaults.api.max_file_size as u64)? as usize,
                supported_formats: get("SUPPORTED_FORMATS")
                    .map(|v| split_list(&v))
                    .unwrap_or(defaults.api.supported_formats),
            },
            wizard: WizardSettings {
                default_language,
                languages,
                min_product_name_length: number("MIN_PRODUCT_NAME_LENGTH", defaults.wizard.min_product_name_length as u64)? as usize,
                max_story_length: number("MAX_STORY_LENGTH", defaults.wizard.max_story_length as u64)? as usize,
                progress_update_interval: Duration::from_millis(number("PROGRESS_UPDATE_INTERVAL_MS", 800)?.max(1)),
                max_progress_time: Duration::from_millis(number("MAX_PROGRESS_TIME_MS", 5_000)?),
                on_failure,
            },
            features: Features {
                user_accounts: flag("FEATURE_USER_ACCOUNTS", defaults.features.user_accounts)?,
                design_regeneration: flag("FEATURE_DESIGN_REGENERATION", defaults.features.design_regeneration)?,
                social_sharing: flag("FEATURE_SOCIAL_SHARING", defaults.features.social_sharing)?,
                debug: flag("FEATURE_DEBUG", defaults.features.debug)?,
            },
            port: number("PORT", defaults.port as u64)?
                .try_into()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value: get("PORT").unwrap_or_default() })?,
        })
    }
}

fn validate_url(key: &'static str, raw: &str) -> Result<String, ConfigError> {
    Url::parse(raw)
        .map(|_| raw.to_string())
        .map_err(|source| ConfigError::InvalidUrl { key, value: raw.to_string(), source })
}

fn origin_of(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let origin = url.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

fn parse_number(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue { key, value: raw.to_string() })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: raw.to_string() }),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}
