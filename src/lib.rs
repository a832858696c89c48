//! PromptAgro packaging wizard: walks a farmer from a product photo to an
//! AI-generated packaging design.

pub mod backend;
pub mod config;
pub mod i18n;
pub mod models;
pub mod progress;
pub mod render;
pub mod report;
pub mod routes;
pub mod state;
pub mod upload;
pub mod wizard;

pub use backend::BackendAdapter;
pub use config::AppConfig;
pub use state::StateStore;
pub use wizard::Wizard;
