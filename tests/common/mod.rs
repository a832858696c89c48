#![allow(dead_code)]

use bytes::Bytes;
use promptagro_wizard::{
    config::{AppConfig, BackendKind},
    i18n::Translator,
    BackendAdapter, Wizard,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::MockServer;

pub fn jpeg() -> Bytes {
    Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01])
}

/// Local backend mounted under `/api` on the mock server.
pub fn local_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = format!("{}/api", server.uri());
    config.api.asset_base_url = server.uri();
    config
}

pub fn hosted_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = server.uri();
    config.api.asset_base_url = server.uri();
    config.api.backend = BackendKind::Hosted;
    config
}

pub fn wizard(config: AppConfig) -> Wizard {
    let adapter = BackendAdapter::from_config(&config.api).expect("backend client");
    Wizard::new(adapter, Arc::new(Translator::new("en")), Arc::new(config))
}

pub fn honey_design() -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "concepts": ["A"],
            "colorPalette": ["#111"],
            "designId": "d1"
        }
    })
}
