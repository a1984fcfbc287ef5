use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_aux::prelude::deserialize_number_from_string;
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("[ConnectModal]: You forgot to provide a `show` prop to the `ConnectModal`.")]
    MissingShow,

    #[error(
        "[ConnectModal]: You provided a `show` prop to the `ConnectModal`, but the value is not \
         a boolean. Received: {0}"
    )]
    ShowNotBoolean(String),

    #[error("Invalid connector options: {0}")]
    Options(String),
}

/// Options the host application passes when installing the plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectorOptions {
    pub app_name: String,
    /// Network the application expects to run on.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub chain_id: u64,
    pub infura_id: String,
    /// Remember the last provider and reconnect to it on startup.
    pub cache_provider: bool,
    /// Provider specific options keyed by provider id, e.g. `{"fortmatic": {"key": ".."}}`.
    pub providers: HashMap<String, serde_json::Value>,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            app_name: "App Name".to_string(),
            chain_id: 1,
            infura_id: String::new(),
            cache_provider: true,
            providers: HashMap::new(),
        }
    }
}

impl ConnectorOptions {
    pub fn new(app_name: &str, chain_id: u64) -> Self {
        Self { app_name: app_name.to_string(), chain_id, ..Default::default() }
    }

    /// Reads options from a plain JS object.
    pub fn from_js(value: JsValue) -> Result<Self, ConfigError> {
        serde_wasm_bindgen::from_value(value).map_err(|e| ConfigError::Options(e.to_string()))
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::Options(e.to_string()))
    }

    pub fn provider_options(&self, provider_id: &str) -> Option<&serde_json::Value> {
        self.providers.get(provider_id)
    }

    /// The `key` entry of a provider's options, if set.
    pub fn provider_key(&self, provider_id: &str) -> Option<&str> {
        self.provider_options(provider_id)?.get("key")?.as_str()
    }
}
