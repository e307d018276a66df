// backend/steamid_core/src/settings.rs

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::driver::DEFAULT_DELAY;
use crate::error::ConfigError;

pub const DEFAULT_API_ENDPOINT: &str =
    "https://kuchababok.online/en/links/api/mark-steamid-processed/";
pub const DEFAULT_IDS_FILE: &str = "unique_ids.json";

const VERBATIM_ENV: [(&str, &str); 2] = [
    ("MARKER_API_KEY", "api_key"),
    ("MARKER_IDS_FILE", "ids_file"),
];

/// Runtime settings shared by the standalone marker and the status service.
#[derive(Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_endpoint: String,
    pub api_key: String,
    pub ids_file: PathBuf,
    pub delay_ms: u64,
    pub request_timeout_ms: Option<u64>,
    pub port: u16,
    pub start_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            api_key: String::new(),
            ids_file: PathBuf::from(DEFAULT_IDS_FILE),
            delay_ms: DEFAULT_DELAY.as_millis() as u64,
            request_timeout_ms: None,
            port: 3000,
            start_delay_ms: 5000,
        }
    }
}

// Keeps the key out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &"<redacted>")
            .field("ids_file", &self.ids_file)
            .field("delay_ms", &self.delay_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("port", &self.port)
            .field("start_delay_ms", &self.start_delay_ms)
            .finish()
    }
}

impl Settings {
    /// Defaults, then `.env`/process environment (`MARKER_*` and a bare `PORT`).
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Env::prefixed("MARKER_"))
            .merge(Env::raw().only(&["port"]));
        // `Env` parses values as typed data ("0123" would become 123); these
        // two are opaque text and are taken verbatim.
        for (var, key) in VERBATIM_ENV {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }
        figment
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Settings = figment.extract().map_err(Box::new)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let url = Url::parse(&self.api_endpoint)
            .map_err(|e| ConfigError::InvalidEndpoint(format!("{}: {}", self.api_endpoint, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEndpoint(format!(
                "{}: unsupported scheme {}",
                self.api_endpoint,
                url.scheme()
            )));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
