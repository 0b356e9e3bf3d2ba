use crate::error::AppError;
use crate::timer::{DEFAULT_MINUTES, clamp_minutes};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "DESKAPP_CONFIG_PATH";

pub const DEFAULT_ASSISTANT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_ASSISTANT_MODEL: &str = "llama3.2";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl AssistantConfig {
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_ASSISTANT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(DEFAULT_ASSISTANT_MODEL)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_minutes: Option<u32>,
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

impl Config {
    /// Session timer length, clamped to the slider range.
    pub fn minutes(&self) -> u32 {
        clamp_minutes(self.default_minutes.unwrap_or(DEFAULT_MINUTES))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub default_minutes: Option<u32>,
    pub store_path: Option<PathBuf>,
    pub assistant_endpoint: Option<String>,
    pub assistant_model: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("deskapp")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("deskapp")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(minutes) = overrides.default_minutes {
        merged.default_minutes = Some(clamp_minutes(minutes));
    }
    if let Some(path) = overrides.store_path.as_ref() {
        merged.store_path = Some(path.clone());
    }
    if let Some(endpoint) = overrides.assistant_endpoint.as_ref() {
        merged.assistant.endpoint = Some(endpoint.clone());
    }
    if let Some(model) = overrides.assistant_model.as_ref() {
        merged.assistant.model = Some(model.clone());
    }

    merged
}
