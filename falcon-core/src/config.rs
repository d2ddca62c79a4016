//! Configuration documents and path resolution
//!
//! Configuration is layered:
//! - Defaults ([`FalconConfig::default`])
//! - Global file `~/.falcon/config.json`
//! - Local override `./.falconrc` (any subset of fields)
//!
//! Each layer is parsed as a [`ConfigPatch`] and applied field-by-field, so a
//! later layer only overrides the fields it actually sets.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{self, AspectRatio, Resolution};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "FAL_KEY";

/// Directory under the home directory holding config, history and logs.
pub const FALCON_DIR_NAME: &str = ".falcon";

/// Local override file, resolved against the working directory.
pub const LOCAL_CONFIG_FILE: &str = ".falconrc";

/// Returns a best-effort home directory path.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `~/.falcon`
pub fn falcon_dir() -> PathBuf {
    home_dir().join(FALCON_DIR_NAME)
}

/// Merged user configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FalconConfig {
    /// Stored API key (the `FAL_KEY` environment variable wins over it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub default_model: String,
    pub default_aspect: AspectRatio,
    pub default_resolution: Resolution,
    pub open_after_generate: bool,
    /// Upscaler model id
    pub upscaler: String,
    /// Background removal model id
    pub background_remover: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for FalconConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_model: "banana".to_string(),
            default_aspect: AspectRatio::Square,
            default_resolution: Resolution::TwoK,
            open_after_generate: true,
            upscaler: "clarity".to_string(),
            background_remover: "rmbg".to_string(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FalconConfig {
    /// Apply a patch, overriding only the fields it sets.
    pub fn apply(mut self, patch: &ConfigPatch) -> Self {
        if let Some(key) = &patch.api_key {
            self.api_key = Some(key.clone());
        }
        if let Some(model) = &patch.default_model {
            self.default_model = model.clone();
        }
        if let Some(aspect) = patch.default_aspect {
            self.default_aspect = aspect;
        }
        if let Some(resolution) = patch.default_resolution {
            self.default_resolution = resolution;
        }
        if let Some(open) = patch.open_after_generate {
            self.open_after_generate = open;
        }
        if let Some(upscaler) = &patch.upscaler {
            self.upscaler = upscaler.clone();
        }
        if let Some(remover) = &patch.background_remover {
            self.background_remover = remover.clone();
        }
        if let Some(level) = &patch.log_level {
            self.log_level = level.clone();
        }
        self
    }

    /// Report model ids that are not in the registry.
    ///
    /// Unknown ids are not fatal at load time; they fail with
    /// `UnknownModel` when actually used.
    pub fn unknown_models(&self) -> Vec<&str> {
        [
            self.default_model.as_str(),
            self.upscaler.as_str(),
            self.background_remover.as_str(),
        ]
        .into_iter()
        .filter(|id| models::find(id).is_none())
        .collect()
    }
}

/// A partial configuration: one layer of the merge, or a settings update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_aspect: Option<AspectRatio>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_resolution: Option<Resolution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_after_generate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upscaler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_remover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl From<&FalconConfig> for ConfigPatch {
    fn from(config: &FalconConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            default_model: Some(config.default_model.clone()),
            default_aspect: Some(config.default_aspect),
            default_resolution: Some(config.default_resolution),
            open_after_generate: Some(config.open_after_generate),
            upscaler: Some(config.upscaler.clone()),
            background_remover: Some(config.background_remover.clone()),
            log_level: Some(config.log_level.clone()),
        }
    }
}

/// Resolve the API key.
///
/// Precedence: `explicit` (an in-process value), then the `FAL_KEY`
/// environment variable, then the key stored in config.
pub fn resolve_api_key(explicit: Option<&str>, config: &FalconConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    pick_api_key(explicit, env_key.as_deref(), config.api_key.as_deref())
}

fn pick_api_key(explicit: Option<&str>, env: Option<&str>, stored: Option<&str>) -> Result<String> {
    [explicit, env, stored]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or(Error::MissingCredential)
}
