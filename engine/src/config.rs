//! Configuration loading.
//!
//! Raw TOML deserialization structs stay here; `resolve` turns them into the
//! validated [`EngineConfig`] the engine is built from. The backend
//! credential comes from `GEMINI_API_KEY` or the config file; without one
//! the process must not start, so resolution fails rather than defaulting.

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

use quill_types::ApiKey;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const CONFIG_FILE: &str = "quill.toml";
const ENV_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Default, Deserialize)]
pub struct QuillConfig {
    pub app: Option<AppSection>,
    pub api_keys: Option<ApiKeysSection>,
    pub export: Option<ExportSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppSection {
    pub model: Option<String>,
}

#[derive(Default, Deserialize)]
pub struct ApiKeysSection {
    pub google: Option<String>,
}

// Manual Debug impl to prevent leaking API keys in logs.
impl std::fmt::Debug for ApiKeysSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeysSection")
            .field(
                "google",
                &if self.google.is_some() {
                    "[REDACTED]"
                } else {
                    "None"
                },
            )
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportSection {
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(
        "no backend credential: set GEMINI_API_KEY or add an [api_keys] google entry to {}",
        .path.display()
    )]
    MissingCredential { path: PathBuf },
}

/// Fully-resolved engine configuration. Existence of a value is the proof of
/// its validity: the credential is present, the model is named.
#[derive(Debug)]
pub struct EngineConfig {
    pub api_key: ApiKey,
    pub model: String,
    /// Override of the backend endpoint; `None` uses the production API.
    pub api_base: Option<String>,
    pub export_dir: PathBuf,
    pub prefs_path: Option<PathBuf>,
}

#[must_use]
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quill")
        .join(CONFIG_FILE)
}

#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quill")
}

impl QuillConfig {
    /// Load from the default location. A missing file is an empty config,
    /// not an error; an unreadable or unparseable one is.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Resolve into an [`EngineConfig`], reading the credential from the
    /// environment first and the config file second.
    pub fn resolve(self) -> Result<EngineConfig, ConfigError> {
        let env_key = env::var(ENV_API_KEY).ok();
        self.resolve_with_env(env_key)
    }

    fn resolve_with_env(self, env_key: Option<String>) -> Result<EngineConfig, ConfigError> {
        let file_key = self.api_keys.and_then(|keys| keys.google);
        let api_key = resolve_credential(env_key, file_key).ok_or(ConfigError::MissingCredential {
            path: config_file_path(),
        })?;

        let model = self
            .app
            .and_then(|app| app.model)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let export_dir = self
            .export
            .and_then(|export| export.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(EngineConfig {
            api_key,
            model,
            api_base: None,
            export_dir,
            prefs_path: Some(data_dir().join("prefs.toml")),
        })
    }
}

/// Environment wins over the config file; blank values count as absent.
fn resolve_credential(env_key: Option<String>, file_key: Option<String>) -> Option<ApiKey> {
    env_key
        .into_iter()
        .chain(file_key)
        .find_map(|candidate| ApiKey::new(candidate).ok())
}
