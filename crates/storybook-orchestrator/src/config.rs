//! Configuration types for the storybook orchestrator.
//!
//! Non-secret settings come from an optional `storybook.json`; secrets come
//! only from the process environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorybookError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "storybook.json";

/// Environment variable holding the generative-AI API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable holding the request-signing secret.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

/// Secret used when `SECRET_KEY` is not set.
pub const DEFAULT_SECRET_KEY: &str = "dev-secret-key";

/// Art style used when the request does not name one.
pub const DEFAULT_ART_STYLE: &str = "anime art style";

/// Default storage root for generated storybooks.
fn default_storage_dir() -> String {
    "static/storybooks".to_string()
}

/// Default directory for uploads.
fn default_upload_dir() -> String {
    "uploads".to_string()
}

/// Default request body cap (16 MiB).
const fn default_max_content_length() -> usize {
    16 * 1024 * 1024
}

/// Default model for story text.
fn default_story_model() -> String {
    "gemini-2.5-pro".to_string()
}

/// Default model for page illustrations.
fn default_image_model() -> String {
    "gemini-2.0-flash-preview-image-generation".to_string()
}

fn default_art_style() -> String {
    DEFAULT_ART_STYLE.to_string()
}

fn default_api_base_url() -> String {
    storybook_gemini::DEFAULT_BASE_URL.to_string()
}

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret(***)")
    }
}

/// Main configuration for the storybook service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root directory holding one subdirectory per storybook.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// Directory for uploads, created at startup.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,

    /// Model used to write the story.
    #[serde(default = "default_story_model")]
    pub story_model: String,

    /// Model used to illustrate image pages.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Art style used when a request leaves it blank.
    #[serde(default = "default_art_style")]
    pub default_art_style: String,

    /// Base URL of the generative-AI REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// API key, from `GEMINI_API_KEY`.
    #[serde(skip)]
    pub api_key: Option<Secret>,

    /// Request-signing secret, from `SECRET_KEY`.
    ///
    /// Reserved: nothing signs with it yet. Startup only warns when the
    /// built-in development value is in effect.
    #[serde(skip)]
    pub secret_key: Option<Secret>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            upload_dir: default_upload_dir(),
            max_content_length: default_max_content_length(),
            story_model: default_story_model(),
            image_model: default_image_model(),
            default_art_style: default_art_style(),
            api_base_url: default_api_base_url(),
            api_key: None,
            secret_key: None,
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `storybook.json` in the current directory. If not found,
    /// returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            StorybookError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `storybook.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `StorybookError::ConfigParseError` if the file exists but
    /// contains invalid JSON, and `StorybookError::ConfigValidationError` if
    /// the values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(StorybookError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| StorybookError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Fills in secrets from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Fills in secrets using `lookup` instead of the process environment.
    ///
    /// Blank values count as unset.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(Secret::new);
        self.api_key = read(API_KEY_ENV);
        self.secret_key = read(SECRET_KEY_ENV);
        self
    }

    /// The effective request-signing secret.
    ///
    /// Reserved for request signing, which no route performs yet.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        self.secret_key
            .as_ref()
            .map_or(DEFAULT_SECRET_KEY, Secret::expose)
    }

    /// Returns `true` if the built-in development secret is in effect.
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key() == DEFAULT_SECRET_KEY
    }

    /// Storage root as a path.
    #[must_use]
    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_dir)
    }

    /// Creates the storage and upload directories if they are missing.
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [&self.storage_dir, &self.upload_dir] {
            std::fs::create_dir_all(dir)
                .map_err(|e| StorybookError::storage_write(dir, e.to_string()))?;
        }
        Ok(())
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `StorybookError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        let non_empty = [
            ("storageDir", &self.storage_dir),
            ("uploadDir", &self.upload_dir),
            ("storyModel", &self.story_model),
            ("imageModel", &self.image_model),
            ("defaultArtStyle", &self.default_art_style),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(StorybookError::config_validation(
                    format!("{field} must not be empty"),
                    format!("Provide a value for {field} in your storybook.json or remove the key to use the default"),
                ));
            }
        }

        if self.max_content_length == 0 {
            return Err(StorybookError::config_validation(
                "maxContentLength must be greater than 0",
                "Set maxContentLength to the largest upload you accept, in bytes",
            ));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(StorybookError::config_validation(
                format!("apiBaseUrl '{}' is not an http(s) URL", self.api_base_url),
                "Use a URL such as https://generativelanguage.googleapis.com/v1beta",
            ));
        }

        Ok(())
    }
}
