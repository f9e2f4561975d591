//! Error types for the storybook orchestrator.
//!
//! This module defines the error hierarchy for configuration loading, story
//! generation, and storybook persistence. Per-image failures are not errors
//! here; they are reported as [`crate::SynthesisOutcome`] values.

use std::path::PathBuf;

use storybook_gemini::GeminiError;

/// A specialized `Result` type for orchestrator operations.
pub type Result<T> = std::result::Result<T, StorybookError>;

/// Errors that can occur while generating or serving a storybook.
#[derive(Debug, thiserror::Error)]
pub enum StorybookError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your storybook.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Story Generation Errors
    // ========================================================================
    /// The story-generation call to the AI service failed.
    #[error("Story generation failed: {0}")]
    Generation(#[from] GeminiError),

    /// The service replied with text that is not JSON at all.
    #[error("Story generation returned malformed JSON: {message}")]
    StoryParse {
        /// Description of the parse failure.
        message: String,
    },

    /// The reply is valid JSON but not a list of page objects.
    #[error("Story generation returned an unexpected page structure: {message}")]
    StoryShape {
        /// What did not fit the page list.
        message: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// A storybook directory or manifest could not be written.
    #[error("Failed to write storybook at '{path}': {message}\n\nSuggestion: Check write permissions and available disk space")]
    StorageWrite {
        /// Path that could not be written.
        path: PathBuf,
        /// Description of the write failure.
        message: String,
    },

    /// A persisted manifest exists but cannot be parsed.
    #[error("Corrupted storybook manifest '{path}': {message}")]
    ManifestCorrupted {
        /// Path to the manifest.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorybookError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `StoryParse` error.
    #[must_use]
    pub fn story_parse(message: impl Into<String>) -> Self {
        Self::StoryParse {
            message: message.into(),
        }
    }

    /// Creates a new `StoryShape` error.
    #[must_use]
    pub fn story_shape(message: impl Into<String>) -> Self {
        Self::StoryShape {
            message: message.into(),
        }
    }

    /// Creates a new `StorageWrite` error.
    #[must_use]
    pub fn storage_write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageWrite {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ManifestCorrupted` error.
    #[must_use]
    pub fn manifest_corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestCorrupted {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error is transient and may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Returns `true` if the failure happened while producing the story text.
    ///
    /// These are the only failures that abort a generation request before
    /// anything is persisted.
    #[must_use]
    pub const fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            Self::Generation(_) | Self::StoryParse { .. } | Self::StoryShape { .. }
        )
    }
}
