//! Storybook Gemini Client
//!
//! Wire types and an HTTP client for the Gemini `generateContent` endpoint.
//!
//! The storybook generator only needs one capability from the service: send a
//! list of content parts (text and inline images) and get candidates back.
//! That capability is the [`ContentGenerator`] trait. [`GeminiClient`] is the
//! production implementation; tests substitute their own.

mod client;

pub use client::{GeminiClient, DEFAULT_BASE_URL};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while talking to the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// No API key was configured for the client.
    #[error("Gemini API key not set (export GEMINI_API_KEY)")]
    MissingApiKey,

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Gemini API error ({kind}, HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Classified error kind.
        kind: ApiErrorKind,
        /// Message extracted from the error body.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode Gemini response: {0}")]
    Decode(String),
}

impl GeminiError {
    /// Returns `true` if retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { kind, .. } => matches!(kind, ApiErrorKind::RateLimit | ApiErrorKind::Server),
            Self::MissingApiKey | Self::Decode(_) => false,
        }
    }
}

/// Categories of Gemini API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Invalid or missing credentials (401, 403).
    Authentication,
    /// Quota or rate limit exceeded (429).
    RateLimit,
    /// Server-side failure (5xx).
    Server,
    /// Anything else, usually a malformed request (4xx).
    Other,
}

impl ApiErrorKind {
    /// Classifies an HTTP status code.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Result type for Gemini operations.
pub type Result<T> = std::result::Result<T, GeminiError>;

// ============================================================================
// Wire Types
// ============================================================================

/// Body of a `generateContent` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns. The storybook generator always sends one user turn.
    pub contents: Vec<Content>,
    /// Output controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Creates a request with a single user turn made of `parts`.
    #[must_use]
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            generation_config: None,
        }
    }

    /// Sets the generation config.
    #[must_use]
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    /// Iterates over every part of every turn.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.contents.iter().flat_map(|c| c.parts.iter())
    }
}

/// One turn of content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Author of the turn (`user` or `model`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Ordered parts.
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    /// Creates a user turn.
    #[must_use]
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

/// A single piece of content: text or inline binary data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Inline binary payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Creates an inline data part, base64-encoding `bytes`.
    #[must_use]
    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

/// Base64-encoded binary data with its MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the payload, e.g. `image/png`.
    #[serde(default)]
    pub mime_type: String,
    /// Base64 payload.
    #[serde(default)]
    pub data: String,
}

impl InlineData {
    /// Returns `true` if there is no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| GeminiError::Decode(format!("invalid base64 in inline data: {e}")))
    }
}

/// Output controls for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Requested MIME type of the text reply, e.g. `application/json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Requested output modalities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<Modality>>,
}

impl GenerationConfig {
    /// Asks for a JSON-formatted text reply.
    #[must_use]
    pub fn json() -> Self {
        Self {
            response_mime_type: Some("application/json".to_string()),
            response_modalities: None,
        }
    }

    /// Asks for text and image output.
    #[must_use]
    pub fn text_and_image() -> Self {
        Self {
            response_mime_type: None,
            response_modalities: Some(vec![Modality::Text, Modality::Image]),
        }
    }
}

/// Output modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    /// Text output.
    Text,
    /// Image output.
    Image,
}

/// Body of a `generateContent` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateContentResponse {
    /// Generated candidates, best first.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Builds a response whose single candidate holds `parts`.
    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_string()),
                    parts,
                }),
            }],
        }
    }

    /// Concatenated text of the first candidate, or `None` if it has none.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// One generated candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Generated content; absent when the candidate was blocked.
    #[serde(default)]
    pub content: Option<Content>,
}

// ============================================================================
// Generator Trait
// ============================================================================

/// Anything that can answer a `generateContent` request.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Sends `request` to `model` and returns the raw response.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}
