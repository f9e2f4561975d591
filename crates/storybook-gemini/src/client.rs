//! HTTP client for the Gemini API.
//!
//! This module provides [`GeminiClient`], which implements
//! [`ContentGenerator`] over `reqwest`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    ApiErrorKind, ContentGenerator, GeminiError, GenerateContentRequest, GenerateContentResponse,
    Result,
};

/// Default base URL of the Gemini REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini `generateContent` endpoint.
///
/// The client is cheap to clone and is meant to be built once at startup and
/// shared. A client without an API key can be constructed; every request it
/// makes fails with [`GeminiError::MissingApiKey`].
///
/// # Example
///
/// ```no_run
/// use storybook_gemini::{ContentGenerator, GeminiClient, GenerateContentRequest, Part};
///
/// # async fn example() -> storybook_gemini::Result<()> {
/// let client = GeminiClient::new(std::env::var("GEMINI_API_KEY").ok());
/// let request = GenerateContentRequest::user(vec![Part::text("Hello")]);
/// let response = client.generate_content("gemini-2.5-pro", &request).await?;
/// println!("{:?}", response.text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client with the given API key and the default base URL.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Overrides the base URL (useful for proxies and local fakes).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Returns `true` if an API key is configured.
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Builds the endpoint URL for `model`.
    #[must_use]
    pub fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    #[instrument(skip(self, request), fields(parts = request.parts().count()))]
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;

        let response = self
            .http
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body);
            warn!(status = status.as_u16(), %message, "Gemini request rejected");
            return Err(GeminiError::Api {
                status: status.as_u16(),
                kind: ApiErrorKind::from_status(status.as_u16()),
                message,
            });
        }

        let body = response.bytes().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_slice(&body).map_err(|e| GeminiError::Decode(e.to_string()))?;
        debug!(candidates = parsed.candidates.len(), "Gemini response received");
        Ok(parsed)
    }
}

/// Error envelope returned by Google APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Pulls the human-readable message out of an error body, falling back to
/// the raw body.
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
        _ if body.trim().is_empty() => "empty error body".to_string(),
        _ => body.trim().to_string(),
    }
}
