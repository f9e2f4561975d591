//! Per-page image synthesis.
//!
//! Every failure here is page-local. [`ImageSynthesizer::synthesize`] never
//! returns an error; it reports a [`SynthesisOutcome`] whose reason code is
//! logged and whose success decides whether the page gets an `image_url`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use storybook_gemini::{
    ContentGenerator, GenerateContentRequest, GenerateContentResponse, GenerationConfig, InlineData,
    Part,
};
use tracing::{info, instrument, warn};

/// Result of one synthesis attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOutcome {
    /// The image was written to `path`.
    Written {
        /// Where the PNG was written.
        path: PathBuf,
        /// Number of bytes written.
        bytes: usize,
    },
    /// The service returned no candidates.
    NoCandidates,
    /// The first candidate had no content parts.
    NoContent,
    /// No part carried inline image data.
    NoImageData,
    /// Inline data was present but not valid base64.
    InvalidImageData(String),
    /// The service call failed.
    ServiceError(String),
    /// The image could not be written to disk.
    WriteFailed(String),
}

impl SynthesisOutcome {
    /// Returns `true` if an image file now exists at the target path.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// Machine-readable reason code for logs.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Written { .. } => "written",
            Self::NoCandidates => "no_candidates",
            Self::NoContent => "no_content",
            Self::NoImageData => "no_image_data",
            Self::InvalidImageData(_) => "invalid_image_data",
            Self::ServiceError(_) => "service_error",
            Self::WriteFailed(_) => "write_failed",
        }
    }

    /// Detail message for failures that carry one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::InvalidImageData(msg) | Self::ServiceError(msg) | Self::WriteFailed(msg) => {
                Some(msg)
            }
            _ => None,
        }
    }
}

/// Locates the first inline image payload in a response.
fn find_image_data(response: &GenerateContentResponse) -> Result<&InlineData, SynthesisOutcome> {
    let candidate = response
        .candidates
        .first()
        .ok_or(SynthesisOutcome::NoCandidates)?;
    let content = candidate
        .content
        .as_ref()
        .filter(|c| !c.parts.is_empty())
        .ok_or(SynthesisOutcome::NoContent)?;
    content
        .parts
        .iter()
        .filter_map(|part| part.inline_data.as_ref())
        .find(|data| !data.is_empty())
        .ok_or(SynthesisOutcome::NoImageData)
}

/// Renders one illustration per image page.
#[derive(Clone)]
pub struct ImageSynthesizer {
    client: Arc<dyn ContentGenerator>,
    model: String,
}

impl std::fmt::Debug for ImageSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSynthesizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl ImageSynthesizer {
    /// Creates a synthesizer that calls `model` through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ContentGenerator>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// The description is the only input; the reply may mix text and image.
    #[must_use]
    pub fn build_request(description: &str) -> GenerateContentRequest {
        GenerateContentRequest::user(vec![Part::text(description)])
            .with_config(GenerationConfig::text_and_image())
    }

    /// Generates an image for `description` and writes it to `target`.
    ///
    /// Nothing is written unless the service returned decodable image data.
    /// `page_number` is used for diagnostics only.
    #[instrument(skip(self, description), fields(page = page_number))]
    pub async fn synthesize(
        &self,
        description: &str,
        page_number: u32,
        target: &Path,
    ) -> SynthesisOutcome {
        let outcome = self.attempt(description, target).await;
        match &outcome {
            SynthesisOutcome::Written { path, bytes } => {
                info!(path = %path.display(), bytes, "Image generated");
            }
            failed => {
                warn!(
                    reason = failed.reason_code(),
                    error = failed.detail().unwrap_or(""),
                    "Image generation failed"
                );
            }
        }
        outcome
    }

    async fn attempt(&self, description: &str, target: &Path) -> SynthesisOutcome {
        let request = Self::build_request(description);
        let response = match self.client.generate_content(&self.model, &request).await {
            Ok(response) => response,
            Err(e) => return SynthesisOutcome::ServiceError(e.to_string()),
        };

        let data = match find_image_data(&response) {
            Ok(data) => data,
            Err(outcome) => return outcome,
        };
        let bytes = match data.decode() {
            Ok(bytes) => bytes,
            Err(e) => return SynthesisOutcome::InvalidImageData(e.to_string()),
        };

        match tokio::fs::write(target, &bytes).await {
            Ok(()) => SynthesisOutcome::Written {
                path: target.to_path_buf(),
                bytes: bytes.len(),
            },
            Err(e) => SynthesisOutcome::WriteFailed(e.to_string()),
        }
    }
}
