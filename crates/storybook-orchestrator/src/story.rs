//! Page records and the story-generation step.
//!
//! [`StoryGenerator`] sends the prompt and any reference photos to the text
//! model, asks for JSON, and parses the reply into [`Page`] records. The page
//! list is trusted as returned: its order, count, and numbering are kept
//! exactly, and page types are taken from the reply rather than inferred
//! from page numbers.

use std::borrow::Cow;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storybook_gemini::{ContentGenerator, GenerateContentRequest, GenerationConfig, Part};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, StorybookError};
use crate::profile::ReferenceImage;

// ============================================================================
// PageKind
// ============================================================================

/// What a page carries.
///
/// Values other than `image` and `text` are kept verbatim so the manifest
/// mirrors what the model produced; such pages are never illustrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// Illustrated page with a scene description.
    Image,
    /// Prose page.
    Text,
    /// Any other `type` value the model produced.
    Other(String),
}

impl PageKind {
    /// Parses a `type` value, case-insensitively for the known kinds.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "image" => Self::Image,
            "text" => Self::Text,
            _ => Self::Other(value.to_string()),
        }
    }

    /// The wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Other(value) => value,
        }
    }

    /// Returns `true` for image pages.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Image)
    }
}

impl std::fmt::Display for PageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PageKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

impl Serialize for PageKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// PageNumber
// ============================================================================

/// A page number exactly as the model wrote it.
///
/// The raw JSON value is what the manifest records. [`PageNumber::get`]
/// reads it as an integer whether it came back as `3`, `3.0` or `"3"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageNumber(Value);

impl PageNumber {
    /// The number as a non-negative integer, if it reads as one.
    #[must_use]
    pub fn get(&self) -> Option<u32> {
        match &self.0 {
            Value::Number(n) => n.as_u64().map_or_else(
                || n.as_f64().and_then(integral_u32),
                |n| u32::try_from(n).ok(),
            ),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral_u32(value: f64) -> Option<u32> {
    (value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value))
        .then(|| value as u32)
}

impl From<u32> for PageNumber {
    fn from(number: u32) -> Self {
        Self(Value::from(number))
    }
}

impl PartialEq<u32> for PageNumber {
    fn eq(&self, other: &u32) -> bool {
        self.get() == Some(*other)
    }
}

impl std::fmt::Display for PageNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

// ============================================================================
// Page
// ============================================================================

/// One page of a storybook.
///
/// Only `page` and `type` are required. `description` (image pages) and
/// `content` (text pages) are kept as whatever JSON the model produced, and
/// any other keys ride along in `extra`. `image_url` is only ever set by the
/// assembler, after the image file has been written, and is written out for
/// image pages only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Page {
    /// Page number.
    #[serde(rename = "page")]
    pub number: PageNumber,

    /// Page type.
    #[serde(rename = "type")]
    pub kind: PageKind,

    /// Scene description (image pages).
    #[serde(default)]
    pub description: Option<Value>,

    /// Story text (text pages).
    #[serde(default)]
    pub content: Option<Value>,

    /// URL of the rendered illustration.
    #[serde(default, deserialize_with = "lenient_url")]
    pub image_url: Option<String>,

    /// Keys the model added beyond the known ones.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_url<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(ToOwned::to_owned)))
}

/// Text of a field: strings as they are, other JSON values in compact form.
fn field_text(value: Option<&Value>) -> Option<Cow<'_, str>> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        other => Some(Cow::Owned(other.to_string())),
    }
}

impl Page {
    /// Creates an image page.
    #[must_use]
    pub fn image(number: u32, description: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            kind: PageKind::Image,
            description: Some(Value::String(description.into())),
            content: None,
            image_url: None,
            extra: Map::new(),
        }
    }

    /// Creates a text page.
    #[must_use]
    pub fn text(number: u32, content: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            kind: PageKind::Text,
            description: None,
            content: Some(Value::String(content.into())),
            image_url: None,
            extra: Map::new(),
        }
    }

    /// The description as text.
    #[must_use]
    pub fn description_text(&self) -> Option<Cow<'_, str>> {
        field_text(self.description.as_ref())
    }

    /// The story text, falling back to the description.
    #[must_use]
    pub fn content_text(&self) -> Option<Cow<'_, str>> {
        field_text(self.content.as_ref()).or_else(|| self.description_text())
    }
}

impl Serialize for Page {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("page", &self.number)?;
        map.serialize_entry("type", &self.kind)?;
        if let Some(description) = &self.description {
            map.serialize_entry("description", description)?;
        }
        if let Some(content) = &self.content {
            map.serialize_entry("content", content)?;
        }
        if self.kind.is_image() {
            map.serialize_entry("image_url", &self.image_url)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Parses the model's JSON reply into pages.
///
/// The reply must be a JSON array of objects that each carry `page` and
/// `type`. Nothing beyond that is checked.
///
/// # Errors
///
/// Returns `StorybookError::StoryParse` if the text is not JSON and
/// `StorybookError::StoryShape` if it is JSON but not a page list.
pub fn parse_pages(text: &str) -> Result<Vec<Page>> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| StorybookError::story_parse(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| StorybookError::story_shape(e.to_string()))
}

// ============================================================================
// StoryGenerator
// ============================================================================

/// Produces the page list for a storybook.
#[derive(Clone)]
pub struct StoryGenerator {
    client: Arc<dyn ContentGenerator>,
    model: String,
}

impl std::fmt::Debug for StoryGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoryGenerator")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl StoryGenerator {
    /// Creates a generator that calls `model` through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn ContentGenerator>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Builds the request: reference photos first, in upload order, then the
    /// prompt, with a JSON reply requested.
    #[must_use]
    pub fn build_request(prompt: &str, images: &[ReferenceImage]) -> GenerateContentRequest {
        let mut parts: Vec<Part> = images
            .iter()
            .map(|image| Part::inline(image.mime_type(), &image.data))
            .collect();
        parts.push(Part::text(prompt));
        GenerateContentRequest::user(parts).with_config(GenerationConfig::json())
    }

    /// Generates the page list.
    ///
    /// A reply with no text yields an empty page list rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `StorybookError::Generation` if the service call fails, and
    /// the errors of [`parse_pages`] if the reply is not a page list.
    #[instrument(skip(self, prompt, images), fields(model = %self.model, images = images.len()))]
    pub async fn generate(&self, prompt: &str, images: &[ReferenceImage]) -> Result<Vec<Page>> {
        let request = Self::build_request(prompt, images);
        let response = self.client.generate_content(&self.model, &request).await?;

        let Some(text) = response.text() else {
            warn!("Story generation returned no text; producing an empty storybook");
            return Ok(Vec::new());
        };
        debug!(chars = text.len(), "Story text received");

        let pages = parse_pages(&text)?;
        info!(pages = pages.len(), "Story generated");
        Ok(pages)
    }
}
