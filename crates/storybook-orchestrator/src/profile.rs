//! Character profiles and reference images supplied with a generation request.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_ART_STYLE;

/// Who the story is about, as entered in the request form.
///
/// Every field is free text and may be empty; the prompt builder omits the
/// clause for any empty field. Serialized under `info` in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Character name.
    #[serde(default)]
    pub name: String,
    /// Character age, as typed.
    #[serde(default)]
    pub age: String,
    /// Things the character likes.
    #[serde(default)]
    pub interests: String,
    /// Theme of the story.
    #[serde(default)]
    pub theme: String,
    /// Art style for every illustration.
    #[serde(default)]
    pub art_style: String,
}

impl CharacterProfile {
    /// Creates a profile with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Fills a blank art style with `default`.
    #[must_use]
    pub fn with_default_art_style(mut self, default: &str) -> Self {
        if self.art_style.trim().is_empty() {
            self.art_style = default.to_string();
        }
        self
    }

    /// Name used in prose; "the character" when the name is blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        non_blank(&self.name).unwrap_or("the character")
    }

    /// Art style used in prose; the built-in default when blank.
    #[must_use]
    pub fn effective_art_style(&self) -> &str {
        non_blank(&self.art_style).unwrap_or(DEFAULT_ART_STYLE)
    }
}

/// Returns the trimmed value, or `None` if it is blank.
pub(crate) fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Upload formats accepted as reference photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG image format.
    Png,
    /// JPEG image format (`.jpg` or `.jpeg`).
    Jpeg,
    /// GIF image format.
    Gif,
}

impl ImageFormat {
    /// Maps a file extension to a format, case-insensitively.
    ///
    /// Returns `None` for anything outside the allow-list.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects the format from the text after the last `.` of a file name.
    #[must_use]
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// MIME type sent to the generation service.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }
}

/// A reference photo of the character. Used as generation input only; never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    /// Detected format.
    pub format: ImageFormat,
    /// Raw file bytes.
    pub data: Vec<u8>,
}

impl ReferenceImage {
    /// Accepts an uploaded file if its name carries an allowed extension.
    ///
    /// Returns `None` for disallowed extensions and empty payloads; callers
    /// skip those silently.
    #[must_use]
    pub fn from_upload(file_name: &str, data: Vec<u8>) -> Option<Self> {
        let format = ImageFormat::from_file_name(file_name)?;
        if data.is_empty() {
            return None;
        }
        Some(Self { format, data })
    }

    /// MIME type of the payload.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}
