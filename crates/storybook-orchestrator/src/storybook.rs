//! Storybook persistence and assembly.
//!
//! Each storybook lives in its own directory under the storage root:
//!
//! ```text
//! <storage root>/
//! └── story_<32 hex digits>/
//!     ├── storybook.json   # manifest: {pages, info, created_at}
//!     ├── page_1.png
//!     └── page_3.png       # one file per successfully illustrated page
//! ```
//!
//! Storybooks are written once and never updated or deleted.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, StorybookError};
use crate::illustrate::ImageSynthesizer;
use crate::profile::{non_blank, CharacterProfile};
use crate::story::Page;

/// File name of the manifest inside a storybook directory.
pub const MANIFEST_FILE_NAME: &str = "storybook.json";

/// URL prefix under which the storage root is served.
pub const STORYBOOK_URL_PREFIX: &str = "/static/storybooks";

#[allow(clippy::expect_used)]
static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("id pattern is a valid regex"));

// ============================================================================
// StorybookId
// ============================================================================

/// Identifier of a persisted storybook; also its directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StorybookId(String);

impl StorybookId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("story_{}", Uuid::new_v4().simple()))
    }

    /// Accepts an identifier taken from a request path.
    ///
    /// Only ASCII letters, digits, `_` and `-` are allowed, so a parsed id
    /// can never name anything outside the storage root.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        ID_PATTERN
            .is_match(value)
            .then(|| Self(value.to_string()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorybookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Manifest & Storybook
// ============================================================================

/// On-disk form of a storybook (`storybook.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Pages in the order the story generator returned them.
    pub pages: Vec<Page>,
    /// Profile the storybook was generated from.
    pub info: CharacterProfile,
    /// Creation time; absent in manifests written without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A generated storybook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Storybook {
    /// Identifier and directory name.
    pub id: StorybookId,
    /// Ordered pages.
    pub pages: Vec<Page>,
    /// Originating profile.
    pub profile: CharacterProfile,
    /// Creation time, when known.
    pub created_at: Option<DateTime<Utc>>,
}

impl Storybook {
    /// Rebuilds a storybook from its manifest.
    #[must_use]
    pub fn from_manifest(id: StorybookId, manifest: Manifest) -> Self {
        Self {
            id,
            pages: manifest.pages,
            profile: manifest.info,
            created_at: manifest.created_at,
        }
    }

    /// The manifest to persist for this storybook.
    #[must_use]
    pub fn manifest(&self) -> Manifest {
        Manifest {
            pages: self.pages.clone(),
            info: self.profile.clone(),
            created_at: self.created_at,
        }
    }

    /// Number of pages that ended up with an illustration.
    #[must_use]
    pub fn illustrated_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.image_url.is_some()).count()
    }
}

// ============================================================================
// StorybookStore
// ============================================================================

/// Filesystem layout of persisted storybooks.
#[derive(Debug, Clone)]
pub struct StorybookStore {
    root: PathBuf,
}

impl StorybookStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a storybook.
    #[must_use]
    pub fn dir(&self, id: &StorybookId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Path of a storybook's manifest.
    #[must_use]
    pub fn manifest_path(&self, id: &StorybookId) -> PathBuf {
        self.dir(id).join(MANIFEST_FILE_NAME)
    }

    /// File name of the illustration for page `number`.
    #[must_use]
    pub fn image_file_name(number: u32) -> String {
        format!("page_{number}.png")
    }

    /// Public URL of the illustration for page `number`.
    #[must_use]
    pub fn image_url(id: &StorybookId, number: u32) -> String {
        format!(
            "{STORYBOOK_URL_PREFIX}/{id}/{}",
            Self::image_file_name(number)
        )
    }

    /// Creates the directory for a new storybook.
    pub async fn create_dir(&self, id: &StorybookId) -> Result<PathBuf> {
        let dir = self.dir(id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorybookError::storage_write(&dir, e.to_string()))?;
        debug!(path = %dir.display(), "Created storybook directory");
        Ok(dir)
    }

    /// Writes the manifest for `storybook`.
    pub async fn write_manifest(&self, storybook: &Storybook) -> Result<PathBuf> {
        let path = self.manifest_path(&storybook.id);
        let json = serde_json::to_vec_pretty(&storybook.manifest())?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| StorybookError::storage_write(&path, e.to_string()))?;
        Ok(path)
    }

    /// Loads a storybook by id.
    ///
    /// Returns `Ok(None)` when no manifest exists for `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorybookError::ManifestCorrupted` if the manifest exists but
    /// cannot be parsed, and `StorybookError::Io` if it cannot be read.
    pub async fn load(&self, id: &StorybookId) -> Result<Option<Storybook>> {
        let path = self.manifest_path(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|e| StorybookError::manifest_corrupted(&path, e.to_string()))?;
        Ok(Some(Storybook::from_manifest(id.clone(), manifest)))
    }
}

// ============================================================================
// StorybookAssembler
// ============================================================================

/// Illustrates image pages and persists the finished storybook.
#[derive(Debug, Clone)]
pub struct StorybookAssembler {
    synthesizer: ImageSynthesizer,
    store: StorybookStore,
}

impl StorybookAssembler {
    /// Creates an assembler writing into `store`.
    #[must_use]
    pub const fn new(synthesizer: ImageSynthesizer, store: StorybookStore) -> Self {
        Self { synthesizer, store }
    }

    /// The store storybooks are written to.
    #[must_use]
    pub const fn store(&self) -> &StorybookStore {
        &self.store
    }

    /// Assembles and persists a storybook from generated pages.
    ///
    /// Image pages are illustrated one after another. A page whose synthesis
    /// fails keeps `image_url = None`; it never fails the storybook. Page
    /// order and numbering are kept exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `StorybookError::StorageWrite` if the directory or manifest
    /// cannot be written.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub async fn assemble(
        &self,
        mut pages: Vec<Page>,
        profile: CharacterProfile,
    ) -> Result<Storybook> {
        let id = StorybookId::generate();
        let dir = self.store.create_dir(&id).await?;

        for page in &mut pages {
            page.image_url = None;
            if !page.kind.is_image() {
                continue;
            }
            let Some(number) = page.number.get() else {
                warn!(
                    page = %page.number,
                    reason = "unusable_page_number",
                    "Image page number cannot name an image file; skipping"
                );
                continue;
            };
            let description = page.description_text().map(Cow::into_owned);
            let Some(description) = description.as_deref().and_then(non_blank) else {
                warn!(
                    page = number,
                    reason = "no_description",
                    "Image page has no description; skipping"
                );
                continue;
            };

            let target = dir.join(StorybookStore::image_file_name(number));
            let outcome = self.synthesizer.synthesize(description, number, &target).await;
            if outcome.is_success() {
                page.image_url = Some(StorybookStore::image_url(&id, number));
            }
        }

        let storybook = Storybook {
            id,
            pages,
            profile,
            created_at: Some(Utc::now()),
        };
        self.store.write_manifest(&storybook).await?;

        info!(
            storybook_id = %storybook.id,
            pages = storybook.pages.len(),
            illustrated = storybook.illustrated_pages(),
            "Storybook saved"
        );
        Ok(storybook)
    }
}
