//! Storybook Orchestrator
//!
//! Turns a character profile and optional reference photos into a persisted,
//! illustrated storybook, and serves it over HTTP.
//!
//! A generation request runs strictly in sequence:
//!
//! 1. [`build_story_prompt`] turns the profile into an instruction.
//! 2. [`StoryGenerator`] asks the text model for a JSON page list.
//! 3. [`StorybookAssembler`] illustrates each image page through
//!    [`ImageSynthesizer`] and writes the manifest via [`StorybookStore`].
//!
//! The generative-AI service is reached through the
//! [`storybook_gemini::ContentGenerator`] trait, injected into
//! [`AppState::new`].

pub mod api;
pub mod config;
pub mod error;
pub mod illustrate;
pub mod profile;
pub mod prompt;
pub mod story;
pub mod storybook;


pub use api::{create_router, AppState, ErrorResponse, GenerateResponse};
pub use config::{
    Config, Secret, API_KEY_ENV, DEFAULT_ART_STYLE, DEFAULT_SECRET_KEY, SECRET_KEY_ENV,
};
pub use error::{Result, StorybookError};
pub use illustrate::{ImageSynthesizer, SynthesisOutcome};
pub use profile::{CharacterProfile, ImageFormat, ReferenceImage};
pub use prompt::{build_story_prompt, PAGE_COUNT};
pub use story::{parse_pages, Page, PageKind, PageNumber, StoryGenerator};
pub use storybook::{
    Manifest, Storybook, StorybookAssembler, StorybookId, StorybookStore, MANIFEST_FILE_NAME,
    STORYBOOK_URL_PREFIX,
};
