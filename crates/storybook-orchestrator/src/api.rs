//! HTTP front end for the storybook generator.
//!
//! # Endpoints
//!
//! - `GET /` - Landing page with the generation form
//! - `POST /generate` - Generate a storybook from a multipart form
//! - `GET /storybook/:id` - HTML viewer for a persisted storybook
//! - `GET /api/storybook/:id` - Persisted manifest as JSON
//! - `GET /static/storybooks/*` - Generated page images
//! - `GET /healthz` - Liveness check
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storybook_gemini::GeminiClient;
//! use storybook_orchestrator::{create_router, AppState, Config};
//!
//! # async fn example() {
//! let config = Config::default().with_env();
//! let client = GeminiClient::new(config.api_key.as_ref().map(|k| k.expose().to_string()));
//! let router = create_router(AppState::new(config, Arc::new(client)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use storybook_gemini::ContentGenerator;
use storybook_render::{landing_page, message_page, HtmlGenerator, PageView, StorybookView};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::illustrate::ImageSynthesizer;
use crate::profile::{non_blank, CharacterProfile, ReferenceImage};
use crate::prompt::build_story_prompt;
use crate::story::{Page, StoryGenerator};
use crate::storybook::{
    Manifest, Storybook, StorybookAssembler, StorybookId, StorybookStore, STORYBOOK_URL_PREFIX,
};
use crate::{Config, StorybookError};

/// Multipart field carrying reference photos.
const PHOTOS_FIELD: &str = "photos";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for a successful `POST /generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Always `true`.
    pub success: bool,
    /// Identifier of the new storybook.
    pub storybook_id: String,
    /// The assembled pages.
    pub pages: Vec<Page>,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Description of the error.
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error body with `success = false`.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// Holds only immutable handles; requests share nothing but the storage
/// directory tree.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,
    /// Story-generation step.
    pub story: StoryGenerator,
    /// Illustration and persistence step.
    pub assembler: StorybookAssembler,
}

impl AppState {
    /// Wires every component to `client` according to `config`.
    #[must_use]
    pub fn new(config: Config, client: Arc<dyn ContentGenerator>) -> Self {
        let story = StoryGenerator::new(Arc::clone(&client), config.story_model.clone());
        let synthesizer = ImageSynthesizer::new(client, config.image_model.clone());
        let store = StorybookStore::new(config.storage_path());
        Self {
            config,
            story,
            assembler: StorybookAssembler::new(synthesizer, store),
        }
    }

    /// The storybook store.
    #[must_use]
    pub const fn store(&self) -> &StorybookStore {
        self.assembler.store()
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// The multipart body could not be read.
    InvalidForm { status: StatusCode, message: String },
    /// Story generation failed; nothing was persisted.
    Generation(String),
    /// The storybook could not be written or read back.
    Storage(String),
    /// No storybook with the requested id.
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidForm { status, message } => (status, message),
            Self::Generation(msg) | Self::Storage(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<StorybookError> for ApiError {
    fn from(err: StorybookError) -> Self {
        if err.is_generation_failure() {
            Self::Generation(err.to_string())
        } else {
            Self::Storage(err.to_string())
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::InvalidForm {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::InvalidForm {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with every endpoint.
///
/// Request bodies are capped at `config.max_content_length`; generated
/// images are served from the storage root under `/static/storybooks`.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.max_content_length;
    let images = ServeDir::new(state.config.storage_path());

    Router::new()
        .route("/", get(handle_index))
        .route("/generate", post(handle_generate))
        .route("/storybook/:id", get(handle_view))
        .route("/api/storybook/:id", get(handle_manifest))
        .route("/healthz", get(handle_health))
        .nest_service(STORYBOOK_URL_PREFIX, images)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(landing_page(&state.config.default_art_style))
}

async fn handle_health() -> &'static str {
    "ok"
}

/// Handler for `POST /generate`.
///
/// Builds the prompt, generates the story, illustrates the image pages and
/// persists the result. Only a story-generation failure fails the request.
async fn handle_generate(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let (profile, images) = read_generation_form(multipart?).await?;
    let profile = profile.with_default_art_style(&state.config.default_art_style);
    info!(
        name = profile.display_name(),
        images = images.len(),
        "Received generation request"
    );

    let prompt = build_story_prompt(&profile, !images.is_empty());
    let pages = state
        .story
        .generate(&prompt, &images)
        .await
        .map_err(|e| {
            error!(error = %e, transient = e.is_transient(), "Error generating storybook");
            ApiError::from(e)
        })?;

    let storybook = state
        .assembler
        .assemble(pages, profile)
        .await
        .map_err(|e| {
            error!(error = %e, "Error saving storybook");
            ApiError::from(e)
        })?;

    Ok(Json(GenerateResponse {
        success: true,
        storybook_id: storybook.id.to_string(),
        pages: storybook.pages,
    }))
}

/// Reads the profile fields and accepted reference photos from the form.
///
/// Photos with a disallowed extension or no content are skipped. Unknown
/// fields are ignored.
async fn read_generation_form(
    mut multipart: Multipart,
) -> Result<(CharacterProfile, Vec<ReferenceImage>), ApiError> {
    let mut profile = CharacterProfile::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToOwned::to_owned) else {
            continue;
        };

        if name == PHOTOS_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let data = field.bytes().await?;
            match ReferenceImage::from_upload(&file_name, data.to_vec()) {
                Some(image) => images.push(image),
                None => debug!(file_name = %file_name, "Skipping upload"),
            }
            continue;
        }

        let slot = match name.as_str() {
            "name" => &mut profile.name,
            "age" => &mut profile.age,
            "interests" => &mut profile.interests,
            "theme" => &mut profile.theme,
            "art_style" => &mut profile.art_style,
            _ => continue,
        };
        *slot = field.text().await?;
    }

    Ok((profile, images))
}

/// Handler for `GET /storybook/:id`.
async fn handle_view(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let not_found = || {
        (
            StatusCode::NOT_FOUND,
            Html(message_page(
                "Storybook not found",
                "There is no storybook at this address.",
            )),
        )
            .into_response()
    };

    let Some(id) = StorybookId::parse(&id) else {
        return not_found();
    };
    match state.store().load(&id).await {
        Ok(Some(storybook)) => {
            Html(HtmlGenerator::new(&to_view(&storybook)).generate()).into_response()
        }
        Ok(None) => not_found(),
        Err(e) => {
            error!(storybook_id = %id, error = %e, "Failed to load storybook");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(message_page("Storybook unavailable", &e.to_string())),
            )
                .into_response()
        }
    }
}

/// Handler for `GET /api/storybook/:id`.
async fn handle_manifest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Manifest>, ApiError> {
    let not_found = || ApiError::NotFound("Storybook not found".to_string());

    let id = StorybookId::parse(&id).ok_or_else(not_found)?;
    match state.store().load(&id).await {
        Ok(Some(storybook)) => Ok(Json(storybook.manifest())),
        Ok(None) => Err(not_found()),
        Err(e) => {
            warn!(storybook_id = %id, error = %e, "Failed to load storybook");
            Err(e.into())
        }
    }
}

/// Converts a persisted storybook into the viewer's model.
fn to_view(storybook: &Storybook) -> StorybookView {
    let title = non_blank(&storybook.profile.name)
        .map_or_else(|| "A Storybook".to_string(), |name| format!("{name}'s Storybook"));

    let pages = storybook
        .pages
        .iter()
        .zip(1..)
        .map(|(page, position)| {
            let number = page.number.get().unwrap_or(position);
            if page.kind.is_image() {
                let description = page.description_text().unwrap_or_default();
                PageView::image(number, description, page.image_url.clone())
            } else {
                PageView::text(number, page.content_text().unwrap_or_default())
            }
        })
        .collect();

    StorybookView {
        id: storybook.id.to_string(),
        title,
        art_style: storybook.profile.effective_art_style().to_string(),
        created_at: storybook.created_at,
        pages,
    }
}
