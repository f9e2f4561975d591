//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use storybook_gemini::{
    ContentGenerator, GenerateContentRequest, GenerateContentResponse, GeminiError, Part, Result,
};
use storybook_orchestrator::{AppState, Config};
use tempfile::TempDir;

pub const BOUNDARY: &str = "integration-boundary-7d1f";

/// A `ContentGenerator` that replays scripted responses in call order.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<GenerateContentResponse>>>,
    calls: Mutex<Vec<(String, GenerateContentRequest)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond_text(&self, text: &str) {
        self.push(Ok(GenerateContentResponse::from_parts(vec![Part::text(text)])));
    }

    pub fn respond_image(&self, bytes: &[u8]) {
        self.push(Ok(GenerateContentResponse::from_parts(vec![Part::inline(
            "image/png",
            bytes,
        )])));
    }

    pub fn respond_error(&self, message: &str) {
        self.push(Err(GeminiError::Decode(message.to_string())));
    }

    pub fn push(&self, response: Result<GenerateContentResponse>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<(String, GenerateContentRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(GenerateContentResponse::default()))
    }
}

/// App state whose storage root is `root`.
pub fn app_state(root: &TempDir, generator: Arc<dyn ContentGenerator>) -> AppState {
    let config = Config {
        storage_dir: root.path().to_string_lossy().into_owned(),
        ..Config::default()
    };
    AppState::new(config, generator)
}

/// Path to a file under `fixtures/`.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// The ten-page alternating story used across tests.
pub fn ten_page_story() -> String {
    std::fs::read_to_string(fixture("ten_pages.json")).expect("Failed to read fixture")
}

/// Builds a `multipart/form-data` body with text fields and `photos` files.
pub fn multipart_body(fields: &[(&str, &str)], photos: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (file_name, data) in photos {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photos\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Content type header value matching [`multipart_body`].
pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={BOUNDARY}")
}

/// A `POST /generate` request.
pub fn generate_request(fields: &[(&str, &str)], photos: &[(&str, &[u8])]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/generate")
        .header(header::CONTENT_TYPE, multipart_content_type())
        .body(Body::from(multipart_body(fields, photos)))
        .unwrap()
}

/// A `GET` request.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Reads a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("Response body is not JSON")
}

/// Reads a response body as text.
pub async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Number of entries directly under `root`.
pub fn entries(root: &TempDir) -> usize {
    std::fs::read_dir(root.path()).unwrap().count()
}
