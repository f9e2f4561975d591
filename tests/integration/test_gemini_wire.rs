//! Integration tests for the HTTP client against a local stand-in for the
//! Gemini REST API.
//!
//! The stand-in speaks the `generateContent` wire format: it answers
//! JSON-mode requests with a story and image-mode requests with inline PNG
//! data, and records every request it receives.

mod support;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use storybook_gemini::{
    ApiErrorKind, ContentGenerator, GeminiClient, GeminiError, GenerateContentRequest,
    GenerateContentResponse, Part,
};
use storybook_orchestrator::{create_router, AppState, Config};
use tempfile::TempDir;
use tokio::net::TcpListener;

use support::{multipart_body, multipart_content_type, ten_page_story};

const API_KEY: &str = "test-api-key";

/// How the stand-in answers.
#[derive(Clone, Copy)]
enum Mode {
    Healthy,
    RateLimited,
}

/// A request as seen by the stand-in.
#[derive(Clone)]
struct Recorded {
    call: String,
    api_key: Option<String>,
    body: GenerateContentRequest,
}

#[derive(Clone)]
struct FakeGemini {
    mode: Mode,
    story: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

async fn handle_generate_content(
    State(fake): State<FakeGemini>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<GenerateContentRequest>,
) -> Response {
    let wants_json = body
        .generation_config
        .as_ref()
        .and_then(|c| c.response_mime_type.as_deref())
        == Some("application/json");
    fake.requests.lock().unwrap().push(Recorded {
        call,
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned),
        body,
    });

    match fake.mode {
        Mode::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"error": {"code": 429, "message": "Quota exceeded"}})),
        )
            .into_response(),
        Mode::Healthy if wants_json => {
            Json(GenerateContentResponse::from_parts(vec![Part::text(&fake.story)])).into_response()
        }
        Mode::Healthy => Json(GenerateContentResponse::from_parts(vec![
            Part::text("Here is the picture."),
            Part::inline("image/png", b"\x89PNG fake image"),
        ]))
        .into_response(),
    }
}

/// Starts the stand-in and returns its base URL and request log.
async fn spawn_fake_gemini(mode: Mode) -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let fake = FakeGemini {
        mode,
        story: ten_page_story(),
        requests: Arc::clone(&requests),
    };
    let router = Router::new()
        .route("/v1beta/models/:call", post(handle_generate_content))
        .with_state(fake);
    let addr = spawn(router).await;
    (format!("http://{addr}/v1beta"), requests)
}

/// Serves `router` on an ephemeral local port.
async fn spawn(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });
    addr
}

fn client(base_url: &str) -> GeminiClient {
    GeminiClient::new(Some(API_KEY.to_string())).with_base_url(base_url)
}

#[tokio::test]
async fn test_client_sends_key_and_model_in_url() {
    let (base_url, requests) = spawn_fake_gemini(Mode::Healthy).await;
    let request = GenerateContentRequest::user(vec![Part::text("hi")])
        .with_config(storybook_gemini::GenerationConfig::json());

    let response = client(&base_url)
        .generate_content("gemini-2.5-pro", &request)
        .await
        .unwrap();

    assert!(response.text().unwrap().contains("\"page\": 1"));
    let recorded = requests.lock().unwrap().clone();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].call, "gemini-2.5-pro:generateContent");
    assert_eq!(recorded[0].api_key.as_deref(), Some(API_KEY));
    assert_eq!(recorded[0].body, request);
}

#[tokio::test]
async fn test_client_maps_rate_limit_errors() {
    let (base_url, _) = spawn_fake_gemini(Mode::RateLimited).await;
    let request = GenerateContentRequest::user(vec![Part::text("hi")]);

    let err = client(&base_url)
        .generate_content("gemini-2.5-pro", &request)
        .await
        .unwrap_err();

    match err {
        GeminiError::Api {
            status,
            kind,
            message,
        } => {
            assert_eq!(status, 429);
            assert_eq!(kind, ApiErrorKind::RateLimit);
            assert_eq!(message, "Quota exceeded");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_key_never_reaches_the_network() {
    let (base_url, requests) = spawn_fake_gemini(Mode::Healthy).await;
    let client = GeminiClient::new(None).with_base_url(base_url);

    let err = client
        .generate_content("gemini-2.5-pro", &GenerateContentRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GeminiError::MissingApiKey));
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_full_service_over_http() {
    let (base_url, requests) = spawn_fake_gemini(Mode::Healthy).await;
    let root = TempDir::new().unwrap();
    let config = Config {
        storage_dir: root.path().to_string_lossy().into_owned(),
        api_base_url: base_url.clone(),
        ..Config::default()
    };
    let state = AppState::new(config, Arc::new(client(&base_url)));
    let addr = spawn(create_router(state)).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("http://{addr}/generate"))
        .header("content-type", multipart_content_type())
        .body(multipart_body(
            &[("name", "Mia"), ("interests", "dragons")],
            &[("mia.jpg", b"\xff\xd8\xff jpeg")],
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let json: serde_json::Value = response.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["pages"].as_array().unwrap().len(), 10);

    let recorded = requests.lock().unwrap().clone();
    assert_eq!(recorded.len(), 6);
    assert_eq!(recorded[0].call, "gemini-2.5-pro:generateContent");
    let story_parts: Vec<_> = recorded[0].body.parts().collect();
    assert_eq!(
        story_parts[0].inline_data.as_ref().unwrap().mime_type,
        "image/jpeg"
    );
    assert!(story_parts[1]
        .text
        .as_deref()
        .unwrap()
        .contains("who likes dragons"));
    for image_call in &recorded[1..] {
        assert_eq!(
            image_call.call,
            "gemini-2.0-flash-preview-image-generation:generateContent"
        );
    }

    let image_url = json["pages"][0]["image_url"].as_str().unwrap();
    let image = http
        .get(format!("http://{addr}{image_url}"))
        .send()
        .await
        .unwrap();
    assert_eq!(image.status(), reqwest::StatusCode::OK);
    assert_eq!(image.bytes().await.unwrap().as_ref(), b"\x89PNG fake image");

    let health = http
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap();
    assert_eq!(health.text().await.unwrap(), "ok");
}
