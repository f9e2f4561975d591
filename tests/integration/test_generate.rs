//! End-to-end tests for storybook generation and viewing.
//!
//! These drive the full router with a scripted generator in place of the
//! generative-AI service and check what ends up on disk.

mod support;

use axum::http::StatusCode;
use storybook_orchestrator::{create_router, Manifest, MANIFEST_FILE_NAME};
use tempfile::TempDir;
use tower::util::ServiceExt;

use support::{
    app_state, body_json, body_text, entries, generate_request, get, ten_page_story,
    ScriptedGenerator,
};

/// Reads the manifest written for `id`.
fn read_manifest(root: &TempDir, id: &str) -> Manifest {
    let path = root.path().join(id).join(MANIFEST_FILE_NAME);
    let content = std::fs::read_to_string(&path).expect("Manifest not written");
    serde_json::from_str(&content).expect("Manifest is not valid JSON")
}

#[tokio::test]
async fn test_ten_page_story_is_persisted_in_order() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    generator.respond_text(&ten_page_story());
    for _ in 0..5 {
        generator.respond_image(b"\x89PNG\r\n");
    }
    let router = create_router(app_state(&root, generator.clone()));

    let response = router
        .oneshot(generate_request(&[("name", "Mia"), ("age", "6")], &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let id = json["storybook_id"].as_str().unwrap();

    let manifest = read_manifest(&root, id);
    let numbers: Vec<u32> = manifest.pages.iter().filter_map(|p| p.number.get()).collect();
    assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
    for (page, n) in manifest.pages.iter().zip(1u32..) {
        assert_eq!(page.kind.is_image(), n % 2 == 1);
        assert_eq!(page.image_url.is_some(), page.kind.is_image());
    }
    assert_eq!(
        manifest.pages[1].content_text().as_deref(),
        Some("Mia had always wondered what lived beyond the old oak trees.")
    );
    assert_eq!(manifest.info.name, "Mia");

    let calls = generator.calls();
    assert_eq!(calls.len(), 6);
    assert_eq!(calls[0].0, "gemini-2.5-pro");
    assert!(calls[1..]
        .iter()
        .all(|(model, _)| model == "gemini-2.0-flash-preview-image-generation"));
}

#[tokio::test]
async fn test_failed_image_leaves_null_url_and_request_succeeds() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    generator.respond_text(&ten_page_story());
    generator.respond_image(b"page one");
    generator.respond_error("simulated outage");
    generator.respond_image(b"page five");
    generator.respond_image(b"page seven");
    generator.respond_image(b"page nine");
    let router = create_router(app_state(&root, generator));

    let response = router
        .oneshot(generate_request(&[("name", "Mia")], &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    let id = json["storybook_id"].as_str().unwrap().to_string();

    let manifest = read_manifest(&root, &id);
    let page = |n: u32| manifest.pages.iter().find(|p| p.number == n).unwrap();
    assert_eq!(page(3).image_url, None);
    for n in [1, 5, 7, 9] {
        assert_eq!(
            page(n).image_url.as_deref(),
            Some(format!("/static/storybooks/{id}/page_{n}.png").as_str())
        );
    }

    let dir = root.path().join(&id);
    assert_eq!(std::fs::read(dir.join("page_5.png")).unwrap(), b"page five");
    assert!(!dir.join("page_3.png").exists());
    assert_eq!(json["pages"][2]["image_url"], serde_json::Value::Null);
    assert!(json["pages"][1].get("image_url").is_none());
}

#[tokio::test]
async fn test_generation_failure_reports_error_and_persists_nothing() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    generator.respond_error("service unavailable");
    let router = create_router(app_state(&root, generator.clone()));

    let response = router
        .oneshot(generate_request(&[("name", "Mia")], &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert!(!json["error"].as_str().unwrap().is_empty());
    assert_eq!(entries(&root), 0);
    assert_eq!(generator.calls().len(), 1);
}

#[tokio::test]
async fn test_empty_story_reply_still_creates_storybook() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    let router = create_router(app_state(&root, generator));

    let response = router
        .oneshot(generate_request(&[("name", "Mia")], &[]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["pages"], serde_json::json!([]));
    let manifest = read_manifest(&root, json["storybook_id"].as_str().unwrap());
    assert!(manifest.pages.is_empty());
}

#[tokio::test]
async fn test_view_unknown_and_existing_storybooks() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    generator.respond_text(&ten_page_story());
    generator.respond_image(b"only the first page");
    let router = create_router(app_state(&root, generator));

    let response = router
        .clone()
        .oneshot(get("/storybook/story_0000000000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(generate_request(
            &[("name", "Mia"), ("theme", "friendship"), ("art_style", "watercolor")],
            &[],
        ))
        .await
        .unwrap();
    let id = body_json(response).await["storybook_id"]
        .as_str()
        .unwrap()
        .to_string();
    let persisted = read_manifest(&root, &id);

    let response = router
        .clone()
        .oneshot(get(&format!("/api/storybook/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served: Manifest = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(served, persisted);
    assert_eq!(served.info.theme, "friendship");
    assert_eq!(served.info.art_style, "watercolor");

    let response = router
        .oneshot(get(&format!("/storybook/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    for page in &persisted.pages {
        assert!(html.contains(&format!("id=\"page-{}\"", page.number)));
    }
    assert!(html.contains(&format!("/static/storybooks/{id}/page_1.png")));
}

#[tokio::test]
async fn test_uploads_are_filtered_by_extension() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    generator.respond_text("[]");
    let router = create_router(app_state(&root, generator.clone()));

    let response = router
        .oneshot(generate_request(
            &[("name", "Mia")],
            &[("photo.exe", b"MZ\x90\x00"), ("photo.png", b"\x89PNG\r\n")],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = generator.calls();
    let images: Vec<_> = calls[0]
        .1
        .parts()
        .filter_map(|part| part.inline_data.as_ref())
        .collect();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].mime_type, "image/png");
    assert_eq!(images[0].decode().unwrap(), b"\x89PNG\r\n");
}

#[tokio::test]
async fn test_only_disallowed_uploads_means_no_photo_clause() {
    let root = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new();
    generator.respond_text("[]");
    let router = create_router(app_state(&root, generator.clone()));

    router
        .oneshot(generate_request(&[("name", "Mia")], &[("notes.txt", b"hello")]))
        .await
        .unwrap();

    let calls = generator.calls();
    let parts: Vec<_> = calls[0].1.parts().collect();
    assert_eq!(parts.len(), 1);
    let prompt = parts[0].text.as_deref().unwrap();
    assert!(!prompt.contains("uploaded photos"));
}
