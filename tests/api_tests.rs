use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use bytes::Bytes;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::util::ServiceExt;

use voxcast::core::sources::{
    GrammarChecker, SourceError, SourceResult, TranscriptSource, Translator,
};
use voxcast::core::tts::{SpeechEngine, TTSResult};
use voxcast::{ArtifactStore, CoreState, ServerConfig, VoiceCatalog, routes, state::AppState};

const FAKE_MP3: &[u8] = b"ID3\x04\x00fake-mp3-frames";

/// Engine that records every call and returns a fixed payload.
#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingEngine {
    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechEngine for RecordingEngine {
    async fn synthesize(&self, voice_id: &str, ssml: &str) -> TTSResult<Bytes> {
        self.calls
            .lock()
            .unwrap()
            .push((voice_id.to_string(), ssml.to_string()));
        Ok(Bytes::from_static(FAKE_MP3))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

struct StubTranscripts;

#[async_trait]
impl TranscriptSource for StubTranscripts {
    async fn fetch(&self, video_id: &str) -> SourceResult<String> {
        match video_id {
            "dQw4w9WgXcQ" => Ok("never gonna give you up".to_string()),
            _ => Err(SourceError::NotFound(
                "Failed to get transcript: no captions".to_string(),
            )),
        }
    }
}

/// Fails with the given upstream status when set.
struct StubTranslator {
    fail_status: Option<u16>,
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> SourceResult<String> {
        if let Some(status) = self.fail_status {
            return Err(SourceError::Provider {
                service: "translation service",
                status,
                message: "upstream refused".to_string(),
            });
        }
        Ok(format!("[{target_language}] {text}"))
    }
}

struct StubGrammar {
    fail: bool,
}

#[async_trait]
impl GrammarChecker for StubGrammar {
    async fn check(&self, text: &str, _language: &str) -> SourceResult<String> {
        if self.fail {
            return Err(SourceError::Network("connection reset".to_string()));
        }
        Ok(text.replace("wrold", "world"))
    }
}

struct TestApp {
    app: Router,
    engine: Arc<RecordingEngine>,
    temp_dir: TempDir,
}

#[derive(Default)]
struct Failures {
    translate: Option<u16>,
    grammar: bool,
}

async fn test_app_with(failures: Failures) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let config = ServerConfig {
        artifact_dir: temp_dir.path().to_path_buf(),
        synthesis_retry_backoff_ms: 5,
        ..Default::default()
    };

    let engine = Arc::new(RecordingEngine::default());
    let store = Arc::new(ArtifactStore::new(temp_dir.path()).await.unwrap());
    let core_state = CoreState::from_parts(
        &config,
        engine.clone(),
        Arc::new(StubTranscripts),
        Arc::new(StubTranslator {
            fail_status: failures.translate,
        }),
        Arc::new(StubGrammar {
            fail: failures.grammar,
        }),
        VoiceCatalog::builtin(),
        store,
    );
    let app = routes::api::create_app(AppState::from_parts(config, core_state));

    TestApp {
        app,
        engine,
        temp_dir,
    }
}

async fn test_app() -> TestApp {
    test_app_with(Failures::default()).await
}

fn post_json(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn mp3_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "mp3"))
        .count()
}

#[tokio::test]
async fn test_health_check() {
    let test = test_app().await;

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = test.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "OK" }));
}

#[tokio::test]
async fn test_wake() {
    let test = test_app().await;

    let request = Request::builder().uri("/wake").body(Body::empty()).unwrap();
    let response = test.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "awake" }));
}

#[tokio::test]
async fn test_list_voices() {
    let test = test_app().await;

    let request = Request::builder().uri("/voices").body(Body::empty()).unwrap();
    let response = test.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let english = json["en"].as_array().unwrap();
    assert_eq!(english.len(), 2);
    assert_eq!(english[0]["id"], "en-US-AriaNeural");
    assert_eq!(english[0]["gender"], "Female");
    assert_eq!(english[0]["locale"], "en-US");
}

#[tokio::test]
async fn test_generate_returns_mp3_attachment() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({
            "text": "Hello world",
            "language": "en",
            "gender": "Female"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"speech.mp3\""
    );
    assert_eq!(headers["x-voice-id"], "en-US-AriaNeural");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], FAKE_MP3);

    let calls = test.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "en-US-AriaNeural");
    assert!(calls[0].1.contains("Hello world"));
    assert!(calls[0].1.contains("xml:lang='en-US'"));
}

#[tokio::test]
async fn test_generate_empty_text_is_rejected() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No text or video_id provided");
    assert_eq!(json["status"], 400);
    assert!(test.engine.calls().is_empty());
    assert_eq!(mp3_files(test.temp_dir.path()), 0);
}

#[tokio::test]
async fn test_generate_malformed_json_is_rejected() {
    let test = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"text\": "))
        .unwrap();
    let response = test.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(test.engine.calls().is_empty());
}

#[tokio::test]
async fn test_generate_text_too_long() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "a".repeat(5001) })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(test.engine.calls().is_empty());
}

#[tokio::test]
async fn test_generate_accepts_form_body() {
    let test = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "text=Bonjour+tout+le+monde&language=fr&gender=male&translate=false",
        ))
        .unwrap();
    let response = test.app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-voice-id"], "fr-FR-HenriNeural");

    let calls = test.engine.calls();
    assert!(calls[0].1.contains("Bonjour tout le monde"));
    assert!(!calls[0].1.contains("[fr]"));
}

#[tokio::test]
async fn test_generate_clamps_prosody() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({
            "text": "Hello",
            "pitch": 500,
            "rate": "-80"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ssml = &test.engine.calls()[0].1;
    assert!(ssml.contains("pitch=\"+50%\""));
    assert!(ssml.contains("rate=\"-50%\""));
}

#[tokio::test]
async fn test_generate_strips_scripts() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({
            "text": "<script>alert('x')</script>Hello <iframe src=\"x\"></iframe>there",
            "ssml": true
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let ssml = test.engine.calls()[0].1.to_lowercase();
    assert!(!ssml.contains("script"));
    assert!(!ssml.contains("iframe"));
    assert!(ssml.contains("hello"));
}

#[tokio::test]
async fn test_generate_translates_non_english() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Good morning", "language": "de" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-voice-id"], "de-DE-KatjaNeural");
    assert!(test.engine.calls()[0].1.contains("[de] Good morning"));
}

#[tokio::test]
async fn test_generate_translation_failure() {
    let test = test_app_with(Failures {
        translate: Some(502),
        ..Default::default()
    })
    .await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Good morning", "language": "es" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("try again"));
    assert!(test.engine.calls().is_empty());
}

#[tokio::test]
async fn test_generate_translation_rejected_language() {
    let test = test_app_with(Failures {
        translate: Some(400),
        ..Default::default()
    })
    .await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Good morning", "language": "fr" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(test.engine.calls().is_empty());
}

#[tokio::test]
async fn test_generate_language_without_voice_is_not_translated() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Good morning", "language": "sv" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-voice-id"], "en-US-AriaNeural");
    let ssml = &test.engine.calls()[0].1;
    assert!(ssml.contains("Good morning"));
    assert!(!ssml.contains("[sv]"));
}

#[tokio::test]
async fn test_generate_with_spell_check() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Hello wrold", "spell_check": "true" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(test.engine.calls()[0].1.contains("Hello world"));
}

#[tokio::test]
async fn test_generate_grammar_failure_is_not_fatal() {
    let test = test_app_with(Failures {
        grammar: true,
        ..Default::default()
    })
    .await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Hello wrold", "spell_check": true })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(test.engine.calls()[0].1.contains("Hello wrold"));
}

#[tokio::test]
async fn test_generate_from_transcript() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "video_id": "dQw4w9WgXcQ" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(test.engine.calls()[0].1.contains("never gonna give you up"));
}

#[tokio::test]
async fn test_generate_missing_transcript() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "video_id": "aaaaaaaaaaa" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to get transcript")
    );
}

#[tokio::test]
async fn test_generate_invalid_video_id() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "video_id": "not/an/id" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(test.engine.calls().is_empty());
}

#[tokio::test]
async fn test_generate_explicit_voice() {
    let test = test_app().await;

    let response = test
        .app
        .oneshot(post_json(json!({ "text": "Hi", "voice": "en-us-guyneural" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-voice-id"], "en-US-GuyNeural");
}

#[tokio::test]
async fn test_concurrent_identical_requests_use_distinct_artifacts() {
    let test = test_app().await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let app = test.app.clone();
        handles.push(tokio::spawn(async move {
            app.oneshot(post_json(json!({ "text": "Same text" })))
                .await
                .unwrap()
                .status()
        }));
    }
    for status in futures::future::join_all(handles).await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    // Served files wait for their retention timer; each request wrote its own.
    assert_eq!(mp3_files(test.temp_dir.path()), 5);
    assert_eq!(test.engine.calls().len(), 5);
}
