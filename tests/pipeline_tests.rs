//! End-to-end runs of `/generate` against mocked Azure and translation services.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use tempfile::TempDir;
use tower::util::ServiceExt;
use wiremock::matchers::{body_string_contains, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voxcast::{ServerConfig, routes, state::AppState};

const MP3_BYTES: &[u8] = b"ID3\x04\x00mocked";

fn config_for(server: &MockServer, temp_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        azure_speech_subscription_key: Some("test-key".to_string()),
        azure_speech_endpoint: Some(format!("{}/cognitiveservices/v1", server.uri())),
        translate_url: server.uri(),
        transcript_url: server.uri(),
        grammar_check_url: server.uri(),
        artifact_dir: temp_dir.path().join("audio"),
        synthesis_retry_backoff_ms: 5,
        ..Default::default()
    }
}

fn generate(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_translated_text_is_synthesized_by_azure() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("tl", "fr"))
        .and(query_param("client", "gtx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [["Bonjour le monde", "Hello world", null, null]],
            null,
            "en"
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .and(header_eq("Ocp-Apim-Subscription-Key", "test-key"))
        .and(header_eq("X-Microsoft-OutputFormat", "audio-24khz-48kbitrate-mono-mp3"))
        .and(body_string_contains("fr-FR-DeniseNeural"))
        .and(body_string_contains("Bonjour le monde"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(MP3_BYTES))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &temp_dir);
    let state = AppState::new(config).await.unwrap();
    let app = routes::api::create_app(state);

    let response = app
        .oneshot(generate(json!({ "text": "Hello world", "language": "fr" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-voice-id"], "fr-FR-DeniseNeural");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], MP3_BYTES);
}

#[tokio::test]
async fn test_failing_voice_falls_back() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .and(body_string_contains("en-US-GuyNeural"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .and(body_string_contains("en-US-AriaNeural"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(MP3_BYTES))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &temp_dir);
    let state = AppState::new(config).await.unwrap();
    let app = routes::api::create_app(state);

    let response = app
        .oneshot(generate(json!({ "text": "Hello", "gender": "Male" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-voice-id"], "en-US-AriaNeural");
}

#[tokio::test]
async fn test_rejected_credentials_are_not_retried() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/cognitiveservices/v1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server, &temp_dir);
    let state = AppState::new(config).await.unwrap();
    let app = routes::api::create_app(state);

    let response = app
        .oneshot(generate(json!({ "text": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let entries = std::fs::read_dir(temp_dir.path().join("audio")).unwrap().count();
    assert_eq!(entries, 0);
}
