//! OpenAPI specification and documentation
//!
//! This module provides OpenAPI documentation for the voxcast API.
//! It is only compiled when the `openapi` feature is enabled.

use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::core::voices::{Gender, Voice};
use crate::handlers::{api::HealthResponse, generate::GenerateRequest};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "voxcast API",
        version = "0.1.0",
        description = "Text-to-speech service: text or video transcripts, optional translation and grammar checking, MP3 output"
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development")
    ),
    paths(
        crate::handlers::api::health_check,
        crate::handlers::api::wake,
        crate::handlers::voices::list_voices,
        crate::handlers::generate::generate_handler,
    ),
    components(schemas(HealthResponse, GenerateRequest, Voice, Gender, ErrorResponse)),
    tags(
        (name = "health", description = "Liveness endpoints"),
        (name = "voices", description = "Voice catalog"),
        (name = "tts", description = "Text-to-speech synthesis")
    )
)]
pub struct ApiDoc;

/// JSON body of every error response
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct ErrorResponse {
    #[schema(example = "No text or video_id provided")]
    error: String,
    #[schema(example = 400)]
    status: u16,
}

/// Create OpenAPI documentation routes
///
/// Returns routes for serving the OpenAPI spec as JSON and YAML.
/// This should only be called when the `openapi` feature is enabled.
///
/// Routes:
/// - `GET /docs/openapi.json` - OpenAPI spec as JSON
/// - `GET /docs/openapi.yaml` - OpenAPI spec as YAML
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/docs/openapi.json", get(openapi_json_handler))
        .route("/docs/openapi.yaml", get(openapi_yaml_handler))
}

/// Handler for GET /docs/openapi.json
async fn openapi_json_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Handler for GET /docs/openapi.yaml
async fn openapi_yaml_handler() -> ([(axum::http::header::HeaderName, &'static str); 1], String) {
    let yaml = spec_yaml().unwrap_or_else(|e| format!("Error generating YAML: {}", e));
    ([(axum::http::header::CONTENT_TYPE, "application/yaml")], yaml)
}

/// Get OpenAPI spec as YAML string
///
/// This is used for the CLI export command to generate docs/openapi.yaml
pub fn spec_yaml() -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(&ApiDoc::openapi())
}

/// Get OpenAPI spec as JSON string
pub fn spec_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ApiDoc::openapi())
}
