use axum::response::Json;
use serde::Serialize;

/// Body of the liveness endpoints
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct HealthResponse {
    #[cfg_attr(feature = "openapi", schema(example = "OK"))]
    pub status: &'static str,
}

/// Health check handler
/// Returns a simple JSON response indicating the server is running
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/",
        responses((status = 200, description = "Server is running", body = HealthResponse)),
        tag = "health"
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}

/// Keep-alive endpoint for hosts that idle inactive services
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/wake",
        responses((status = 200, description = "Server is awake", body = HealthResponse)),
        tag = "health"
    )
)]
pub async fn wake() -> Json<HealthResponse> {
    Json(HealthResponse { status: "awake" })
}
