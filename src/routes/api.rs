use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handlers::{api, generate, voices};
use crate::state::AppState;

pub fn create_api_router(config: &ServerConfig) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/wake", get(api::wake))
        .route("/voices", get(voices::list_voices))
        .route("/generate", post(generate::generate_handler))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Full application router with state attached.
pub fn create_app(state: Arc<AppState>) -> Router {
    let router = create_api_router(&state.config);

    #[cfg(feature = "openapi")]
    let router = router.merge(crate::docs::openapi::router());

    router.with_state(state)
}

/// CORS policy; no configured origins (or `*`) allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            header::CONTENT_DISPOSITION,
            HeaderName::from_static(generate::VOICE_ID_HEADER),
        ]);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}
