use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::core::artifacts::ArtifactError;
use crate::core::sources::SourceError;
use crate::core::tts::TTSError;

/// Guidance appended to every upstream failure shown to callers.
const RETRY_GUIDANCE: &str = "Please try again in a few moments.";

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InternalServerError(String),
    BadRequest(String),
    UpstreamUnavailable(String),
    GatewayTimeout(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::UpstreamUnavailable(msg) => {
                tracing::warn!("Upstream unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("{msg}. {RETRY_GUIDANCE}"),
                )
            }
            AppError::GatewayTimeout(msg) => {
                tracing::warn!("Upstream timeout: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("{msg}. {RETRY_GUIDANCE}"),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InternalServerError(msg) => write!(f, "Internal server error: {msg}"),
            AppError::BadRequest(msg) => write!(f, "Bad request: {msg}"),
            AppError::UpstreamUnavailable(msg) => write!(f, "Upstream unavailable: {msg}"),
            AppError::GatewayTimeout(msg) => write!(f, "Gateway timeout: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<TTSError> for AppError {
    fn from(err: TTSError) -> Self {
        match err {
            TTSError::TimeoutError(_) => {
                tracing::error!("Speech synthesis timed out: {}", err);
                AppError::GatewayTimeout("Speech synthesis timed out".to_string())
            }
            TTSError::InvalidConfiguration(_) | TTSError::InternalError(_) => {
                AppError::InternalServerError(err.to_string())
            }
            _ => {
                tracing::error!("Speech synthesis failed: {}", err);
                AppError::UpstreamUnavailable("Speech synthesis is temporarily unavailable".to_string())
            }
        }
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InvalidInput(msg) => AppError::BadRequest(msg),
            SourceError::NotFound(msg) => AppError::BadRequest(msg),
            SourceError::Timeout(_) => {
                tracing::error!("Text source timed out: {}", err);
                AppError::GatewayTimeout("Upstream text service timed out".to_string())
            }
            SourceError::Provider { service, status, .. } if is_rejection(status) => {
                tracing::warn!("Text source rejected the request: {}", err);
                AppError::BadRequest(format!("The {service} rejected the request ({status})"))
            }
            SourceError::Network(_) | SourceError::Provider { .. } | SourceError::Parse(_) => {
                tracing::error!("Text source failed: {}", err);
                AppError::UpstreamUnavailable("Upstream text service is unavailable".to_string())
            }
        }
    }
}

/// 4xx answers other than timeouts and rate limits point at the request itself.
fn is_rejection(status: u16) -> bool {
    (400..500).contains(&status) && status != 408 && status != 429
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_exposes_message() {
        let response = AppError::BadRequest("Text cannot be empty".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Text cannot be empty");
        assert_eq!(json["status"], 400);
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response =
            AppError::InternalServerError("disk on fire at /var/tmp".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_upstream_errors_carry_retry_guidance() {
        let response = AppError::from(TTSError::ProviderError("503".into())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("try again"));

        let response = AppError::from(TTSError::TimeoutError("60s".into())).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    fn provider(status: u16) -> SourceError {
        SourceError::Provider {
            service: "translation service",
            status,
            message: String::new(),
        }
    }

    #[test]
    fn test_source_error_mapping() {
        assert!(matches!(
            AppError::from(SourceError::NotFound("no transcript".into())),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(SourceError::Network("reset".into())),
            AppError::UpstreamUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(provider(400)),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(provider(429)),
            AppError::UpstreamUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(provider(502)),
            AppError::UpstreamUnavailable(_)
        ));
        assert!(matches!(
            AppError::from(TTSError::InvalidConfiguration("bad key".into())),
            AppError::InternalServerError(_)
        ));
    }
}
