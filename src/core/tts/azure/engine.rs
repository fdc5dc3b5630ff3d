//! Azure Speech REST engine.
//!
//! - URL: `https://{region}.tts.speech.microsoft.com/cognitiveservices/v1`
//! - Authentication: `Ocp-Apim-Subscription-Key` header
//! - Content-Type: `application/ssml+xml`
//! - Output format: `X-Microsoft-OutputFormat` header

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, error, info};

use super::config::{AZURE_OUTPUT_FORMAT_HEADER, AZURE_SUBSCRIPTION_KEY_HEADER, AzureSpeechConfig};
use crate::core::tts::base::{SpeechEngine, TTSError, TTSResult};
use crate::utils::req_manager::ReqManager;

/// Longest upstream error body echoed into logs and errors.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Microsoft Azure neural text-to-speech over the REST API.
pub struct AzureSpeechEngine {
    config: AzureSpeechConfig,
    req_manager: Arc<ReqManager>,
}

impl AzureSpeechEngine {
    pub fn new(config: AzureSpeechConfig, req_manager: Arc<ReqManager>) -> TTSResult<Self> {
        if config.subscription_key.trim().is_empty() {
            return Err(TTSError::InvalidConfiguration(
                "Azure Speech subscription key is required".to_string(),
            ));
        }
        info!(
            "Azure speech engine configured for {} ({})",
            config.tts_url(),
            config.output_format.as_str()
        );
        Ok(Self {
            config,
            req_manager,
        })
    }
}

#[async_trait]
impl SpeechEngine for AzureSpeechEngine {
    async fn synthesize(&self, voice_id: &str, ssml: &str) -> TTSResult<Bytes> {
        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| TTSError::InternalError(format!("Failed to acquire HTTP client: {e}")))?;

        let request = guard
            .client()
            .post(self.config.tts_url())
            .header(AZURE_SUBSCRIPTION_KEY_HEADER, &self.config.subscription_key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header(AZURE_OUTPUT_FORMAT_HEADER, self.config.output_format.as_str())
            .timeout(self.config.request_timeout)
            .body(ssml.to_string());

        debug!("Requesting synthesis for voice {}", voice_id);
        let response = guard.send(request).await.map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            error!("Azure TTS API error ({}) for voice {}: {}", status, voice_id, body);
            return Err(map_status_error(status, &body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TTSError::NetworkError(format!("Failed to read audio body: {e}")))?;

        if audio.is_empty() {
            return Err(TTSError::AudioGenerationFailed(format!(
                "Engine returned no audio for voice {voice_id}"
            )));
        }

        debug!("Received {} bytes of audio for voice {}", audio.len(), voice_id);
        Ok(audio)
    }

    fn name(&self) -> &str {
        "azure"
    }
}

fn map_transport_error(e: reqwest::Error) -> TTSError {
    if e.is_timeout() {
        TTSError::TimeoutError(format!("Synthesis request timed out: {e}"))
    } else if e.is_connect() {
        TTSError::ConnectionFailed(format!("Could not reach speech engine: {e}"))
    } else {
        TTSError::NetworkError(format!("Request failed: {e}"))
    }
}

fn map_status_error(status: StatusCode, body: &str) -> TTSError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            TTSError::InvalidConfiguration(format!("API error ({status}): {body}"))
        }
        StatusCode::REQUEST_TIMEOUT => {
            TTSError::ProviderError(format!("Engine timed out ({status}): {body}"))
        }
        _ => TTSError::ProviderError(format!("API error ({status}): {body}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::azure::AzureRegion;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> AzureSpeechEngine {
        let mut config = AzureSpeechConfig::new("test-key", AzureRegion::EastUS);
        config.endpoint = Some(format!("{}/cognitiveservices/v1", server.uri()));
        AzureSpeechEngine::new(config, Arc::new(ReqManager::new(4).unwrap())).unwrap()
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = AzureSpeechEngine::new(
            AzureSpeechConfig::default(),
            Arc::new(ReqManager::new(1).unwrap()),
        );
        assert!(matches!(result, Err(TTSError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_synthesize_sends_expected_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cognitiveservices/v1"))
            .and(header("Ocp-Apim-Subscription-Key", "test-key"))
            .and(header("Content-Type", "application/ssml+xml"))
            .and(header(
                "X-Microsoft-OutputFormat",
                "audio-24khz-48kbitrate-mono-mp3",
            ))
            .and(body_string_contains("<voice name='en-US-AriaNeural'>"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3fake-mp3".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine_for(&server);
        let ssml = crate::core::ssml::build_ssml(
            "Hello world",
            "en-US-AriaNeural",
            crate::core::ssml::Prosody::default(),
        );
        let audio = engine.synthesize("en-US-AriaNeural", &ssml).await.unwrap();
        assert_eq!(&audio[..], b"ID3fake-mp3");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (400, false),
            (401, false),
            (403, false),
            (408, true),
            (429, true),
            (500, true),
            (503, true),
        ];

        for (status, retryable) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .mount(&server)
                .await;

            let error = engine_for(&server)
                .synthesize("en-US-AriaNeural", "<speak/>")
                .await
                .unwrap_err();
            assert_eq!(error.is_retryable(), retryable, "status {status}: {error}");
        }
    }

    #[tokio::test]
    async fn test_empty_body_is_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let error = engine_for(&server)
            .synthesize("en-US-AriaNeural", "<speak/>")
            .await
            .unwrap_err();
        assert!(matches!(error, TTSError::AudioGenerationFailed(_)));
        assert!(error.is_retryable());
    }
}
