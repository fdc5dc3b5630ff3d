//! Video captions via the YouTube `timedtext` endpoint (json3 format).

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use async_trait::async_trait;

use super::{SourceError, SourceResult, TranscriptSource, ensure_success, is_not_found};
use crate::utils::req_manager::ReqManager;

/// Default caption host.
pub const DEFAULT_TRANSCRIPT_URL: &str = "https://www.youtube.com";

static VIDEO_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id pattern is valid"));

/// Whether `video_id` has the shape of a YouTube video id.
pub fn is_valid_video_id(video_id: &str) -> bool {
    VIDEO_ID.is_match(video_id)
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSegment>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSegment {
    #[serde(default)]
    utf8: String,
}

/// Caption track requested from YouTube.
const CAPTION_LANGUAGE: &str = "en";

/// Caption text from the YouTube `api/timedtext` endpoint.
pub struct YouTubeTranscripts {
    base_url: String,
    timeout: Duration,
    req_manager: Arc<ReqManager>,
}

impl YouTubeTranscripts {
    pub fn new(base_url: &str, timeout: Duration, req_manager: Arc<ReqManager>) -> Self {
        Self {
            base_url: super::base_url(base_url),
            timeout,
            req_manager,
        }
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscripts {
    async fn fetch(&self, video_id: &str) -> SourceResult<String> {
        let video_id = video_id.trim();
        if !is_valid_video_id(video_id) {
            return Err(SourceError::InvalidInput(format!(
                "Invalid video_id '{video_id}'"
            )));
        }

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let request = guard
            .client()
            .get(format!("{}/api/timedtext", self.base_url))
            .query(&[
                ("v", video_id),
                ("lang", CAPTION_LANGUAGE),
                ("fmt", "json3"),
            ])
            .timeout(self.timeout);

        debug!("Fetching transcript for video {}", video_id);
        let response = guard.send(request).await.map_err(SourceError::from_transport)?;
        let response = match ensure_success("transcript service", response).await {
            Ok(response) => response,
            Err(SourceError::Provider { status, .. }) if is_not_found(status) => {
                return Err(no_transcript(video_id));
            }
            Err(e) => return Err(e),
        };

        let body = response.text().await.map_err(SourceError::from_transport)?;
        // The endpoint answers 200 with an empty body when no track exists.
        if body.trim().is_empty() {
            return Err(no_transcript(video_id));
        }

        let timed_text: TimedText =
            serde_json::from_str(&body).map_err(|e| SourceError::Parse(e.to_string()))?;
        let text = join_segments(&timed_text);
        if text.is_empty() {
            return Err(no_transcript(video_id));
        }

        info!(
            "Fetched transcript for video {} ({} chars)",
            video_id,
            text.chars().count()
        );
        Ok(text)
    }
}

fn no_transcript(video_id: &str) -> SourceError {
    SourceError::NotFound(format!(
        "Failed to get transcript: no captions available for video {video_id}"
    ))
}

fn join_segments(timed_text: &TimedText) -> String {
    timed_text
        .events
        .iter()
        .map(|event| {
            event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
        })
        .flat_map(|line| {
            line.split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> YouTubeTranscripts {
        YouTubeTranscripts::new(
            &server.uri(),
            Duration::from_secs(5),
            Arc::new(ReqManager::new(2).unwrap()),
        )
    }

    #[test]
    fn test_video_id_validation() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(is_valid_video_id("a_b-c_d-e_f"));
        assert!(!is_valid_video_id("short"));
        assert!(!is_valid_video_id("dQw4w9WgXcQx"));
        assert!(!is_valid_video_id("dQw4w9WgX/Q"));
        assert!(!is_valid_video_id("../../etc/p"));
    }

    #[tokio::test]
    async fn test_fetch_joins_segments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/timedtext"))
            .and(query_param("v", "dQw4w9WgXcQ"))
            .and(query_param("fmt", "json3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "events": [
                    {"tStartMs": 0, "segs": [{"utf8": "Never gonna"}, {"utf8": " give you up"}]},
                    {"tStartMs": 1200},
                    {"tStartMs": 1500, "segs": [{"utf8": "\n"}]},
                    {"tStartMs": 2000, "segs": [{"utf8": "never gonna\nlet you down"}]}
                ]
            })))
            .mount(&server)
            .await;

        let text = source_for(&server).fetch("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(text, "Never gonna give you up never gonna let you down");
    }

    #[tokio::test]
    async fn test_invalid_id_never_hits_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let error = source_for(&server).fetch("not a video").await.unwrap_err();
        assert!(matches!(error, SourceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_transcript() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let error = source_for(&server).fetch("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(error, SourceError::NotFound(_)));
        assert!(error.to_string().starts_with("Failed to get transcript"));
    }

    #[tokio::test]
    async fn test_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let error = source_for(&server).fetch("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(error, SourceError::Provider { status: 503, .. }));
    }
}
