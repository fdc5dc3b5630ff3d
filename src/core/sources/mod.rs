//! Upstream text collaborators feeding the synthesis pipeline.
//!
//! - `transcript`: captions of a video, used instead of request text
//! - `translate`: machine translation into the requested language
//! - `grammar`: optional spelling/grammar correction

mod grammar;
mod transcript;
mod translate;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use thiserror::Error;

pub use grammar::{DEFAULT_GRAMMAR_CHECK_URL, LanguageToolChecker};
pub use transcript::{DEFAULT_TRANSCRIPT_URL, YouTubeTranscripts, is_valid_video_id};
pub use translate::{DEFAULT_TRANSLATE_URL, GoogleTranslator, needs_translation};

/// Caption text for a video.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Caption text with segments joined by single spaces.
    async fn fetch(&self, video_id: &str) -> SourceResult<String>;
}

/// Machine translation.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates `text` (source language auto-detected) into `target_language`.
    async fn translate(&self, text: &str, target_language: &str) -> SourceResult<String>;
}

/// Spelling and grammar correction.
#[async_trait]
pub trait GrammarChecker: Send + Sync {
    /// Returns `text` with suggested corrections applied.
    async fn check(&self, text: &str, language: &str) -> SourceResult<String>;
}

/// Errors raised by text sources.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The caller supplied something the source cannot work with.
    #[error("{0}")]
    InvalidInput(String),

    /// The upstream has nothing for this input.
    #[error("{0}")]
    NotFound(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{service} returned {status}: {message}")]
    Provider {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Parse(String),
}

pub type SourceResult<T> = Result<T, SourceError>;

impl SourceError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Network(e.to_string())
        }
    }
}

/// Longest upstream error body kept in an error.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Turns a non-success response into a [`SourceError::Provider`].
async fn ensure_success(service: &'static str, response: Response) -> SourceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SourceError::Provider {
        service,
        status: status.as_u16(),
        message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    })
}

fn is_not_found(status: u16) -> bool {
    status == StatusCode::NOT_FOUND.as_u16()
}

/// Trims a configured base URL so paths can be appended.
fn base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        assert_eq!(base_url(" https://example.com/ "), "https://example.com");
        assert_eq!(base_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn test_provider_error_message() {
        let error = SourceError::Provider {
            service: "translation",
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(error.to_string(), "translation returned 502: bad gateway");
    }
}
