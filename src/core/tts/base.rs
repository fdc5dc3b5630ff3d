//! # Speech engine abstraction
//!
//! The service talks to exactly one neural voice engine per process. The
//! [`SpeechEngine`] trait is the seam between the synthesis pipeline and that
//! engine: it receives a complete SSML document plus the voice it names and
//! returns the encoded audio bytes (MP3).
//!
//! ```rust,ignore
//! use voxcast::core::tts::{SpeechEngine, TTSResult};
//! use bytes::Bytes;
//!
//! struct SilentEngine;
//!
//! #[async_trait::async_trait]
//! impl SpeechEngine for SilentEngine {
//!     async fn synthesize(&self, _voice_id: &str, _ssml: &str) -> TTSResult<Bytes> {
//!         Ok(Bytes::from_static(b"ID3"))
//!     }
//!
//!     fn name(&self) -> &str {
//!         "silent"
//!     }
//! }
//! ```

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::ssml::Prosody;

/// TTS-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl TTSError {
    /// Whether another attempt (or another voice) could succeed.
    ///
    /// Configuration problems such as a rejected subscription key or a
    /// malformed SSML document fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            TTSError::InvalidConfiguration(_) | TTSError::InternalError(_)
        )
    }
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// External neural text-to-speech engine.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize a complete SSML document spoken by `voice_id`.
    async fn synthesize(&self, voice_id: &str, ssml: &str) -> TTSResult<Bytes>;

    /// Short engine identifier used in logs.
    fn name(&self) -> &str;
}

/// A validated, immutable synthesis job.
///
/// `text` is an XML-safe fragment produced by the sanitizer; it is embedded
/// into the SSML document verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_id: String,
    pub prosody: Prosody,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>, prosody: Prosody) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            prosody,
        }
    }
}
