//! Runs a synthesis job against the engine and stores the result.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{info, warn};

use super::base::{SpeechEngine, SynthesisRequest, TTSError, TTSResult};
use crate::core::artifacts::{ArtifactStore, AudioArtifact};
use crate::core::ssml::build_ssml;
use crate::utils::retry::{RetryError, RetryPolicy};

/// Turns a [`SynthesisRequest`] into a stored [`AudioArtifact`].
///
/// Engine calls are capped by a semaphore, retried according to the
/// [`RetryPolicy`], and fall back to a single attempt with the fallback voice
/// when the requested voice keeps failing.
pub struct SynthesisInvoker {
    engine: Arc<dyn SpeechEngine>,
    store: Arc<ArtifactStore>,
    policy: RetryPolicy,
    fallback_voice: String,
    permits: Semaphore,
}

impl SynthesisInvoker {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        store: Arc<ArtifactStore>,
        policy: RetryPolicy,
        fallback_voice: impl Into<String>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            engine,
            store,
            policy,
            fallback_voice: fallback_voice.into(),
            permits: Semaphore::new(max_concurrent.max(1)),
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Synthesizes `request` and writes the audio to a new artifact.
    ///
    /// The returned artifact records the voice that actually produced it.
    pub async fn invoke(&self, request: &SynthesisRequest) -> TTSResult<AudioArtifact> {
        let deadline = self.policy.deadline();

        let _permit = match timeout_at(deadline, self.permits.acquire()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                return Err(TTSError::InternalError(
                    "Synthesis limiter closed".to_string(),
                ));
            }
            Err(_) => {
                return Err(TTSError::TimeoutError(
                    "Timed out waiting for a synthesis slot".to_string(),
                ));
            }
        };

        let (audio, voice_id) = self.synthesize_with_fallback(request, deadline).await?;

        let artifact = self
            .store
            .create(&audio)
            .await
            .map_err(|e| TTSError::InternalError(format!("Failed to store audio: {e}")))?;

        info!(
            "Synthesized {} bytes with {} voice {} into {}",
            artifact.size(),
            self.engine.name(),
            voice_id,
            artifact.id()
        );
        Ok(artifact.with_voice_id(voice_id))
    }

    async fn synthesize_with_fallback(
        &self,
        request: &SynthesisRequest,
        deadline: Instant,
    ) -> TTSResult<(Bytes, String)> {
        let ssml = build_ssml(&request.text, &request.voice_id, request.prosody);
        let attempt_timeout = self.policy.attempt_timeout();
        // The last slice of the budget belongs to the fallback voice.
        let primary_deadline = deadline.checked_sub(attempt_timeout).unwrap_or(deadline);

        let last_error = match self
            .policy
            .run_until(primary_deadline, TTSError::is_retryable, |_| {
                self.attempt(&request.voice_id, &ssml, attempt_timeout)
            })
            .await
        {
            Ok(audio) => return Ok((audio, request.voice_id.clone())),
            Err(RetryError::Rejected(error)) => return Err(error),
            Err(RetryError::DeadlineExceeded { attempts }) => {
                warn!(
                    "Voice {} did not finish in time after {} attempts",
                    request.voice_id, attempts
                );
                deadline_error(attempts)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(
                    "Voice {} failed after {} attempts: {}",
                    request.voice_id, attempts, last
                );
                last
            }
        };

        if request.voice_id.eq_ignore_ascii_case(&self.fallback_voice) {
            return Err(last_error);
        }

        warn!(
            "Falling back from voice {} to {}",
            request.voice_id, self.fallback_voice
        );
        let fallback_ssml = build_ssml(&request.text, &self.fallback_voice, request.prosody);
        match timeout_at(
            deadline,
            self.engine.synthesize(&self.fallback_voice, &fallback_ssml),
        )
        .await
        {
            Ok(Ok(audio)) => Ok((audio, self.fallback_voice.clone())),
            Ok(Err(error)) => {
                warn!("Fallback voice {} failed: {}", self.fallback_voice, error);
                Err(last_error)
            }
            Err(_) => Err(deadline_error(self.policy.max_attempts + 1)),
        }
    }

    async fn attempt(&self, voice_id: &str, ssml: &str, limit: Duration) -> TTSResult<Bytes> {
        match timeout(limit, self.engine.synthesize(voice_id, ssml)).await {
            Ok(result) => result,
            Err(_) => Err(TTSError::TimeoutError(format!(
                "Voice {voice_id} did not answer within {}s",
                limit.as_secs_f32()
            ))),
        }
    }
}

fn deadline_error(attempts: u32) -> TTSError {
    TTSError::TimeoutError(format!(
        "Synthesis did not finish in time ({attempts} attempts)"
    ))
}
