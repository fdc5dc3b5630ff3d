use std::sync::Arc;

use tracing::info;

use crate::config::ServerConfig;
use crate::core::artifacts::ArtifactStore;
use crate::core::sources::{
    GoogleTranslator, GrammarChecker, LanguageToolChecker, TranscriptSource, Translator,
    YouTubeTranscripts,
};
use crate::core::tts::{
    AzureRegion, AzureSpeechConfig, AzureSpeechEngine, SpeechEngine, SynthesisInvoker,
};
use crate::core::voices::VoiceCatalog;
use crate::utils::req_manager::ReqManager;

/// Outbound HTTP connections per synthesis slot, shared by the engine and text sources.
const OUTBOUND_CONCURRENCY_FACTOR: usize = 4;
const MAX_OUTBOUND_CONNECTIONS: usize = 1000;

/// Core-specific shared state for the application.
///
/// Holds the collaborators of the synthesis pipeline. Everything here is
/// built once at startup and shared read-only through `Arc`.
#[derive(Clone)]
pub struct CoreState {
    pub transcripts: Arc<dyn TranscriptSource>,
    pub translator: Arc<dyn Translator>,
    pub grammar: Arc<dyn GrammarChecker>,
    pub catalog: Arc<VoiceCatalog>,
    pub artifacts: Arc<ArtifactStore>,
    pub invoker: Arc<SynthesisInvoker>,
    /// Shared outbound client; absent when collaborators were injected
    http: Option<Arc<ReqManager>>,
}

impl CoreState {
    /// Initialize core state from configuration.
    ///
    /// # Errors
    /// Fails when the Azure key is missing, the artifact directory cannot be
    /// created or the HTTP client cannot be built.
    pub async fn new(config: &ServerConfig) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let key = config
            .azure_speech_subscription_key
            .clone()
            .ok_or("AZURE_SPEECH_SUBSCRIPTION_KEY is required")?;

        let req_manager = Arc::new(
            ReqManager::new(
                (config.max_concurrent_synthesis * OUTBOUND_CONCURRENCY_FACTOR)
                    .min(MAX_OUTBOUND_CONNECTIONS),
            )
            .map_err(|e| format!("Failed to create HTTP client: {e}"))?,
        );
        info!(
            "Initialized ReqManager with {} concurrent connections",
            req_manager.max_concurrent_requests()
        );

        let region: AzureRegion = config
            .azure_speech_region
            .parse()
            .unwrap_or_else(|never| match never {});
        let mut speech_config = AzureSpeechConfig::new(key, region);
        speech_config.endpoint = config.azure_speech_endpoint.clone();
        speech_config.request_timeout = config.retry_policy().attempt_timeout();
        let engine: Arc<dyn SpeechEngine> =
            Arc::new(AzureSpeechEngine::new(speech_config, req_manager.clone())?);

        let timeout = config.upstream_timeout();
        let transcripts = Arc::new(YouTubeTranscripts::new(
            &config.transcript_url,
            timeout,
            req_manager.clone(),
        ));
        let translator = Arc::new(GoogleTranslator::new(
            &config.translate_url,
            timeout,
            req_manager.clone(),
        ));
        let grammar = Arc::new(LanguageToolChecker::new(
            &config.grammar_check_url,
            timeout,
            req_manager.clone(),
        ));

        let artifacts = Arc::new(ArtifactStore::new(config.artifact_dir.clone()).await?);

        let mut state = Self::assemble(
            config,
            engine,
            transcripts,
            translator,
            grammar,
            VoiceCatalog::builtin(),
            artifacts,
        );
        state.http = Some(req_manager);
        Ok(Arc::new(state))
    }

    /// Assemble core state from already-built collaborators.
    pub fn from_parts(
        config: &ServerConfig,
        engine: Arc<dyn SpeechEngine>,
        transcripts: Arc<dyn TranscriptSource>,
        translator: Arc<dyn Translator>,
        grammar: Arc<dyn GrammarChecker>,
        catalog: VoiceCatalog,
        artifacts: Arc<ArtifactStore>,
    ) -> Arc<Self> {
        Arc::new(Self::assemble(
            config,
            engine,
            transcripts,
            translator,
            grammar,
            catalog,
            artifacts,
        ))
    }

    /// Outbound request counters, when the shared HTTP client is in use.
    pub fn http_summary(&self) -> Option<String> {
        self.http.as_ref().map(|http| http.metrics().summary())
    }

    fn assemble(
        config: &ServerConfig,
        engine: Arc<dyn SpeechEngine>,
        transcripts: Arc<dyn TranscriptSource>,
        translator: Arc<dyn Translator>,
        grammar: Arc<dyn GrammarChecker>,
        catalog: VoiceCatalog,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        let invoker = SynthesisInvoker::new(
            engine,
            artifacts.clone(),
            config.retry_policy(),
            config.fallback_voice.clone(),
            config.max_concurrent_synthesis,
        );
        info!(
            "Core state ready: engine '{}', {} voice language(s), artifacts in {:?}",
            invoker.engine_name(),
            catalog.voices().len(),
            artifacts.dir()
        );

        Self {
            transcripts,
            translator,
            grammar,
            catalog: Arc::new(catalog),
            artifacts,
            invoker: Arc::new(invoker),
            http: None,
        }
    }
}
