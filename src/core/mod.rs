pub mod artifacts;
pub mod sources;
pub mod ssml;
pub mod state;
pub mod tts;
pub mod voices;

// Re-export commonly used types for convenience
pub use artifacts::{ArtifactError, ArtifactStore, ArtifactSweeper, AudioArtifact};
pub use sources::{GrammarChecker, SourceError, TranscriptSource, Translator};
pub use tts::{SpeechEngine, SynthesisInvoker, SynthesisRequest, TTSError, TTSResult};
pub use voices::{Gender, VoiceCatalog};

// Re-export CoreState for external use
pub use state::CoreState;
