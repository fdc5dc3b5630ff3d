//! Speech synthesis: the engine seam, the Azure engine, and the invoker that
//! applies retries, fallback and artifact storage.

pub mod azure;
mod base;
mod invoker;

pub use azure::{AzureAudioEncoding, AzureRegion, AzureSpeechConfig, AzureSpeechEngine};
pub use base::{SpeechEngine, SynthesisRequest, TTSError, TTSResult};
pub use invoker::SynthesisInvoker;
