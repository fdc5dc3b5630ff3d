pub mod config;
pub mod core;
pub mod docs;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use crate::core::{
    ArtifactStore, ArtifactSweeper, CoreState, Gender, SpeechEngine, SynthesisInvoker,
    SynthesisRequest, TTSError, VoiceCatalog,
};
pub use errors::app_error::{AppError, AppResult};
pub use state::AppState;
