//! Microsoft Azure neural text-to-speech engine.
//!
//! - **region**: regional endpoints (`AzureRegion`)
//! - **config**: engine settings and MP3 output formats
//! - **engine**: the `AzureSpeechEngine` REST client
//!
//! # Azure TTS API Reference
//!
//! - TTS endpoint: `https://{region}.tts.speech.microsoft.com/cognitiveservices/v1`
//! - Required headers: `Ocp-Apim-Subscription-Key`, `Content-Type: application/ssml+xml`,
//!   `X-Microsoft-OutputFormat`
//! - Documentation: <https://learn.microsoft.com/en-us/azure/ai-services/speech-service/rest-text-to-speech>

mod config;
mod engine;
mod region;

pub use config::{
    AZURE_OUTPUT_FORMAT_HEADER, AZURE_SUBSCRIPTION_KEY_HEADER, AzureAudioEncoding,
    AzureSpeechConfig,
};
pub use engine::AzureSpeechEngine;
pub use region::AzureRegion;
