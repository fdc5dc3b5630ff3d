//! HTTP request handlers
//!
//! - `api` - Health check and wake endpoints
//! - `generate` - Text-to-speech generation
//! - `voices` - Voice listing endpoint

pub mod api;
pub mod generate;
pub mod voices;

pub use generate::generate_handler;
