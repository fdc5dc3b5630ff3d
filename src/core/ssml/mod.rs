//! Text-to-SSML pipeline.
//!
//! - `sanitizer`: strips unsafe markup from user text and escapes the rest
//! - `prosody`: clamped pitch/rate adjustments
//! - `document`: assembles the final `<speak>` document for a voice

pub mod document;
pub mod prosody;
pub mod sanitizer;

pub use document::{build_ssml, escape_xml, locale_from_voice};
pub use prosody::{PROSODY_MAX_PERCENT, PROSODY_MIN_PERCENT, Prosody, clamp_percent};
pub use sanitizer::{FILLER_PHRASE, MarkupError, SanitizeMode, SanitizedText, plain_text, sanitize};
