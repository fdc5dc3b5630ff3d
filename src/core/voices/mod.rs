//! Voice catalog: language/gender → neural voice id.

pub mod catalog;

pub use catalog::{
    DEFAULT_LANGUAGE, Gender, LanguageVoices, ResolvedVoice, Voice, VoiceCatalog,
};
