//! Static voice catalog and resolution rules.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::debug;

/// Language used when the requested one is not in the catalog.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Voice gender as exposed by the neural voice catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Gender {
    #[default]
    Female,
    Male,
}

impl Gender {
    /// Lenient parse: `Female`, `female`, `F`, `woman`, `Male`, `m`, ...
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "female" | "f" | "woman" => Some(Gender::Female),
            "male" | "m" | "man" => Some(Gender::Male),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "Female",
            Gender::Male => "Male",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voices available for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageVoices {
    /// Human readable language name
    pub name: String,
    pub female: String,
    pub male: String,
}

impl LanguageVoices {
    pub fn new(name: &str, female: &str, male: &str) -> Self {
        Self {
            name: name.to_string(),
            female: female.to_string(),
            male: male.to_string(),
        }
    }

    pub fn voice_for(&self, gender: Gender) -> &str {
        match gender {
            Gender::Female => &self.female,
            Gender::Male => &self.male,
        }
    }
}

/// Outcome of a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVoice {
    pub voice_id: String,
    /// Catalog key that served the lookup (after fallback)
    pub language: String,
    pub gender: Gender,
}

/// Entry returned by the voice listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Voice {
    /// Engine voice identifier
    #[cfg_attr(feature = "openapi", schema(example = "en-US-AriaNeural"))]
    pub id: String,
    /// Display name of the language
    #[cfg_attr(feature = "openapi", schema(example = "English"))]
    pub name: String,
    /// Gender of the voice
    pub gender: Gender,
    /// Catalog language key
    #[cfg_attr(feature = "openapi", schema(example = "en"))]
    pub language: String,
    /// BCP-47 locale spoken by the voice
    #[cfg_attr(feature = "openapi", schema(example = "en-US"))]
    pub locale: String,
}

/// Read-only mapping language → gender → voice id.
///
/// Built once at startup and shared by reference; lookups never fail.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    languages: BTreeMap<String, LanguageVoices>,
    default_language: String,
    default_gender: Gender,
}

impl VoiceCatalog {
    /// Built-in catalog of Azure neural voices.
    pub fn builtin() -> Self {
        let entries = [
            ("en", LanguageVoices::new("English", "en-US-AriaNeural", "en-US-GuyNeural")),
            ("es", LanguageVoices::new("Spanish", "es-ES-ElviraNeural", "es-ES-AlvaroNeural")),
            ("fr", LanguageVoices::new("French", "fr-FR-DeniseNeural", "fr-FR-HenriNeural")),
            ("de", LanguageVoices::new("German", "de-DE-KatjaNeural", "de-DE-ConradNeural")),
            ("it", LanguageVoices::new("Italian", "it-IT-ElsaNeural", "it-IT-DiegoNeural")),
            ("pt", LanguageVoices::new("Portuguese", "pt-BR-FranciscaNeural", "pt-BR-AntonioNeural")),
            ("hi", LanguageVoices::new("Hindi", "hi-IN-SwaraNeural", "hi-IN-MadhurNeural")),
            ("bn", LanguageVoices::new("Bengali", "bn-IN-TanishaaNeural", "bn-IN-BashkarNeural")),
            ("ta", LanguageVoices::new("Tamil", "ta-IN-PallaviNeural", "ta-IN-ValluvarNeural")),
            ("ja", LanguageVoices::new("Japanese", "ja-JP-NanamiNeural", "ja-JP-KeitaNeural")),
            ("ko", LanguageVoices::new("Korean", "ko-KR-SunHiNeural", "ko-KR-InJoonNeural")),
            ("zh", LanguageVoices::new("Chinese", "zh-CN-XiaoxiaoNeural", "zh-CN-YunxiNeural")),
            ("ar", LanguageVoices::new("Arabic", "ar-SA-ZariyahNeural", "ar-SA-HamedNeural")),
            ("ru", LanguageVoices::new("Russian", "ru-RU-SvetlanaNeural", "ru-RU-DmitryNeural")),
        ];
        let languages = entries
            .into_iter()
            .map(|(key, voices)| (key.to_string(), voices))
            .collect();

        Self {
            languages,
            default_language: DEFAULT_LANGUAGE.to_string(),
            default_gender: Gender::Female,
        }
    }

    /// The default voice: default language, default gender.
    pub fn default_voice(&self) -> &str {
        self.default_entry().voice_for(self.default_gender)
    }

    /// Resolves a (language, gender) pair to a voice id.
    ///
    /// Unknown or missing language falls back to the default language, a
    /// missing gender to the default gender.
    pub fn resolve(&self, language: Option<&str>, gender: Option<Gender>) -> ResolvedVoice {
        let gender = gender.unwrap_or(self.default_gender);
        let (language, voices) = match language.and_then(|l| self.lookup(l)) {
            Some(found) => found,
            None => {
                debug!(
                    "Language {:?} not in catalog, using default '{}'",
                    language, self.default_language
                );
                (self.default_language.as_str(), self.default_entry())
            }
        };

        ResolvedVoice {
            voice_id: voices.voice_for(gender).to_string(),
            language: language.to_string(),
            gender,
        }
    }

    /// Resolves a request that may name a voice explicitly.
    ///
    /// An explicit voice wins when it is a catalog voice (case-insensitive);
    /// anything else is ignored in favor of language/gender resolution.
    pub fn resolve_request(
        &self,
        voice: Option<&str>,
        language: Option<&str>,
        gender: Option<Gender>,
    ) -> ResolvedVoice {
        if let Some(requested) = voice.map(str::trim).filter(|v| !v.is_empty()) {
            if let Some(found) = self.find_voice(requested) {
                return found;
            }
            debug!("Requested voice '{}' is not in the catalog, ignoring", requested);
        }
        self.resolve(language, gender)
    }

    /// Whether `language` has its own entry rather than resolving to the default.
    pub fn supports_language(&self, language: &str) -> bool {
        self.lookup(language).is_some()
    }

    /// All voices, grouped by language key.
    pub fn voices(&self) -> BTreeMap<String, Vec<Voice>> {
        self.languages
            .iter()
            .map(|(key, voices)| {
                let listed = [Gender::Female, Gender::Male]
                    .into_iter()
                    .map(|gender| {
                        let id = voices.voice_for(gender).to_string();
                        Voice {
                            locale: crate::core::ssml::locale_from_voice(&id),
                            id,
                            name: voices.name.clone(),
                            gender,
                            language: key.clone(),
                        }
                    })
                    .collect();
                (key.clone(), listed)
            })
            .collect()
    }

    fn default_entry(&self) -> &LanguageVoices {
        // builtin() always contains the default language.
        &self.languages[&self.default_language]
    }

    /// Full tag first (`pt-br`), then primary subtag (`pt`).
    fn lookup(&self, language: &str) -> Option<(&str, &LanguageVoices)> {
        let normalized = normalize_language(language);
        if normalized.is_empty() {
            return None;
        }
        if let Some((key, voices)) = self.languages.get_key_value(&normalized) {
            return Some((key.as_str(), voices));
        }
        let primary = normalized.split('-').next().unwrap_or_default();
        self.languages
            .get_key_value(primary)
            .map(|(key, voices)| (key.as_str(), voices))
    }

    fn find_voice(&self, voice_id: &str) -> Option<ResolvedVoice> {
        self.languages.iter().find_map(|(key, voices)| {
            [Gender::Female, Gender::Male]
                .into_iter()
                .find(|gender| voices.voice_for(*gender).eq_ignore_ascii_case(voice_id))
                .map(|gender| ResolvedVoice {
                    voice_id: voices.voice_for(gender).to_string(),
                    language: key.clone(),
                    gender,
                })
        })
    }
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Lowercases, trims and turns `_` into `-`.
fn normalize_language(language: &str) -> String {
    language.trim().to_ascii_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_english_female() {
        let catalog = VoiceCatalog::builtin();
        let resolved = catalog.resolve(Some("en"), Some(Gender::Female));
        assert_eq!(resolved.voice_id, "en-US-AriaNeural");
        assert_eq!(catalog.default_voice(), "en-US-AriaNeural");
    }

    #[test]
    fn test_language_normalization() {
        let catalog = VoiceCatalog::builtin();
        for tag in ["FR", "fr-FR", "fr_ca", " fr "] {
            assert_eq!(
                catalog.resolve(Some(tag), Some(Gender::Male)).voice_id,
                "fr-FR-HenriNeural",
                "tag {tag:?}"
            );
        }
    }

    #[test]
    fn test_unknown_language_and_gender_fall_back() {
        let catalog = VoiceCatalog::builtin();
        for language in [None, Some(""), Some("xx"), Some("klingon-KL"), Some("???")] {
            let resolved = catalog.resolve(language, None);
            assert_eq!(resolved.voice_id, "en-US-AriaNeural");
            assert_eq!(resolved.language, DEFAULT_LANGUAGE);
            assert_eq!(resolved.gender, Gender::Female);
            assert!(catalog.find_voice(&resolved.voice_id).is_some());
        }
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse(" MALE "), Some(Gender::Male));
        assert_eq!(Gender::parse("m"), Some(Gender::Male));
        assert_eq!(Gender::parse("robot"), None);
    }

    #[test]
    fn test_explicit_voice_wins_when_known() {
        let catalog = VoiceCatalog::builtin();
        let resolved =
            catalog.resolve_request(Some("ja-jp-keitaneural"), Some("en"), Some(Gender::Female));
        assert_eq!(resolved.voice_id, "ja-JP-KeitaNeural");
        assert_eq!(resolved.language, "ja");
        assert_eq!(resolved.gender, Gender::Male);
    }

    #[test]
    fn test_unknown_explicit_voice_is_ignored() {
        let catalog = VoiceCatalog::builtin();
        let resolved =
            catalog.resolve_request(Some("en-US-MadeUpNeural"), Some("de"), Some(Gender::Male));
        assert_eq!(resolved.voice_id, "de-DE-ConradNeural");
    }

    #[test]
    fn test_supported_languages() {
        let catalog = VoiceCatalog::builtin();
        assert!(catalog.supports_language("fr-CA"));
        assert!(catalog.supports_language("EN"));
        assert!(!catalog.supports_language("sv"));
        assert!(!catalog.supports_language(""));
    }

    #[test]
    fn test_voice_listing() {
        let catalog = VoiceCatalog::builtin();
        let voices = catalog.voices();
        let english = &voices["en"];
        assert_eq!(english.len(), 2);
        assert_eq!(english[0].id, "en-US-AriaNeural");
        assert_eq!(english[0].locale, "en-US");
        assert_eq!(english[1].gender, Gender::Male);
    }
}
