use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Environment
/// variables override any values specified here.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///   cors_allowed_origins:
///     - "https://app.example.com"
///
/// azure:
///   subscription_key: "your-azure-speech-key"
///   region: "eastus"
///   endpoint: "https://eastus.tts.speech.microsoft.com/cognitiveservices/v1"
///
/// sources:
///   translate_url: "https://translate.googleapis.com"
///   transcript_url: "https://www.youtube.com"
///   grammar_check_url: "https://api.languagetool.org"
///   timeout_seconds: 15
///
/// artifacts:
///   dir: "temp_audio"
///   ttl_seconds: 3600
///   sweep_interval_seconds: 600
///   served_retention_seconds: 30
///
/// synthesis:
///   max_text_length: 5000
///   timeout_seconds: 60
///   max_attempts: 3
///   retry_backoff_ms: 1000
///   max_concurrent: 8
///   fallback_voice: "en-US-AriaNeural"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub azure: Option<AzureYaml>,
    pub sources: Option<SourcesYaml>,
    pub artifacts: Option<ArtifactsYaml>,
    pub synthesis: Option<SynthesisYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

/// Azure Speech settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AzureYaml {
    /// Azure Portal → Speech resource → Keys and Endpoint → Key 1 or Key 2
    pub subscription_key: Option<String>,
    /// Region the Speech resource is deployed in (e.g., "eastus", "westus2")
    pub region: Option<String>,
    /// Full endpoint URL; overrides the regional one
    pub endpoint: Option<String>,
}

/// Upstream text services from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SourcesYaml {
    pub translate_url: Option<String>,
    pub transcript_url: Option<String>,
    pub grammar_check_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Artifact lifecycle from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ArtifactsYaml {
    pub dir: Option<String>,
    pub ttl_seconds: Option<u64>,
    pub sweep_interval_seconds: Option<u64>,
    pub served_retention_seconds: Option<u64>,
}

/// Synthesis limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub max_text_length: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub max_attempts: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
    pub max_concurrent: Option<usize>,
    pub fallback_voice: Option<String>,
}

impl YamlConfig {
    /// Load YAML configuration from a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or if the YAML is malformed
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}
