//! Configuration module for the voxcast server
//!
//! This module handles server configuration from various sources: YAML files and
//! environment variables. Environment variables always override YAML values.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use voxcast::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::utils::retry::RetryPolicy;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use utils::parse_flag;

/// Server configuration
///
/// Contains everything needed to run the server:
/// - Server settings (host, port, CORS)
/// - Azure Speech credentials and endpoint
/// - Upstream text services (translation, transcripts, grammar)
/// - Artifact lifecycle (directory, TTL, sweep cadence)
/// - Synthesis limits (timeout, retries, concurrency, fallback voice)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Empty means any origin
    pub cors_allowed_origins: Vec<String>,

    // Azure Speech
    pub azure_speech_subscription_key: Option<String>,
    pub azure_speech_region: String,
    pub azure_speech_endpoint: Option<String>,

    // Upstream text services
    pub translate_url: String,
    pub transcript_url: String,
    pub grammar_check_url: String,
    pub upstream_timeout_seconds: u64,

    // Artifacts
    pub artifact_dir: PathBuf,
    pub artifact_ttl_seconds: u64,
    pub artifact_sweep_interval_seconds: u64,
    pub artifact_served_retention_seconds: u64,

    // Synthesis
    pub max_text_length: usize,
    pub synthesis_timeout_seconds: u64,
    pub synthesis_max_attempts: u32,
    pub synthesis_retry_backoff_ms: u64,
    pub max_concurrent_synthesis: usize,
    pub fallback_voice: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_allowed_origins: Vec::new(),
            azure_speech_subscription_key: None,
            azure_speech_region: "eastus".to_string(),
            azure_speech_endpoint: None,
            translate_url: crate::core::sources::DEFAULT_TRANSLATE_URL.to_string(),
            transcript_url: crate::core::sources::DEFAULT_TRANSCRIPT_URL.to_string(),
            grammar_check_url: crate::core::sources::DEFAULT_GRAMMAR_CHECK_URL.to_string(),
            upstream_timeout_seconds: 15,
            artifact_dir: PathBuf::from("temp_audio"),
            artifact_ttl_seconds: 3600,
            artifact_sweep_interval_seconds: 600,
            artifact_served_retention_seconds: 30,
            max_text_length: 5000,
            synthesis_timeout_seconds: 60,
            synthesis_max_attempts: 3,
            synthesis_retry_backoff_ms: 1000,
            max_concurrent_synthesis: 8,
            fallback_voice: "en-US-AriaNeural".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides
    ///
    /// Priority order (highest to lowest):
    /// 1. Environment variables
    /// 2. YAML file values
    /// 3. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        // The .env file is not consulted here: the YAML file is the source of
        // truth and only real environment variables override it.
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn artifact_ttl(&self) -> Duration {
        Duration::from_secs(self.artifact_ttl_seconds)
    }

    pub fn artifact_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.artifact_sweep_interval_seconds)
    }

    pub fn artifact_served_retention(&self) -> Duration {
        Duration::from_secs(self.artifact_served_retention_seconds)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    /// Retry settings for engine calls.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.synthesis_max_attempts,
            Duration::from_millis(self.synthesis_retry_backoff_ms),
            Duration::from_secs(self.synthesis_timeout_seconds),
        )
    }
}
