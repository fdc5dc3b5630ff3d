use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::ServerConfig;
use super::yaml::YamlConfig;

/// Merge YAML configuration with environment variables
///
/// Priority order (highest to lowest):
/// 1. Environment variables
/// 2. YAML configuration values
/// 3. Default values
///
/// # Arguments
/// * `yaml_config` - Optional YAML configuration providing base values
///
/// # Returns
/// * `Result<ServerConfig, Box<dyn std::error::Error>>` - The merged configuration or an error
pub fn merge_config(
    yaml_config: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml_config.unwrap_or_default();
    let defaults = ServerConfig::default();

    // Helper macro to get value with priority: ENV > YAML > Default
    macro_rules! get_value {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            env_string($env_var)
                .or($yaml_value)
                .unwrap_or_else(|| $default)
        };
    }

    // Helper macro for optional values: ENV > YAML
    macro_rules! get_optional {
        ($env_var:expr, $yaml_value:expr) => {
            env_string($env_var).or($yaml_value)
        };
    }

    // Helper macro for parsed values: ENV (must parse) > YAML > Default
    macro_rules! get_parsed {
        ($env_var:expr, $yaml_value:expr, $default:expr) => {
            match env_parsed($env_var)? {
                Some(value) => value,
                None => $yaml_value.unwrap_or($default),
            }
        };
    }

    let server = yaml.server.unwrap_or_default();
    let azure = yaml.azure.unwrap_or_default();
    let sources = yaml.sources.unwrap_or_default();
    let artifacts = yaml.artifacts.unwrap_or_default();
    let synthesis = yaml.synthesis.unwrap_or_default();

    // Server configuration
    let host = get_value!("HOST", server.host, defaults.host);
    let port = get_parsed!("PORT", server.port, defaults.port);
    let cors_allowed_origins = match env_string("CORS_ALLOWED_ORIGINS") {
        Some(list) => parse_list(&list),
        None => server
            .cors_allowed_origins
            .map(|origins| {
                origins
                    .into_iter()
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_allowed_origins),
    };

    // Azure Speech
    let azure_speech_subscription_key =
        get_optional!("AZURE_SPEECH_SUBSCRIPTION_KEY", azure.subscription_key);
    let azure_speech_region = get_value!(
        "AZURE_SPEECH_REGION",
        azure.region,
        defaults.azure_speech_region
    );
    let azure_speech_endpoint = get_optional!("AZURE_SPEECH_ENDPOINT", azure.endpoint);

    // Upstream text services
    let translate_url = get_value!("TRANSLATE_URL", sources.translate_url, defaults.translate_url);
    let transcript_url = get_value!(
        "TRANSCRIPT_URL",
        sources.transcript_url,
        defaults.transcript_url
    );
    let grammar_check_url = get_value!(
        "GRAMMAR_CHECK_URL",
        sources.grammar_check_url,
        defaults.grammar_check_url
    );
    let upstream_timeout_seconds = get_parsed!(
        "UPSTREAM_TIMEOUT_SECONDS",
        sources.timeout_seconds,
        defaults.upstream_timeout_seconds
    );

    // Artifacts
    let artifact_dir = env_string("ARTIFACT_DIR")
        .or(artifacts.dir)
        .map(PathBuf::from)
        .unwrap_or(defaults.artifact_dir);
    let artifact_ttl_seconds = get_parsed!(
        "ARTIFACT_TTL_SECONDS",
        artifacts.ttl_seconds,
        defaults.artifact_ttl_seconds
    );
    let artifact_sweep_interval_seconds = get_parsed!(
        "ARTIFACT_SWEEP_INTERVAL_SECONDS",
        artifacts.sweep_interval_seconds,
        defaults.artifact_sweep_interval_seconds
    );
    let artifact_served_retention_seconds = get_parsed!(
        "ARTIFACT_SERVED_RETENTION_SECONDS",
        artifacts.served_retention_seconds,
        defaults.artifact_served_retention_seconds
    );

    // Synthesis
    let max_text_length = get_parsed!(
        "MAX_TEXT_LENGTH",
        synthesis.max_text_length,
        defaults.max_text_length
    );
    let synthesis_timeout_seconds = get_parsed!(
        "SYNTHESIS_TIMEOUT_SECONDS",
        synthesis.timeout_seconds,
        defaults.synthesis_timeout_seconds
    );
    let synthesis_max_attempts = get_parsed!(
        "SYNTHESIS_MAX_ATTEMPTS",
        synthesis.max_attempts,
        defaults.synthesis_max_attempts
    );
    let synthesis_retry_backoff_ms = get_parsed!(
        "SYNTHESIS_RETRY_BACKOFF_MS",
        synthesis.retry_backoff_ms,
        defaults.synthesis_retry_backoff_ms
    );
    let max_concurrent_synthesis = get_parsed!(
        "MAX_CONCURRENT_SYNTHESIS",
        synthesis.max_concurrent,
        defaults.max_concurrent_synthesis
    );
    let fallback_voice = get_value!(
        "FALLBACK_VOICE",
        synthesis.fallback_voice,
        defaults.fallback_voice
    );

    Ok(ServerConfig {
        host,
        port,
        cors_allowed_origins,
        azure_speech_subscription_key,
        azure_speech_region,
        azure_speech_endpoint,
        translate_url,
        transcript_url,
        grammar_check_url,
        upstream_timeout_seconds,
        artifact_dir,
        artifact_ttl_seconds,
        artifact_sweep_interval_seconds,
        artifact_served_retention_seconds,
        max_text_length,
        synthesis_timeout_seconds,
        synthesis_max_attempts,
        synthesis_retry_backoff_ms,
        max_concurrent_synthesis,
        fallback_voice,
    })
}

/// Non-empty, trimmed environment variable.
fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parsed environment variable; a value that does not parse is an error.
fn env_parsed<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} environment variable '{raw}': {e}").into()),
        None => Ok(None),
    }
}

/// Comma-separated list, blanks dropped.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
