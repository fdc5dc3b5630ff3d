use super::ServerConfig;

/// Upper bound for the synthesis concurrency cap.
const MAX_CONCURRENCY: usize = 1000;

/// Validate the merged configuration
///
/// Runs every check below and returns the first failure.
pub fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    validate_artifacts(config)?;
    validate_synthesis(config)?;
    validate_url("TRANSLATE_URL", &config.translate_url)?;
    validate_url("TRANSCRIPT_URL", &config.transcript_url)?;
    validate_url("GRAMMAR_CHECK_URL", &config.grammar_check_url)?;
    if let Some(endpoint) = &config.azure_speech_endpoint {
        validate_url("AZURE_SPEECH_ENDPOINT", endpoint)?;
    }
    if config.upstream_timeout_seconds == 0 {
        return Err("UPSTREAM_TIMEOUT_SECONDS must be greater than 0".into());
    }
    for origin in &config.cors_allowed_origins {
        if origin != "*" && axum::http::HeaderValue::from_str(origin).is_err() {
            return Err(format!("CORS_ALLOWED_ORIGINS contains an invalid origin '{origin}'").into());
        }
    }
    Ok(())
}

/// Validate the artifact lifecycle settings
///
/// The TTL and sweep interval must be positive; a served artifact must not
/// outlive the TTL, otherwise the sweep would race the per-request timer.
pub fn validate_artifacts(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.artifact_dir.as_os_str().is_empty() {
        return Err("ARTIFACT_DIR cannot be empty".into());
    }
    if config.artifact_ttl_seconds == 0 {
        return Err("ARTIFACT_TTL_SECONDS must be greater than 0".into());
    }
    if config.artifact_sweep_interval_seconds == 0 {
        return Err("ARTIFACT_SWEEP_INTERVAL_SECONDS must be greater than 0".into());
    }
    if config.artifact_served_retention_seconds > config.artifact_ttl_seconds {
        return Err(format!(
            "ARTIFACT_SERVED_RETENTION_SECONDS ({}) must not exceed ARTIFACT_TTL_SECONDS ({})",
            config.artifact_served_retention_seconds, config.artifact_ttl_seconds
        )
        .into());
    }
    Ok(())
}

/// Validate synthesis limits
pub fn validate_synthesis(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.max_text_length == 0 {
        return Err("MAX_TEXT_LENGTH must be greater than 0".into());
    }
    if config.synthesis_timeout_seconds == 0 {
        return Err("SYNTHESIS_TIMEOUT_SECONDS must be greater than 0".into());
    }
    if config.synthesis_max_attempts == 0 {
        return Err("SYNTHESIS_MAX_ATTEMPTS must be at least 1".into());
    }
    if config.max_concurrent_synthesis == 0 || config.max_concurrent_synthesis > MAX_CONCURRENCY {
        return Err(format!(
            "MAX_CONCURRENT_SYNTHESIS must be between 1 and {MAX_CONCURRENCY}"
        )
        .into());
    }
    if config.fallback_voice.trim().is_empty() {
        return Err("FALLBACK_VOICE cannot be empty".into());
    }
    Ok(())
}

/// Validate that an upstream URL is absolute http(s)
pub fn validate_url(name: &str, url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("{name} must be an http(s) URL, got '{url}'").into());
    }
    Ok(())
}
