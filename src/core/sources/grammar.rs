//! Spelling and grammar correction through a LanguageTool `/v2/check` server.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use async_trait::async_trait;

use super::{GrammarChecker, SourceError, SourceResult, ensure_success};
use crate::utils::req_manager::ReqManager;

/// Default LanguageTool host.
pub const DEFAULT_GRAMMAR_CHECK_URL: &str = "https://api.languagetool.org";

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<CheckMatch>,
}

/// Offsets and lengths are in UTF-16 code units.
#[derive(Debug, Deserialize)]
struct CheckMatch {
    offset: usize,
    length: usize,
    #[serde(default)]
    replacements: Vec<Replacement>,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

/// LanguageTool checker applying the first suggestion of each match.
pub struct LanguageToolChecker {
    base_url: String,
    timeout: Duration,
    req_manager: Arc<ReqManager>,
}

impl LanguageToolChecker {
    pub fn new(base_url: &str, timeout: Duration, req_manager: Arc<ReqManager>) -> Self {
        Self {
            base_url: super::base_url(base_url),
            timeout,
            req_manager,
        }
    }
}

#[async_trait]
impl GrammarChecker for LanguageToolChecker {
    async fn check(&self, text: &str, language: &str) -> SourceResult<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }
        let language = match language.trim() {
            "" => "auto".to_string(),
            other => other.replace('_', "-"),
        };

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let request = guard
            .client()
            .post(format!("{}/v2/check", self.base_url))
            .form(&[("text", text), ("language", language.as_str())])
            .timeout(self.timeout);

        debug!("Checking {} chars ({})", text.chars().count(), language);
        let response = guard.send(request).await.map_err(SourceError::from_transport)?;
        let response = ensure_success("grammar service", response).await?;
        let body: CheckResponse = response.json().await.map_err(SourceError::from_transport)?;

        let (corrected, applied) = apply_corrections(text, &body.matches);
        if applied > 0 {
            info!("Applied {} grammar correction(s)", applied);
        }
        Ok(corrected)
    }
}

/// Replaces each non-overlapping match with its first replacement.
///
/// Matches out of bounds, overlapping an earlier one, without replacements,
/// or splitting a surrogate pair are skipped.
fn apply_corrections(text: &str, matches: &[CheckMatch]) -> (String, usize) {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut ordered: Vec<&CheckMatch> = matches.iter().collect();
    ordered.sort_by_key(|m| m.offset);

    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut cursor = 0;
    let mut applied = 0;

    for m in ordered {
        let Some(replacement) = m.replacements.first() else {
            continue;
        };
        let end = m.offset.saturating_add(m.length);
        if m.offset < cursor || end > units.len() {
            continue;
        }
        if splits_surrogate(&units, m.offset) || splits_surrogate(&units, end) {
            continue;
        }
        out.extend_from_slice(&units[cursor..m.offset]);
        out.extend(replacement.value.encode_utf16());
        cursor = end;
        applied += 1;
    }
    out.extend_from_slice(&units[cursor..]);

    match String::from_utf16(&out) {
        Ok(corrected) => (corrected, applied),
        Err(_) => (text.to_string(), 0),
    }
}

/// True when `index` points at the low half of a surrogate pair.
fn splits_surrogate(units: &[u16], index: usize) -> bool {
    units
        .get(index)
        .is_some_and(|unit| (0xDC00..=0xDFFF).contains(unit))
}
