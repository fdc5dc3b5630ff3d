//! Machine translation through the Google `translate_a/single` endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use async_trait::async_trait;

use super::{SourceError, SourceResult, Translator, ensure_success};
use crate::utils::req_manager::ReqManager;

/// Default translation host.
pub const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com";

/// Longest text sent in a single translation request, in chars.
const MAX_CHUNK_CHARS: usize = 1800;

/// Whether text should be translated for `language`.
///
/// Anything whose primary subtag is not English is translated.
pub fn needs_translation(language: &str) -> bool {
    let primary = language
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    !primary.is_empty() && primary != "en"
}

/// Google `translate_a/single` client (`client=gtx`).
pub struct GoogleTranslator {
    base_url: String,
    timeout: Duration,
    req_manager: Arc<ReqManager>,
}

impl GoogleTranslator {
    pub fn new(base_url: &str, timeout: Duration, req_manager: Arc<ReqManager>) -> Self {
        Self {
            base_url: super::base_url(base_url),
            timeout,
            req_manager,
        }
    }

    async fn translate_chunk(&self, chunk: &str, target: &str) -> SourceResult<String> {
        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        let request = guard
            .client()
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", chunk),
            ])
            .timeout(self.timeout);

        debug!("Translating {} chars into {}", chunk.chars().count(), target);
        let response = guard.send(request).await.map_err(SourceError::from_transport)?;
        let response = ensure_success("translation service", response).await?;
        let body: Value = response.json().await.map_err(SourceError::from_transport)?;
        parse_translation(&body)
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> SourceResult<String> {
        let target = target_language.trim().replace('_', "-");
        if target.is_empty() {
            return Err(SourceError::InvalidInput(
                "Translation target language is empty".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let chunks = split_chunks(text, MAX_CHUNK_CHARS);
        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            translated.push(self.translate_chunk(chunk, &target).await?);
        }

        let result = translated.join(" ");
        info!(
            "Translated {} chars into {} ({} request(s))",
            text.chars().count(),
            target,
            chunks.len()
        );
        Ok(result)
    }
}

/// Concatenates the translated sentences from a `dt=t` response.
///
/// Shape: `[[["translated", "original", ...], ...], null, "detected", ...]`.
fn parse_translation(body: &Value) -> SourceResult<String> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Parse("translation response has no sentences".to_string()))?;

    let text: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(SourceError::Parse(
            "translation response is empty".to_string(),
        ));
    }
    Ok(text.trim().to_string())
}

/// Splits on whitespace into chunks of at most `max_chars` chars.
/// A single word longer than `max_chars` becomes its own chunk.
fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for word in text.split_whitespace() {
        let word_chars = word.chars().count();
        if current_chars > 0 && current_chars + 1 + word_chars > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if current_chars > 0 {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(word);
        current_chars += word_chars;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator_for(server: &MockServer) -> GoogleTranslator {
        GoogleTranslator::new(
            &server.uri(),
            Duration::from_secs(5),
            Arc::new(ReqManager::new(2).unwrap()),
        )
    }

    #[test]
    fn test_needs_translation() {
        assert!(!needs_translation("en"));
        assert!(!needs_translation("EN-gb"));
        assert!(!needs_translation("en_US"));
        assert!(!needs_translation(""));
        assert!(needs_translation("fr"));
        assert!(needs_translation("pt-BR"));
    }

    #[test]
    fn test_split_chunks() {
        assert_eq!(split_chunks("a bb ccc", 4), vec!["a bb", "ccc"]);
        assert_eq!(split_chunks("  ", 10), Vec::<String>::new());
        assert_eq!(split_chunks("toolongword x", 4), vec!["toolongword", "x"]);
    }

    #[test]
    fn test_parse_translation() {
        let body = json!([[["Bonjour. ", "Hello. ", null], ["Au revoir", "Goodbye", null]], null, "en"]);
        assert_eq!(parse_translation(&body).unwrap(), "Bonjour. Au revoir");
        assert!(parse_translation(&json!({"error": true})).is_err());
        assert!(parse_translation(&json!([[]])).is_err());
    }

    #[tokio::test]
    async fn test_translate_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("tl", "fr"))
            .and(query_param("q", "Hello world"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([[["Bonjour le monde", "Hello world"]], null, "en"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let text = translator_for(&server)
            .translate("Hello world", "fr")
            .await
            .unwrap();
        assert_eq!(text, "Bonjour le monde");
    }

    #[tokio::test]
    async fn test_translate_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let error = translator_for(&server)
            .translate("Hello", "de")
            .await
            .unwrap_err();
        assert!(matches!(error, SourceError::Provider { status: 429, .. }));
    }
}
