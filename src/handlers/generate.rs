use axum::{
    Form, Json,
    extract::{FromRequest, Request, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::parse_flag;
use crate::core::sources::{is_valid_video_id, needs_translation};
use crate::core::ssml::{Prosody, SanitizeMode, plain_text, sanitize};
use crate::core::tts::SynthesisRequest;
use crate::core::voices::{DEFAULT_LANGUAGE, Gender};
use crate::errors::app_error::{AppError, AppResult};
use crate::state::AppState;

/// Download name of every generated file.
pub const DOWNLOAD_FILENAME: &str = "speech.mp3";
/// Response header naming the voice that produced the audio.
pub const VOICE_ID_HEADER: &str = "x-voice-id";

/// Request body for the generate endpoint
///
/// Accepted as JSON or as `application/x-www-form-urlencoded`. Flags and
/// numbers may be sent as strings in either encoding.
#[derive(Debug, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct GenerateRequest {
    /// Text to synthesize; required unless `video_id` is given
    #[cfg_attr(feature = "openapi", schema(example = "Hello world"))]
    pub text: Option<String>,
    /// YouTube video whose transcript replaces `text`
    #[cfg_attr(feature = "openapi", schema(example = "dQw4w9WgXcQ"))]
    pub video_id: Option<String>,
    /// Target language (default `en`)
    #[cfg_attr(feature = "openapi", schema(example = "en"))]
    pub language: Option<String>,
    /// Explicit catalog voice id
    #[cfg_attr(feature = "openapi", schema(example = "en-US-GuyNeural"))]
    pub voice: Option<String>,
    /// `Female` or `Male`
    #[cfg_attr(feature = "openapi", schema(example = "Female"))]
    pub gender: Option<String>,
    /// Pitch change in percent, clamped to [-50, 50]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i32>, example = 0))]
    pub pitch: Option<Value>,
    /// Rate change in percent, clamped to [-50, 50]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<i32>, example = 0))]
    pub rate: Option<Value>,
    /// Treat `text` as SSML
    #[cfg_attr(feature = "openapi", schema(value_type = Option<bool>))]
    pub ssml: Option<Value>,
    /// Translate when the language is not English (default true)
    #[cfg_attr(feature = "openapi", schema(value_type = Option<bool>))]
    pub translate: Option<Value>,
    /// Apply spelling/grammar corrections (default false)
    #[cfg_attr(feature = "openapi", schema(value_type = Option<bool>))]
    pub spell_check: Option<Value>,
}

/// Generate request parsed from either a JSON or a form body.
pub struct GenerateBody(pub GenerateRequest);

impl<S> FromRequest<S> for GenerateBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        let request = if is_form {
            Form::<GenerateRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid form body: {e}")))?
                .0
        } else {
            Json::<GenerateRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
                .0
        };
        Ok(GenerateBody(request))
    }
}

/// Request after validation and normalization.
#[derive(Debug, Clone)]
struct ValidatedRequest {
    text: Option<String>,
    video_id: Option<String>,
    language: String,
    voice: Option<String>,
    gender: Option<Gender>,
    prosody: Prosody,
    ssml: bool,
    translate: bool,
    spell_check: bool,
}

impl GenerateRequest {
    fn validate(self, max_text_length: usize) -> AppResult<ValidatedRequest> {
        let video_id = non_blank(self.video_id);
        if let Some(id) = &video_id
            && !is_valid_video_id(id)
        {
            return Err(AppError::BadRequest(format!("Invalid video_id '{id}'")));
        }

        let text = non_blank(self.text);
        if video_id.is_none() {
            match &text {
                None => {
                    return Err(AppError::BadRequest(
                        "No text or video_id provided".to_string(),
                    ));
                }
                Some(text) => check_length(text, max_text_length, "Text")?,
            }
        }

        let gender = non_blank(self.gender).and_then(|raw| {
            let parsed = Gender::parse(&raw);
            if parsed.is_none() {
                debug!("Unknown gender '{}', using the default", raw);
            }
            parsed
        });

        let pitch = int_field("pitch", self.pitch.as_ref())?.unwrap_or(0);
        let rate = int_field("rate", self.rate.as_ref())?.unwrap_or(0);

        Ok(ValidatedRequest {
            text,
            video_id,
            language: non_blank(self.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            voice: non_blank(self.voice),
            gender,
            prosody: Prosody::new(pitch, rate),
            ssml: bool_field("ssml", self.ssml.as_ref())?.unwrap_or(false),
            translate: bool_field("translate", self.translate.as_ref())?.unwrap_or(true),
            spell_check: bool_field("spell_check", self.spell_check.as_ref())?.unwrap_or(false),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_length(text: &str, max: usize, what: &str) -> AppResult<()> {
    let length = text.chars().count();
    if length > max {
        return Err(AppError::BadRequest(format!(
            "{what} is too long ({length} characters, maximum {max})"
        )));
    }
    Ok(())
}

/// Integer from a JSON number or a numeric string; fractions are rounded.
fn int_field(name: &str, value: Option<&Value>) -> AppResult<Option<i64>> {
    let invalid = || AppError::BadRequest(format!("{name} must be an integer"));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| f.round() as i64))
            .map(Some)
            .ok_or_else(invalid),
        Some(Value::String(raw)) => {
            let raw = raw.trim().trim_end_matches('%');
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<i64>()
                .ok()
                .or_else(|| raw.parse::<f64>().ok().map(|f| f.round() as i64))
                .map(Some)
                .ok_or_else(invalid)
        }
        Some(_) => Err(invalid()),
    }
}

/// Boolean from a JSON bool, a 0/1 number or a string accepted by [`parse_flag`].
fn bool_field(name: &str, value: Option<&Value>) -> AppResult<Option<bool>> {
    let invalid = || AppError::BadRequest(format!("{name} must be a boolean"));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(invalid()),
        },
        Some(Value::String(raw)) if raw.trim().is_empty() => Ok(None),
        Some(Value::String(raw)) => parse_flag(raw).map(Some).ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

/// Handler for the /generate endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        post,
        path = "/generate",
        request_body(
            content = GenerateRequest,
            content_type = ["application/json", "application/x-www-form-urlencoded"]
        ),
        responses(
            (status = 200, description = "MP3 attachment named speech.mp3",
                content_type = "audio/mpeg",
                headers(
                    ("x-voice-id" = String, description = "Voice that produced the audio")
                )
            ),
            (status = 400, description = "Invalid request or missing transcript"),
            (status = 503, description = "Upstream service unavailable"),
            (status = 504, description = "Synthesis timed out")
        ),
        tag = "tts"
    )
)]
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    GenerateBody(request): GenerateBody,
) -> AppResult<Response> {
    let request = request.validate(state.config.max_text_length)?;
    let core = &state.core_state;

    info!(
        "Generate request received - language: {}, source: {}, ssml: {}",
        request.language,
        if request.video_id.is_some() { "transcript" } else { "text" },
        request.ssml
    );

    let mut text = match &request.video_id {
        Some(video_id) => {
            let transcript = core.transcripts.fetch(video_id).await?;
            check_length(&transcript, state.config.max_text_length, "Transcript")?;
            transcript
        }
        None => request.text.clone().unwrap_or_default(),
    };
    let mut mode = if request.ssml {
        SanitizeMode::Ssml
    } else {
        SanitizeMode::Plain
    };

    let translate = request.translate && needs_translation(&request.language);
    if translate && !core.catalog.supports_language(&request.language) {
        warn!(
            "No voice for language '{}', skipping translation and using the default voice",
            request.language
        );
    } else if translate {
        text = core
            .translator
            .translate(&plain_text(&text), &request.language)
            .await
            .map_err(|e| {
                warn!("Translation into {} failed: {}", request.language, e);
                AppError::from(e)
            })?;
        mode = SanitizeMode::Plain;
    }

    if request.spell_check {
        match core.grammar.check(&plain_text(&text), &request.language).await {
            Ok(corrected) => {
                text = corrected;
                mode = SanitizeMode::Plain;
            }
            Err(e) => warn!("Grammar check failed, using unchecked text: {}", e),
        }
    }

    let sanitized = sanitize(&text, mode);
    if sanitized.fell_back {
        warn!("SSML input was malformed and was read as plain text");
    }

    let voice = core.catalog.resolve_request(
        request.voice.as_deref(),
        Some(request.language.as_str()),
        request.gender,
    );
    debug!(
        "Resolved voice {} ({} / {})",
        voice.voice_id, voice.language, voice.gender
    );

    let synthesis = SynthesisRequest::new(sanitized.content, voice.voice_id, request.prosody);
    let artifact = core.invoker.invoke(&synthesis).await?;
    let voice_id = artifact
        .voice_id()
        .unwrap_or(synthesis.voice_id.as_str())
        .to_string();

    let (audio, served) = artifact.serve().await?;
    served.schedule_deletion(state.config.artifact_served_retention());

    info!(
        "Generated {} bytes of audio with voice {}",
        audio.len(),
        voice_id
    );

    let mut response = (
        [
            (header::CONTENT_TYPE, "audio/mpeg".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DOWNLOAD_FILENAME}\""),
            ),
        ],
        audio,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&voice_id) {
        response.headers_mut().insert(VOICE_ID_HEADER, value);
    }
    Ok(response)
}
