//! Configuration for the Azure Speech REST engine.

use std::time::Duration;

use super::AzureRegion;

/// HTTP header name for Azure subscription key authentication.
pub const AZURE_SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// HTTP header name for Azure TTS output format.
pub const AZURE_OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";

/// MP3 output formats accepted by the REST endpoint.
///
/// # Example
///
/// ```rust
/// use voxcast::core::tts::azure::AzureAudioEncoding;
///
/// let format = AzureAudioEncoding::default();
/// assert_eq!(format.as_str(), "audio-24khz-48kbitrate-mono-mp3");
/// assert_eq!(format.sample_rate(), 24000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AzureAudioEncoding {
    /// 16kHz, 32kbps MP3 mono
    Audio16Khz32KbitrateMonoMp3,
    /// 16kHz, 64kbps MP3 mono
    Audio16Khz64KbitrateMonoMp3,
    /// 24kHz, 48kbps MP3 mono
    #[default]
    Audio24Khz48KbitrateMonoMp3,
    /// 24kHz, 96kbps MP3 mono
    Audio24Khz96KbitrateMonoMp3,
    /// 48kHz, 96kbps MP3 mono
    Audio48Khz96KbitrateMonoMp3,
    /// 48kHz, 192kbps MP3 mono
    Audio48Khz192KbitrateMonoMp3,
}

impl AzureAudioEncoding {
    /// Value for the `X-Microsoft-OutputFormat` header.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio16Khz32KbitrateMonoMp3 => "audio-16khz-32kbitrate-mono-mp3",
            Self::Audio16Khz64KbitrateMonoMp3 => "audio-16khz-64kbitrate-mono-mp3",
            Self::Audio24Khz48KbitrateMonoMp3 => "audio-24khz-48kbitrate-mono-mp3",
            Self::Audio24Khz96KbitrateMonoMp3 => "audio-24khz-96kbitrate-mono-mp3",
            Self::Audio48Khz96KbitrateMonoMp3 => "audio-48khz-96kbitrate-mono-mp3",
            Self::Audio48Khz192KbitrateMonoMp3 => "audio-48khz-192kbitrate-mono-mp3",
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Audio16Khz32KbitrateMonoMp3 | Self::Audio16Khz64KbitrateMonoMp3 => 16000,
            Self::Audio24Khz48KbitrateMonoMp3 | Self::Audio24Khz96KbitrateMonoMp3 => 24000,
            Self::Audio48Khz96KbitrateMonoMp3 | Self::Audio48Khz192KbitrateMonoMp3 => 48000,
        }
    }
}

/// Settings for [`super::AzureSpeechEngine`].
#[derive(Debug, Clone)]
pub struct AzureSpeechConfig {
    /// Azure subscription key
    pub subscription_key: String,
    pub region: AzureRegion,
    /// Full endpoint URL; overrides the regional one when set
    pub endpoint: Option<String>,
    pub output_format: AzureAudioEncoding,
    /// Per-request timeout for a single synthesis call
    pub request_timeout: Duration,
}

impl Default for AzureSpeechConfig {
    fn default() -> Self {
        Self {
            subscription_key: String::new(),
            region: AzureRegion::default(),
            endpoint: None,
            output_format: AzureAudioEncoding::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl AzureSpeechConfig {
    pub fn new(subscription_key: impl Into<String>, region: AzureRegion) -> Self {
        Self {
            subscription_key: subscription_key.into(),
            region,
            ..Default::default()
        }
    }

    /// Endpoint the SSML is posted to.
    ///
    /// ```rust
    /// use voxcast::core::tts::azure::{AzureRegion, AzureSpeechConfig};
    ///
    /// let config = AzureSpeechConfig::new("key", AzureRegion::WestUS2);
    /// assert_eq!(
    ///     config.tts_url(),
    ///     "https://westus2.tts.speech.microsoft.com/cognitiveservices/v1"
    /// );
    /// ```
    pub fn tts_url(&self) -> String {
        match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
            _ => self.region.tts_rest_url(),
        }
    }
}
