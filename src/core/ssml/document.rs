//! SSML document assembly.

use super::prosody::Prosody;

/// Locale used when a voice id does not carry one.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Escapes special XML characters in text for use in SSML.
///
/// Replaces the following characters:
/// - `&` → `&amp;`
/// - `<` → `&lt;`
/// - `>` → `&gt;`
/// - `"` → `&quot;`
/// - `'` → `&apos;`
///
/// # Example
///
/// ```rust
/// use voxcast::core::ssml::escape_xml;
///
/// assert_eq!(escape_xml("Hello & goodbye"), "Hello &amp; goodbye");
/// assert_eq!(escape_xml("<script>alert('xss')</script>"), "&lt;script&gt;alert(&apos;xss&apos;)&lt;/script&gt;");
/// ```
pub fn escape_xml(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Derives the BCP-47 locale from a neural voice id.
///
/// `en-US-AriaNeural` → `en-US`, `zh-CN-XiaoxiaoNeural` → `zh-CN`.
pub fn locale_from_voice(voice_id: &str) -> String {
    let mut parts = voice_id.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(lang), Some(region), Some(_)) if !lang.is_empty() && !region.is_empty() => {
            format!("{lang}-{region}")
        }
        _ => DEFAULT_LOCALE.to_string(),
    }
}

/// Builds the SSML document sent to the speech engine.
///
/// `fragment` must already be XML-safe (output of the sanitizer); it is
/// embedded verbatim. The prosody wrapper is added only when pitch or rate
/// deviates from the voice default.
///
/// # Example
///
/// ```rust
/// use voxcast::core::ssml::{Prosody, build_ssml};
///
/// let ssml = build_ssml("Hello world!", "en-US-AriaNeural", Prosody::default());
/// assert!(ssml.contains("<voice name='en-US-AriaNeural'>"));
/// assert!(ssml.contains("xml:lang='en-US'"));
/// assert!(!ssml.contains("<prosody"));
///
/// let faster = build_ssml("Hello world!", "en-US-AriaNeural", Prosody::new(0, 20));
/// assert!(faster.contains("rate=\"+20%\""));
/// ```
pub fn build_ssml(fragment: &str, voice_id: &str, prosody: Prosody) -> String {
    let language = locale_from_voice(voice_id);
    let voice_name = escape_xml(voice_id);
    let inner_content = prosody.wrap(fragment);

    format!(
        r#"<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{language}'>
    <voice name='{voice_name}'>
        {inner_content}
    </voice>
</speak>"#,
    )
}
