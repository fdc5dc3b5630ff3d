//! User text sanitization.
//!
//! Every piece of user-supplied text passes through [`sanitize`] before it is
//! embedded into an SSML document. Two modes exist:
//!
//! - [`SanitizeMode::Plain`]: all markup is stripped and the remaining text is
//!   XML-escaped.
//! - [`SanitizeMode::Ssml`]: a whitelisted subset of SSML elements survives
//!   (with their attributes filtered), everything else is stripped. Input that
//!   is not well-formed fails closed and is re-processed in plain mode.
//!
//! In both modes active content (`<script>`, `<iframe>`, ...) is removed along
//! with everything inside it, whitespace is collapsed, and an input that has
//! nothing left to speak is replaced by [`FILLER_PHRASE`].

use std::borrow::Cow;
use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::document::escape_xml;

/// Spoken when nothing readable survives sanitization.
pub const FILLER_PHRASE: &str = "There is no readable text to speak.";

/// Elements removed together with their content.
const DANGEROUS_ELEMENTS: &[&str] = &[
    "script", "style", "object", "iframe", "embed", "audio", "video", "applet", "frame",
    "frameset", "noscript", "svg", "math", "template",
];

/// Elements whose tags are stripped without inserting a word break.
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "code", "em", "emphasis", "font", "i", "lang", "mark", "phoneme",
    "prosody", "say-as", "small", "span", "strong", "sub", "sup", "u",
];

/// URI schemes that must never reach the engine through an attribute.
const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

static PROSODY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[+-]?\d+(?:\.\d+)?(?:%|st|Hz|dB)?|x-low|low|medium|high|x-high|x-slow|slow|fast|x-fast|silent|x-soft|soft|loud|x-loud|default)$",
    )
    .expect("prosody value pattern")
});

static BREAK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(?:\.\d+)?(?:ms|s)$").expect("break time pattern"));

/// How the input text should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SanitizeMode {
    #[default]
    Plain,
    Ssml,
}

/// Output of [`sanitize`]: an XML-safe fragment ready for [`super::build_ssml`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedText {
    pub content: String,
    /// Mode that actually produced `content`.
    pub mode: SanitizeMode,
    /// SSML input was malformed and was stripped to plain text instead.
    pub fell_back: bool,
    /// Nothing readable survived; `content` is [`FILLER_PHRASE`].
    pub used_filler: bool,
}

/// Structural problems detected in SSML input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("unterminated markup at byte {0}")]
    Unterminated(usize),
    #[error("invalid attribute syntax in <{0}>")]
    InvalidAttribute(String),
    #[error("closing tag </{found}> does not match <{expected}>")]
    Mismatched { expected: String, found: String },
    #[error("unexpected closing tag </{0}>")]
    UnexpectedClose(String),
    #[error("element <{0}> is never closed")]
    Unclosed(String),
}

/// Sanitizes user text into an XML-safe fragment.
pub fn sanitize(input: &str, mode: SanitizeMode) -> SanitizedText {
    let (raw, effective_mode, fell_back) = match mode {
        SanitizeMode::Plain => (strip_markup(input, true), SanitizeMode::Plain, false),
        SanitizeMode::Ssml => match sanitize_ssml(input) {
            Ok(markup) => (markup, SanitizeMode::Ssml, false),
            Err(e) => {
                warn!("Malformed SSML input ({}), falling back to plain text", e);
                (strip_markup(input, true), SanitizeMode::Plain, true)
            }
        },
    };

    let content = collapse_whitespace(&raw);
    if !has_readable_text(&content) {
        debug!("No readable text left after sanitization, using filler phrase");
        return SanitizedText {
            content: FILLER_PHRASE.to_string(),
            mode: effective_mode,
            fell_back,
            used_filler: true,
        };
    }

    SanitizedText {
        content,
        mode: effective_mode,
        fell_back,
        used_filler: false,
    }
}

/// Readable, unescaped text with all markup removed.
///
/// Used before handing text to translation or grammar services, which expect
/// natural language rather than XML.
pub fn plain_text(input: &str) -> String {
    collapse_whitespace(&strip_markup(input, false))
}

fn sanitize_ssml(input: &str) -> Result<String, MarkupError> {
    let mut lexer = Lexer::new(input);
    let mut out = String::with_capacity(input.len());
    let mut open: Vec<OpenElement> = Vec::new();
    let mut skipping: Option<SkippedElement> = None;

    while let Some(token) = lexer.next_token() {
        let token = token?;

        if let Some(skip) = skipping.as_mut() {
            if skip.consume(&token) {
                skipping = None;
            }
            continue;
        }

        match token {
            Token::Text(text) => push_text(&mut out, text, true),
            Token::Cdata(text) => push_text(&mut out, text, false),
            Token::Ignored => {}
            Token::Open {
                name,
                attrs,
                self_closing,
            } => {
                if is_dangerous(&name) {
                    debug!("Removing <{}> element from SSML input", name);
                    if !self_closing {
                        skipping = Some(SkippedElement::new(name));
                    }
                    continue;
                }

                let emitted = match allowed_attributes(&name) {
                    Some(allowed) => {
                        write_open_tag(&mut out, &name, &attrs, allowed, self_closing);
                        true
                    }
                    None => {
                        push_separator(&mut out, &name);
                        false
                    }
                };
                if !self_closing {
                    open.push(OpenElement { name, emitted });
                }
            }
            Token::Close { name } => match open.pop() {
                Some(element) if element.name == name => {
                    if element.emitted {
                        let _ = write!(out, "</{name}>");
                    } else {
                        push_separator(&mut out, &name);
                    }
                }
                Some(element) => {
                    return Err(MarkupError::Mismatched {
                        expected: element.name,
                        found: name,
                    });
                }
                None => return Err(MarkupError::UnexpectedClose(name)),
            },
        }
    }

    if let Some(skip) = skipping {
        return Err(MarkupError::Unclosed(skip.name));
    }
    if let Some(element) = open.pop() {
        return Err(MarkupError::Unclosed(element.name));
    }

    Ok(out)
}

/// Removes every tag. Never fails: a `<` that does not open valid markup is kept as text.
fn strip_markup(input: &str, escape: bool) -> String {
    let mut lexer = Lexer::new(input);
    let mut out = String::with_capacity(input.len());
    let mut skipping: Option<SkippedElement> = None;

    while let Some(token) = lexer.next_token() {
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                debug!("Keeping stray '<' as text: {}", e);
                lexer.skip_stray_lt();
                if skipping.is_none() {
                    out.push_str(if escape { "&lt;" } else { "<" });
                }
                continue;
            }
        };

        if let Some(skip) = skipping.as_mut() {
            if skip.consume(&token) {
                skipping = None;
            }
            continue;
        }

        match token {
            Token::Text(text) => {
                if escape {
                    push_text(&mut out, text, true);
                } else {
                    push_raw(&mut out, &decode_entities(text));
                }
            }
            Token::Cdata(text) => {
                if escape {
                    push_text(&mut out, text, false);
                } else {
                    push_raw(&mut out, text);
                }
            }
            Token::Open {
                name, self_closing, ..
            } => {
                if is_dangerous(&name) {
                    if !self_closing {
                        skipping = Some(SkippedElement::new(name));
                    }
                } else {
                    push_separator(&mut out, &name);
                }
            }
            Token::Close { name } => push_separator(&mut out, &name),
            Token::Ignored => {}
        }
    }

    out
}

fn is_dangerous(name: &str) -> bool {
    DANGEROUS_ELEMENTS.contains(&name)
}

fn allowed_attributes(element: &str) -> Option<&'static [&'static str]> {
    match element {
        "break" => Some(&["time", "strength"]),
        "emphasis" => Some(&["level"]),
        "prosody" => Some(&["pitch", "rate", "volume"]),
        "say-as" => Some(&["interpret-as", "format", "detail"]),
        "sub" => Some(&["alias"]),
        "phoneme" => Some(&["alphabet", "ph"]),
        "lang" => Some(&["xml:lang"]),
        "p" | "s" => Some(&[]),
        _ => None,
    }
}

fn is_valid_attribute_value(attr: &str, value: &str) -> bool {
    match attr {
        "pitch" | "rate" | "volume" => PROSODY_VALUE.is_match(value),
        "time" => BREAK_TIME.is_match(value),
        "strength" => matches!(
            value,
            "none" | "x-weak" | "weak" | "medium" | "strong" | "x-strong"
        ),
        "level" => matches!(value, "strong" | "moderate" | "reduced" | "none"),
        _ => true,
    }
}

fn is_unsafe_uri(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    UNSAFE_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
}

fn write_open_tag(
    out: &mut String,
    name: &str,
    attrs: &[(String, String)],
    allowed: &[&str],
    self_closing: bool,
) {
    out.push('<');
    out.push_str(name);
    for (attr, value) in attrs {
        if attr.starts_with("on") {
            debug!("Dropping event handler attribute {} on <{}>", attr, name);
            continue;
        }
        if !allowed.contains(&attr.as_str()) {
            continue;
        }
        let value = decode_entities(value);
        let value = value.trim();
        if is_unsafe_uri(value) || !is_valid_attribute_value(attr, value) {
            debug!("Dropping attribute {}={:?} on <{}>", attr, value, name);
            continue;
        }
        let _ = write!(out, " {attr}=\"{}\"", escape_xml(value));
    }
    out.push_str(if self_closing { "/>" } else { ">" });
}

fn push_separator(out: &mut String, name: &str) {
    if !INLINE_ELEMENTS.contains(&name) {
        out.push(' ');
    }
}

fn push_text(out: &mut String, text: &str, decode: bool) {
    let text = if decode {
        decode_entities(text)
    } else {
        Cow::Borrowed(text)
    };
    for c in text.chars().filter(|c| is_speakable_char(*c)) {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

fn push_raw(out: &mut String, text: &str) {
    out.extend(text.chars().filter(|c| is_speakable_char(*c)));
}

/// XML 1.0 forbids most control characters.
fn is_speakable_char(c: char) -> bool {
    !c.is_control() || c.is_whitespace()
}

/// Decodes the predefined XML entities and numeric character references.
/// Unknown entities are left untouched.
fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        if let Some(end) = tail.find(';').filter(|end| *end <= 10)
            && let Some(c) = decode_entity(&tail[1..end])
        {
            out.push(c);
            rest = &tail[end + 1..];
            continue;
        }
        out.push('&');
        rest = &tail[1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    let c = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(c)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether any non-whitespace character lies outside of a tag.
fn has_readable_text(fragment: &str) -> bool {
    let mut in_tag = false;
    for c in fragment.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag && !c.is_whitespace() => return true,
            _ => {}
        }
    }
    false
}

struct OpenElement {
    name: String,
    emitted: bool,
}

/// Tracks nesting while the content of a dangerous element is discarded.
struct SkippedElement {
    name: String,
    depth: usize,
}

impl SkippedElement {
    fn new(name: String) -> Self {
        Self { name, depth: 1 }
    }

    /// Returns true once the element's closing tag has been consumed.
    fn consume(&mut self, token: &Token<'_>) -> bool {
        match token {
            Token::Open {
                name,
                self_closing: false,
                ..
            } if *name == self.name => self.depth += 1,
            Token::Close { name } if *name == self.name => self.depth -= 1,
            _ => {}
        }
        self.depth == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Cdata(&'a str),
    Open {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        name: String,
    },
    /// Comments, processing instructions and DOCTYPE declarations.
    Ignored,
}

/// Minimal XML-ish tokenizer. Element and attribute names are lowercased.
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// On error the position is left at the offending `<`.
    fn next_token(&mut self) -> Option<Result<Token<'a>, MarkupError>> {
        if self.pos >= self.input.len() {
            return None;
        }

        let input = self.input;
        if !starts_markup(&input[self.pos..]) {
            let end = self.text_end();
            let text = &input[self.pos..end];
            self.pos = end;
            return Some(Ok(Token::Text(text)));
        }

        Some(self.markup())
    }

    /// Steps over the `<` an error was reported at; the rest is lexed again.
    fn skip_stray_lt(&mut self) {
        self.pos += 1;
    }

    fn text_end(&self) -> usize {
        let bytes = self.input.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() {
            if bytes[i] == b'<' && starts_markup(&self.input[i..]) {
                break;
            }
            i += 1;
        }
        i
    }

    fn markup(&mut self) -> Result<Token<'a>, MarkupError> {
        let input = self.input;
        let start = self.pos;
        let rest = &input[start..];

        if rest.starts_with("<!--") {
            let end = find_from(rest, 4, "-->").ok_or(MarkupError::Unterminated(start))?;
            self.pos = start + end + 3;
            return Ok(Token::Ignored);
        }
        if rest.starts_with("<![CDATA[") {
            let end = find_from(rest, 9, "]]>").ok_or(MarkupError::Unterminated(start))?;
            self.pos = start + end + 3;
            return Ok(Token::Cdata(&rest[9..end]));
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            let end = find_from(rest, 2, ">").ok_or(MarkupError::Unterminated(start))?;
            self.pos = start + end + 1;
            return Ok(Token::Ignored);
        }

        let bytes = input.as_bytes();
        if rest.starts_with("</") {
            let (name, mut i) = self.read_name(start + 2);
            i = skip_whitespace(bytes, i);
            if bytes.get(i) != Some(&b'>') {
                return Err(MarkupError::Unterminated(start));
            }
            self.pos = i + 1;
            return Ok(Token::Close { name });
        }

        let (name, mut i) = self.read_name(start + 1);
        let mut attrs = Vec::new();
        let self_closing = loop {
            i = skip_whitespace(bytes, i);
            match bytes.get(i) {
                None => return Err(MarkupError::Unterminated(start)),
                Some(b'>') => {
                    i += 1;
                    break false;
                }
                Some(b'/') => {
                    if bytes.get(i + 1) == Some(&b'>') {
                        i += 2;
                        break true;
                    }
                    return Err(MarkupError::InvalidAttribute(name));
                }
                Some(_) => {
                    let (attr, next) = self.read_attribute(i, start, &name)?;
                    attrs.push(attr);
                    i = next;
                }
            }
        };

        self.pos = i;
        Ok(Token::Open {
            name,
            attrs,
            self_closing,
        })
    }

    fn read_name(&self, from: usize) -> (String, usize) {
        let bytes = self.input.as_bytes();
        let mut i = from;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_' | b':' | b'.'))
        {
            i += 1;
        }
        (self.input[from..i].to_ascii_lowercase(), i)
    }

    fn read_attribute(
        &self,
        from: usize,
        tag_start: usize,
        element: &str,
    ) -> Result<((String, String), usize), MarkupError> {
        let bytes = self.input.as_bytes();
        let mut i = from;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/' | b'"' | b'\'')
        {
            i += 1;
        }
        if i == from {
            return Err(MarkupError::InvalidAttribute(element.to_string()));
        }
        let attr = self.input[from..i].to_ascii_lowercase();

        i = skip_whitespace(bytes, i);
        if bytes.get(i) != Some(&b'=') {
            return Ok(((attr, String::new()), i));
        }
        i = skip_whitespace(bytes, i + 1);

        let value = match bytes.get(i) {
            None => return Err(MarkupError::Unterminated(tag_start)),
            Some(&quote) if quote == b'"' || quote == b'\'' => {
                let value_start = i + 1;
                let len = self.input[value_start..]
                    .find(quote as char)
                    .ok_or(MarkupError::Unterminated(tag_start))?;
                i = value_start + len + 1;
                &self.input[value_start..value_start + len]
            }
            Some(_) => {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                &self.input[value_start..i]
            }
        };

        Ok(((attr, value.to_string()), i))
    }
}

/// A `<` only opens markup when followed by a name, `/name`, `!` or `?`.
fn starts_markup(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 2 || b[0] != b'<' {
        return false;
    }
    match b[1] {
        b'!' | b'?' => true,
        b'/' => b.get(2).is_some_and(|c| c.is_ascii_alphabetic()),
        c => c.is_ascii_alphabetic(),
    }
}

fn find_from(haystack: &str, from: usize, needle: &str) -> Option<usize> {
    haystack
        .get(from..)
        .and_then(|tail| tail.find(needle))
        .map(|idx| from + idx)
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
