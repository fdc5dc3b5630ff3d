/// Parse an on/off request flag sent as text.
///
/// Case-insensitive and whitespace-tolerant. HTML checkboxes submit `on`.
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
