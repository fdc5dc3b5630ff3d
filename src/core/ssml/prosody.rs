//! Pitch and rate adjustments applied to every synthesized document.
//!
//! Both values are expressed as a relative percentage change from the voice's
//! default (`+10%`, `-25%`). Inputs outside `[-50, 50]` are clamped.

/// Lowest accepted pitch/rate adjustment, in percent.
pub const PROSODY_MIN_PERCENT: i32 = -50;
/// Highest accepted pitch/rate adjustment, in percent.
pub const PROSODY_MAX_PERCENT: i32 = 50;

/// Clamped pitch and rate adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Prosody {
    pitch_percent: i32,
    rate_percent: i32,
}

impl Prosody {
    pub fn new(pitch_percent: i64, rate_percent: i64) -> Self {
        Self {
            pitch_percent: clamp_percent(pitch_percent),
            rate_percent: clamp_percent(rate_percent),
        }
    }

    pub fn pitch_percent(&self) -> i32 {
        self.pitch_percent
    }

    pub fn rate_percent(&self) -> i32 {
        self.rate_percent
    }

    /// True when neither pitch nor rate deviates from the voice default.
    pub fn is_neutral(&self) -> bool {
        self.pitch_percent == 0 && self.rate_percent == 0
    }

    /// SSML attribute value for the pitch, e.g. `+10%`.
    pub fn pitch_attr(&self) -> String {
        format!("{:+}%", self.pitch_percent)
    }

    /// SSML attribute value for the rate, e.g. `-20%`.
    pub fn rate_attr(&self) -> String {
        format!("{:+}%", self.rate_percent)
    }

    /// Wraps an SSML fragment in a `<prosody>` element unless neutral.
    pub fn wrap(&self, fragment: &str) -> String {
        if self.is_neutral() {
            return fragment.to_string();
        }
        format!(
            "<prosody pitch=\"{}\" rate=\"{}\">{fragment}</prosody>",
            self.pitch_attr(),
            self.rate_attr()
        )
    }
}

/// Clamps a raw percentage into the accepted prosody range.
pub fn clamp_percent(value: i64) -> i32 {
    value.clamp(PROSODY_MIN_PERCENT as i64, PROSODY_MAX_PERCENT as i64) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(0), 0);
        assert_eq!(clamp_percent(50), 50);
        assert_eq!(clamp_percent(51), 50);
        assert_eq!(clamp_percent(-51), -50);
        assert_eq!(clamp_percent(i64::MAX), 50);
        assert_eq!(clamp_percent(i64::MIN), -50);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        for raw in [-1000_i64, -51, 51, 75, 1000] {
            let prosody = Prosody::new(raw, raw);
            assert!((PROSODY_MIN_PERCENT..=PROSODY_MAX_PERCENT).contains(&prosody.pitch_percent()));
            assert!((PROSODY_MIN_PERCENT..=PROSODY_MAX_PERCENT).contains(&prosody.rate_percent()));
        }
    }

    #[test]
    fn test_attribute_formatting() {
        let prosody = Prosody::new(10, -20);
        assert_eq!(prosody.pitch_attr(), "+10%");
        assert_eq!(prosody.rate_attr(), "-20%");
        assert_eq!(Prosody::new(0, 5).pitch_attr(), "+0%");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(Prosody::default().wrap("Hello"), "Hello");
        assert_eq!(
            Prosody::new(5, 0).wrap("Hello"),
            "<prosody pitch=\"+5%\" rate=\"+0%\">Hello</prosody>"
        );
    }
}
