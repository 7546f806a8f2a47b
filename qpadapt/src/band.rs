/// Requested bitrates at or below this are [`Band::Low`].
pub const MEDIUM_CUTOVER: u32 = 2_000_000;
/// Requested bitrates above this are [`Band::High`].
pub const HIGH_CUTOVER: u32 = 2_500_000;

/// Classification of the *requested* bitrate. Unrelated to the watermark
/// zones the adaptive state uses for the *produced* bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Band {
    Low,
    Medium,
    High,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Low, Band::Medium, Band::High];

    pub fn name(self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Medium => "medium",
            Band::High => "high",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub fn classify(bitrate: u32) -> Band {
    if bitrate <= MEDIUM_CUTOVER {
        Band::Low
    } else if bitrate <= HIGH_CUTOVER {
        Band::Medium
    } else {
        Band::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_band_includes_cutover() {
        assert_eq!(classify(0), Band::Low);
        assert_eq!(classify(800_000), Band::Low);
        assert_eq!(classify(MEDIUM_CUTOVER), Band::Low);
    }

    #[test]
    fn medium_band_is_half_open() {
        assert_eq!(classify(MEDIUM_CUTOVER + 1), Band::Medium);
        assert_eq!(classify(HIGH_CUTOVER), Band::Medium);
    }

    #[test]
    fn high_band_above_cutover() {
        assert_eq!(classify(HIGH_CUTOVER + 1), Band::High);
        assert_eq!(classify(3_000_000), Band::High);
        assert_eq!(classify(u32::MAX), Band::High);
    }

    #[test]
    fn classification_is_deterministic() {
        for bitrate in (0..6_000_000).step_by(250_000) {
            assert_eq!(classify(bitrate), classify(bitrate));
        }
    }

    #[test]
    fn display_uses_lowercase_names() {
        assert_eq!(Band::Medium.to_string(), "medium");
    }
}
