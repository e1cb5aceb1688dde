use std::fmt::Display;

/// Discrete quality label derived from the vertical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Uhd4k,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    P240,
    P144,
    /// Below the lowest tier, keeps the raw height
    Other(u32),
    Unknown,
}

impl QualityTier {
    pub fn from_height(height: u32) -> Self {
        match height {
            2160.. => Self::Uhd4k,
            1440.. => Self::P1440,
            1080.. => Self::P1080,
            720.. => Self::P720,
            480.. => Self::P480,
            360.. => Self::P360,
            240.. => Self::P240,
            144.. => Self::P144,
            0 => Self::Unknown,
            h => Self::Other(h),
        }
    }
}

impl Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Uhd4k => "4K",
            Self::P1440 => "1440p",
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::P360 => "360p",
            Self::P240 => "240p",
            Self::P144 => "144p",
            Self::Other(h) => return write!(f, "{h}p"),
            Self::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_the_height_thresholds() {
        let heights = [2160, 1440, 1080, 720, 480, 360, 240, 144, 100, 0];
        let expected = [
            "4K", "1440p", "1080p", "720p", "480p", "360p", "240p", "144p", "100p", "Unknown",
        ];

        for (height, label) in heights.into_iter().zip(expected) {
            assert_eq!(QualityTier::from_height(height).to_string(), label);
        }
    }

    #[test]
    fn in_between_heights_round_down() {
        assert_eq!(QualityTier::from_height(4320), QualityTier::Uhd4k);
        assert_eq!(QualityTier::from_height(1079), QualityTier::P720);
        assert_eq!(QualityTier::from_height(143), QualityTier::Other(143));
    }
}
