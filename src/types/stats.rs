use std::time::Instant;

use time::OffsetDateTime;

use super::{QualityTier, VideoLink};

/// A quality choice made by the operator for one item of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRecord {
    /// 1-based position in the harvested list
    pub index: usize,
    pub link: VideoLink,
    pub quality: QualityTier,
    pub format_id: String,
}

/// Aggregate of a download run.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub total: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_size_mb: f64,
    pub started_at: OffsetDateTime,
    started: Instant,
    pub selections: Vec<SelectionRecord>,
}

impl RunStats {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            downloaded: 0,
            failed: 0,
            skipped: 0,
            total_size_mb: 0.0,
            started_at: crate::io::now(),
            started: Instant::now(),
            selections: Vec::new(),
        }
    }

    /// Number of items that reached a final outcome
    pub fn processed(&self) -> usize {
        self.downloaded + self.failed + self.skipped
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Percentage of downloaded items, `None` for an empty run
    pub fn success_rate(&self) -> Option<f64> {
        (self.total > 0).then(|| self.downloaded as f64 / self.total as f64 * 100.0)
    }
}

/// Format a number of seconds as `HH:MM:SS`.
pub fn format_duration(secs: u64) -> String {
    let (hours, rem) = (secs / 3600, secs % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_guards_empty_runs() {
        assert_eq!(RunStats::new(0).success_rate(), None);

        let mut stats = RunStats::new(4);
        stats.downloaded = 1;
        assert_eq!(stats.success_rate(), Some(25.0));
    }

    #[test]
    fn durations_are_zero_padded() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(3 * 3600 + 7 * 60 + 9), "03:07:09");
        assert_eq!(format_duration(100 * 3600), "100:00:00");
    }
}
