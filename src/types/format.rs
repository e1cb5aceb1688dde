use std::fmt::Display;

use serde::Deserialize;

use super::{QualityTier, VideoLink};

/// Maximum number of characters kept from a video title
pub const TITLE_MAX_CHARS: usize = 100;

/// Title used when no metadata source could provide one
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// One format entry as described by the media fetcher.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawFormat {
    #[serde(default = "unknown_id")]
    pub format_id: String,
    #[serde(default = "unknown_ext")]
    pub ext: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
    pub filesize: Option<u64>,
    /// `"none"` when the entry carries no video stream
    pub vcodec: Option<String>,
    pub format_note: Option<String>,
}

fn unknown_id() -> String {
    "N/A".to_owned()
}

fn unknown_ext() -> String {
    "unknown".to_owned()
}

impl RawFormat {
    pub fn has_video(&self) -> bool {
        self.vcodec.as_deref() != Some("none")
    }
}

/// Descriptive metadata of a video, without any media bytes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub id: Option<String>,
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub formats: Vec<RawFormat>,
}

/// Size of a format in MB, when the source knows it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileSize {
    Mb(f64),
    Unknown,
}

impl FileSize {
    pub fn from_bytes(bytes: Option<u64>) -> Self {
        match bytes {
            Some(bytes) if bytes > 0 => {
                let mb = bytes as f64 / (1024.0 * 1024.0);
                Self::Mb((mb * 100.0).round() / 100.0)
            }
            _ => Self::Unknown,
        }
    }
}

impl Display for FileSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Respect the caller precision, e.g. `{:.1}` in the format table
            FileSize::Mb(mb) => match f.precision() {
                Some(p) => write!(f, "{mb:.p$} MB"),
                None => write!(f, "{mb} MB"),
            },
            FileSize::Unknown => f.write_str("Unknown"),
        }
    }
}

/// One deliverable encoding of a video.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatOption {
    pub format_id: String,
    pub ext: String,
    pub quality: QualityTier,
    pub width: u32,
    pub height: u32,
    /// 0 when unknown
    pub fps: f64,
    pub size: FileSize,
    pub note: String,
}

impl From<&RawFormat> for FormatOption {
    fn from(raw: &RawFormat) -> Self {
        let height = raw.height.unwrap_or(0);

        Self {
            format_id: raw.format_id.clone(),
            ext: raw.ext.clone(),
            quality: QualityTier::from_height(height),
            width: raw.width.unwrap_or(0),
            height,
            fps: raw.fps.filter(|fps| *fps > 0.0).unwrap_or(0.0),
            size: FileSize::from_bytes(raw.filesize),
            note: raw.format_note.clone().unwrap_or_default(),
        }
    }
}

impl FormatOption {
    /// `WxH`, or `N/A` when a dimension is missing
    pub fn resolution(&self) -> String {
        if self.width > 0 && self.height > 0 {
            format!("{}x{}", self.width, self.height)
        } else {
            "N/A".to_owned()
        }
    }

    pub fn fps_label(&self) -> String {
        if self.fps > 0.0 {
            self.fps.to_string()
        } else {
            "N/A".to_owned()
        }
    }
}

/// The quality-ranked formats of a single video.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCatalog {
    pub title: String,
    pub link: VideoLink,
    /// Sorted by height, highest first
    pub formats: Vec<FormatOption>,
}

impl FormatCatalog {
    /// Build a catalog out of the raw formats, keeping only the video ones.
    pub fn new(title: &str, link: VideoLink, raw: &[RawFormat]) -> Self {
        let mut formats: Vec<FormatOption> = raw
            .iter()
            .filter(|f| f.has_video())
            .map(FormatOption::from)
            .collect();

        // Stable, entries of the same height keep the source order
        formats.sort_by(|a, b| b.height.cmp(&a.height));

        Self {
            title: truncate_title(title),
            link,
            formats,
        }
    }

    pub fn empty(title: &str, link: VideoLink) -> Self {
        Self::new(title, link, &[])
    }

    pub fn best(&self) -> Option<&FormatOption> {
        self.formats.first()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

pub fn truncate_title(title: &str) -> String {
    title.chars().take(TITLE_MAX_CHARS).collect()
}
