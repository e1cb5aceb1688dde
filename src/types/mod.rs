mod format;
mod link;
mod platform;
mod quality;
mod stats;

#[cfg(test)]
pub use format::RawFormat;
pub use format::{
    truncate_title, FormatCatalog, FormatOption, VideoMetadata, TITLE_MAX_CHARS, UNKNOWN_TITLE,
};
pub use link::{LinkSet, VideoLink};
pub use platform::Platform;
pub use quality::QualityTier;
pub use stats::{format_duration, RunStats, SelectionRecord};
