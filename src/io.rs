use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use miette::{Context, IntoDiagnostic, Result};
use regex::Regex;
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};

use crate::types::{LinkSet, TITLE_MAX_CHARS};

/// `2024-05-01 13:37:00`, used inside the report files
pub const LOG_TIME: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// `20240501_133700`, used in file and folder names
pub const STAMP_TIME: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// The local UTC offset.
///
/// It can only be read reliably while the process is single-threaded,
/// so the first call must happen at startup. Falls back to UTC.
pub fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

pub fn format_time(t: OffsetDateTime, format: &[FormatItem<'_>]) -> String {
    // The descriptions above only use components any date has
    t.format(format).unwrap_or_default()
}

/// Append text to a file, creating it if needed.
///
/// The file is closed before returning so that no entry is lost
/// if the program stops afterwards.
pub fn append_to(path: &Path, text: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not open {}", path.display()))?;

    file.write_all(text.as_bytes())
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not write to {}", path.display()))
}

/// Write the harvested links in `dir`, in a new timestamped file.
/// Return the path of the written file.
pub fn write_link_list(dir: &Path, listing: &str, links: &LinkSet) -> Result<PathBuf> {
    let now = now();
    let path = dir.join(format!(
        "video_links_{}.txt",
        format_time(now, STAMP_TIME)
    ));

    let mut content = String::new();
    content.push_str(&format!("Playlist: {listing}\n"));
    content.push_str(&format!("Date: {}\n", format_time(now, LOG_TIME)));
    content.push_str(&format!("Total links: {}\n\n", links.len()));
    for (i, link) in links.iter().enumerate() {
        content.push_str(&format!("{}. {link}\n", i + 1));
    }

    std::fs::write(&path, content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not write {}", path.display()))?;

    Ok(path)
}

/// Create the timestamped folder receiving one run's videos and reports.
pub fn create_playlist_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(format!("Playlist_{}", format_time(now(), STAMP_TIME)));
    std::fs::create_dir_all(&dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not create {}", dir.display()))?;
    Ok(dir)
}

/// Replace the characters unsafe in a file name and cut the title.
pub fn sanitize_title(title: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^\w\-_. ]").unwrap());

    re.replace_all(title, "_")
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

/// File name of a downloaded video: `<index>_<id>_<title>.mp4`
pub fn video_file_name(index: usize, id: &str, title: &str) -> String {
    format!("{index:03}_{id}_{}.mp4", sanitize_title(title))
}

/// Size of the file in MB
pub fn file_size_mb(path: &Path) -> Result<f64> {
    let meta = std::fs::metadata(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not read metadata of {}", path.display()))?;
    Ok(meta.len() as f64 / (1024.0 * 1024.0))
}
