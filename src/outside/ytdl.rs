use std::{ffi::OsStr, path::Path, sync::OnceLock};

use miette::{IntoDiagnostic, WrapErr};
use regex::Regex;

use super::command::{assert_success_command, run_command, run_streaming, Capture, Pipe, YT_DL, YT_DLP};
use crate::{
    result::{bail, Result},
    types::VideoMetadata,
};

/// What to download and where.
#[derive(Debug, Clone)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub format_id: &'a str,
    pub destination: &'a Path,
    /// Attempts the fetcher makes on its own for network errors
    pub retries: u32,
    /// Same, for every fragment of a segmented stream
    pub fragment_retries: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Downloading,
    Finished,
}

/// A progress notification, only meant to be displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub status: ProgressStatus,
    pub percent: f64,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// Interface for querying video metadata and downloading media streams
pub trait MediaFetcher {
    /// Get the video metadata and available formats, without downloading any media.
    fn probe(&self, url: &str) -> Result<VideoMetadata>;

    /// Download the video in the requested format.
    ///
    /// Transient network and fragment errors are retried internally.
    /// `progress` may be called any number of times, it has no influence on the download.
    fn fetch(&self, request: &FetchRequest<'_>, progress: &mut dyn FnMut(&Progress))
        -> Result<()>;
}

/// Interface for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program
#[derive(Debug)]
pub struct Ytdl {
    program: &'static str,
}

impl Ytdl {
    /// Verify that the `yt-dlp` or `youtube-dl` binaries are reachable
    pub fn new() -> Result<Self> {
        // Check `yt-dlp`
        if assert_success_command(YT_DLP, |cmd| cmd.arg("--version")).is_ok() {
            Ok(Self { program: YT_DLP })
        } else if assert_success_command(YT_DL, |cmd| cmd.arg("--version")).is_ok() {
            // Check `youtube-dl`
            Ok(Self { program: YT_DL })
        } else {
            bail("Neither yt-dlp nor youtube-dl found")
        }
    }

    pub fn program(&self) -> &'static str {
        self.program
    }
}

impl MediaFetcher for Ytdl {
    fn probe(&self, url: &str) -> Result<VideoMetadata> {
        let res = run_command(
            self.program,
            |cmd| {
                cmd.arg("-J")
                    .arg("--no-warnings")
                    .arg("--no-playlist")
                    .arg("--")
                    .arg(url)
            },
            Capture::STDOUT | Capture::STDERR,
        )?;

        let stderr = String::from_utf8_lossy(&res.stderr);
        check_exit(res.status.success(), &stderr, "Metadata query was not successful")?;

        let metadata = serde_json::from_slice::<VideoMetadata>(&res.stdout)
            .into_diagnostic()
            .wrap_err("Could not parse metadata JSON")?;
        Ok(metadata)
    }

    fn fetch(
        &self,
        request: &FetchRequest<'_>,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<()> {
        let (status, stderr) = run_streaming(
            self.program,
            |cmd| {
                cmd.args([OsStr::new("-o"), request.destination.as_os_str()])
                    .args(["-f", request.format_id])
                    .arg("--no-overwrites")
                    .arg("--no-playlist")
                    .args(["--retries", &request.retries.to_string()])
                    .args(["--fragment-retries", &request.fragment_retries.to_string()])
                    .arg("--newline")
                    .arg("--")
                    .arg(request.url)
            },
            |pipe, line| {
                if pipe == Pipe::Stdout {
                    if let Some(p) = parse_progress(line) {
                        progress(&p);
                    }
                }
            },
        )?;

        check_exit(status.success(), &stderr, "Download was not successful")
    }
}

/// Turn a failed run into an error carrying the last `ERROR:` line yt-dlp printed.
fn check_exit(success: bool, stderr: &str, fallback: &str) -> Result<()> {
    if success {
        return Ok(());
    }
    bail(last_error_line(stderr).unwrap_or(fallback).to_owned())
}

fn last_error_line(stderr: &str) -> Option<&str> {
    stderr.lines().rev().find(|line| line.starts_with("ERROR:"))
}

/// Parse a `[download]` progress line.
///
/// `[download]  45.0% of 10.00MiB at  2.00MiB/s ETA 00:05`
/// `[download] 100% of 10.00MiB in 00:03`
pub fn parse_progress(line: &str) -> Option<Progress> {
    static PROGRESS: OnceLock<Regex> = OnceLock::new();
    let re = PROGRESS.get_or_init(|| {
        Regex::new(
            r"^\[download\]\s+(?P<pct>\d+(?:\.\d+)?)%\s+of\s+~?\s*\S+(?:\s+at\s+(?P<speed>\S+))?(?:\s+ETA\s+(?P<eta>\S+))?(?P<done>\s+in\s+\S+)?",
        )
        .unwrap()
    });

    let caps = re.captures(line.trim())?;
    let percent = caps.name("pct")?.as_str().parse().ok()?;
    let status = if caps.name("done").is_some() {
        ProgressStatus::Finished
    } else {
        ProgressStatus::Downloading
    };

    Some(Progress {
        status,
        percent,
        speed: caps.name("speed").map(|m| m.as_str().to_owned()),
        eta: caps.name("eta").map(|m| m.as_str().to_owned()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_running_progress() {
        let p = parse_progress("[download]  45.0% of 10.00MiB at  2.00MiB/s ETA 00:05").unwrap();
        assert_eq!(p.status, ProgressStatus::Downloading);
        assert_eq!(p.percent, 45.0);
        assert_eq!(p.speed.as_deref(), Some("2.00MiB/s"));
        assert_eq!(p.eta.as_deref(), Some("00:05"));
    }

    #[test]
    fn parses_estimated_sizes() {
        let p = parse_progress("[download]   3.1% of ~ 250.32MiB at 1.2MiB/s ETA 03:10 (frag 2/64)")
            .unwrap();
        assert_eq!(p.percent, 3.1);
        assert_eq!(p.eta.as_deref(), Some("03:10"));
    }

    #[test]
    fn parses_finished_progress() {
        let p = parse_progress("[download] 100% of 10.00MiB in 00:03").unwrap();
        assert_eq!(p.status, ProgressStatus::Finished);
        assert_eq!(p.percent, 100.0);
        assert!(p.speed.is_none());
    }

    #[test]
    fn ignores_other_lines() {
        assert!(parse_progress("[info] 12345: Downloading 1 format(s): 720p").is_none());
        assert!(parse_progress("[download] Destination: 001_abc_title.mp4").is_none());
        assert!(parse_progress("").is_none());
    }

    #[test]
    fn failed_runs_keep_the_error_text() {
        let stderr = "WARNING: retrying\nERROR: [aparat] abc: Unable to download webpage: HTTP Error 503: Service Unavailable\n";
        let err = check_exit(false, stderr, "Download was not successful").unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERROR: [aparat] abc: Unable to download webpage: HTTP Error 503: Service Unavailable"
        );

        let err = check_exit(false, "ERROR: [aparat] abc: Video unavailable\n", "x").unwrap_err();
        assert!(err.to_string().contains("Video unavailable"));

        let err = check_exit(false, "", "Download was not successful").unwrap_err();
        assert_eq!(err.to_string(), "Download was not successful");
        assert!(check_exit(true, stderr, "x").is_ok());
    }

    #[test]
    fn last_error_line_wins() {
        assert_eq!(
            last_error_line("ERROR: first\nsomething\nERROR: last\n"),
            Some("ERROR: last")
        );
    }

    #[test]
    fn metadata_json_is_deserialized() {
        let json = indoc::indoc! {r#"
            {
                "id": "aBc12",
                "title": "A video",
                "webpage_url": "https://www.aparat.com/v/aBc12",
                "formats": [
                    {"format_id": "hls-270", "ext": "mp4", "height": 270, "width": 480, "vcodec": "avc1", "fps": null},
                    {"format_id": "audio", "ext": "m4a", "vcodec": "none", "filesize": 1000}
                ]
            }
        "#};

        let meta: VideoMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.id.as_deref(), Some("aBc12"));
        assert_eq!(meta.formats.len(), 2);
        assert_eq!(meta.formats[0].height, Some(270));
        assert!(meta.formats[0].has_video());
        assert!(!meta.formats[1].has_video());
    }
}
