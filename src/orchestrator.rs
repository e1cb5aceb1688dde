use std::{
    fmt,
    io::{BufRead, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use owo_colors::OwoColorize;
use tracing::{error, info, warn};

use crate::{
    catalog::CatalogBuilder,
    io::{append_to, file_size_mb, format_time, now, video_file_name, LOG_TIME},
    outside::{FetchRequest, MediaFetcher, Progress, ProgressStatus},
    result::{Error, Result},
    selector::{Selection, Selector},
    types::{FormatOption, LinkSet, RunStats, SelectionRecord, VideoLink},
};

pub const DOWNLOAD_LOG: &str = "download_log.txt";
pub const ERROR_LOG: &str = "errors.txt";

/// Knobs of the download loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Pause after each successful download
    pub pacing: Duration,
    pub retries: u32,
    pub fragment_retries: u32,
}

/// A video that made it to disk
#[derive(Debug)]
struct Downloaded {
    title: String,
    size_mb: f64,
    elapsed: Duration,
}

/// Whether the loop goes on after an item
enum Flow {
    Continue,
    Stop,
}

/// Drives the run: for every link, list its formats, ask which one to take,
/// download it and check the result. One video at a time, in harvest order.
pub struct Orchestrator<'a, R, W> {
    catalog: &'a CatalogBuilder<'a>,
    fetcher: &'a dyn MediaFetcher,
    selector: Selector<R, W>,
    dir: PathBuf,
    options: DownloadOptions,
}

impl<'a, R: BufRead, W: Write> Orchestrator<'a, R, W> {
    pub fn new(
        catalog: &'a CatalogBuilder<'a>,
        fetcher: &'a dyn MediaFetcher,
        selector: Selector<R, W>,
        dir: &Path,
        options: DownloadOptions,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            selector,
            dir: dir.to_path_buf(),
            options,
        }
    }

    /// Print a line for the operator. The console is display only, a failed
    /// write is logged and the run goes on.
    fn say(&mut self, line: fmt::Arguments<'_>) {
        if let Err(err) = writeln!(self.selector.output(), "{line}") {
            warn!("Could not write to the console: {err}");
        }
    }

    /// Process every link and return the run statistics.
    ///
    /// A failed item never stops the run. Only the operator quitting, or a
    /// prompt that cannot be shown, does. The statistics then cover the items
    /// processed so far.
    pub fn run(&mut self, links: LinkSet) -> RunStats {
        let total = links.len();
        let mut stats = RunStats::new(total);

        self.say(format_args!("\nStarting download of {total} videos..."));
        self.say(format_args!("{}", "=".repeat(60)));

        for (i, link) in links.into_iter().enumerate() {
            let index = i + 1;
            if let Flow::Stop = self.process(index, total, &link, &mut stats) {
                info!("Run stopped after {} items", stats.processed());
                break;
            }
        }

        stats
    }

    fn process(
        &mut self,
        index: usize,
        total: usize,
        link: &VideoLink,
        stats: &mut RunStats,
    ) -> Flow {
        self.say(format_args!("\n\nProcessing video {index} of {total}"));

        let catalog = self.catalog.build(link);
        let format = match self.selector.select(&catalog, index, total, self.catalog) {
            Ok(Selection::Selected(format)) => format,
            Ok(Selection::Skipped) => {
                info!("Video {index} skipped");
                stats.skipped += 1;
                return Flow::Continue;
            }
            Ok(Selection::Exited) => {
                self.say(format_args!("Exiting program"));
                return Flow::Stop;
            }
            // Without a working prompt nothing more can be chosen
            Err(err) => {
                error!("Selection for video {index} failed: {}", err.truncated(200));
                return Flow::Stop;
            }
        };

        // Recorded before downloading, failed downloads are part of the report too
        stats.selections.push(SelectionRecord {
            index,
            link: link.clone(),
            quality: format.quality,
            format_id: format.format_id.clone(),
        });

        match self.download(index, total, link, &format) {
            Ok(done) => {
                stats.downloaded += 1;
                stats.total_size_mb += done.size_mb;

                self.say(format_args!(
                    "\n{} in {:.1} seconds",
                    "Download completed".green(),
                    done.elapsed.as_secs_f64()
                ));
                self.say(format_args!("File size: {:.2} MB", done.size_mb));
                self.log_success(index, link, &format, &done);

                if index < total && !self.options.pacing.is_zero() {
                    self.say(format_args!("\nWaiting before next video..."));
                    thread::sleep(self.options.pacing);
                }
            }
            Err(err) => {
                stats.failed += 1;
                error!("Video {index} failed: {}", err.truncated(200));
                self.say(format_args!(
                    "{} {}",
                    "Error downloading video:".red(),
                    err.truncated(200)
                ));
                self.log_failure(index, link, &err);
            }
        }

        Flow::Continue
    }

    /// Fetch the video and make sure the file landed on disk.
    fn download(
        &mut self,
        index: usize,
        total: usize,
        link: &VideoLink,
        format: &FormatOption,
    ) -> Result<Downloaded> {
        // Asked again on purpose, the names used on disk come from this answer
        let meta = self
            .fetcher
            .probe(link.as_str())
            .map_err(|err| err.wrap_err_with(|| "Could not get video info"))?;
        let title = meta.title.unwrap_or_else(|| format!("Video_{index}"));
        let id = meta.id.unwrap_or_else(|| index.to_string());

        let file_name = video_file_name(index, &id, &title);
        let path = self.dir.join(&file_name);

        self.say(format_args!("\nDownloading video {index}/{total}"));
        self.say(format_args!("Title: {title}"));
        self.say(format_args!("Quality: {}", format.quality));
        self.say(format_args!("Saving as: {file_name}"));

        let request = FetchRequest {
            url: link.as_str(),
            format_id: &format.format_id,
            destination: &path,
            retries: self.options.retries,
            fragment_retries: self.options.fragment_retries,
        };

        let fetcher = self.fetcher;
        let out = self.selector.output();
        let started = Instant::now();
        let mut show_progress = |p: &Progress| {
            // Display only, a broken console must not fail the download
            let _ = match p.status {
                ProgressStatus::Downloading => write!(
                    out,
                    "\rVideo {index}: {:.1}% | Speed: {} | ETA: {}",
                    p.percent,
                    p.speed.as_deref().unwrap_or("N/A"),
                    p.eta.as_deref().unwrap_or("N/A")
                ),
                ProgressStatus::Finished => {
                    writeln!(out, "\rVideo {index}: Download completed!{}", " ".repeat(50))
                }
            };
            let _ = out.flush();
        };
        fetcher.fetch(&request, &mut show_progress)?;
        let elapsed = started.elapsed();

        if !path.exists() {
            return Err(Error::MissingOutput(path));
        }
        let size_mb = file_size_mb(&path)?;

        info!("Video {index} saved to {}", path.display());
        Ok(Downloaded {
            title,
            size_mb,
            elapsed,
        })
    }

    fn log_success(&self, index: usize, link: &VideoLink, format: &FormatOption, done: &Downloaded) {
        let line = format!(
            "[{}] Video {index}: {} | Quality: {} | Size: {:.2} MB | URL: {link}\n",
            format_time(now(), LOG_TIME),
            done.title,
            format.quality,
            done.size_mb,
        );
        if let Err(err) = append_to(&self.dir.join(DOWNLOAD_LOG), &line) {
            warn!("Could not write the download log: {err}");
        }
    }

    fn log_failure(&self, index: usize, link: &VideoLink, err: &Error) {
        let block = format!(
            "[{}] Video {index}: {link}\nError: {err}\n\n",
            format_time(now(), LOG_TIME),
        );
        if let Err(err) = append_to(&self.dir.join(ERROR_LOG), &block) {
            warn!("Could not write the error log: {err}");
        }
    }
}
