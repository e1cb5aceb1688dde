use std::path::PathBuf;

use clap::{ArgAction, Parser};

macro_rules! arg_env {
    ($v:literal) => {
        concat!("PLGRAB_", $v)
    };
}

/// Harvest the video links of a playlist page, then download every video
/// in the quality picked for it.
///
/// Pages are rendered through a WebDriver endpoint when one is reachable
/// (e.g. a running `chromedriver`), otherwise fetched as static HTML.
/// Videos are downloaded with `yt-dlp`.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// The playlist page URL. Asked interactively when missing
    #[arg(long, env = arg_env!("URL"))]
    pub url: Option<String>,

    /// The download root directory. Asked interactively when missing
    #[arg(long, env = arg_env!("OUT"))]
    pub out: Option<PathBuf>,

    /// Start downloading without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// The path to the configuration file. A missing file is not an error
    #[arg(long, default_value = "plgrab.toml", env = arg_env!("CONFIG"))]
    pub config: PathBuf,

    /// The WebDriver endpoint used to render pages
    #[arg(long, env = arg_env!("WEBDRIVER"))]
    pub webdriver: Option<String>,

    /// Do not pause between two downloads
    #[arg(long)]
    pub no_pacing: bool,

    /// Increase the log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
