mod catalog;
mod cli;
mod config;
mod harvester;
mod io;
mod logging;
mod orchestrator;
mod outside;
mod prompt;
mod reporter;
mod result;
mod scanner;
mod selector;
mod types;

use std::{io::Write, process::ExitCode};

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use owo_colors::OwoColorize;
use tracing::info;
use url::Url;

use crate::{
    catalog::CatalogBuilder,
    cli::Args,
    config::Settings,
    harvester::Harvester,
    logging::{init_logging, level_from_verbosity},
    orchestrator::{DownloadOptions, Orchestrator},
    outside::{load_renderer, HttpFetcher, RenderPlan, Ytdl},
    result::{bail, Error, Result},
    scanner::Scanner,
    selector::Selector,
};

fn main() -> miette::Result<ExitCode> {
    let args = Args::parse();

    // Resolve the local offset while the process is still single-threaded
    io::local_offset();
    init_logging(level_from_verbosity(args.verbose, args.quiet))?;
    let settings = Settings::load(&args)?;

    match run(&args, &settings) {
        Ok(code) => Ok(code),
        Err(Error::InputClosed) => {
            info!("Input closed, nothing left to do");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Err(err.into()),
    }
}

fn run(args: &Args, settings: &Settings) -> Result<ExitCode> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut out = std::io::stdout();

    writeln!(out, "\n{}", "Playlist Video Downloader".bold())?;
    writeln!(out, "{}", "=".repeat(60))?;

    // External components
    writeln!(out, "Checking dependencies...")?;
    let ytdl = Ytdl::new().map_err(|err| err.wrap_err_with(|| "A media downloader is required"))?;
    writeln!(out, "{} {} found", "✓".green(), ytdl.program())?;

    let renderer = load_renderer(&settings.renderer, &settings.http);
    if renderer.is_available() {
        writeln!(
            out,
            "{} WebDriver reachable at {}",
            "✓".green(),
            settings.renderer.webdriver
        )?;
    } else {
        writeln!(
            out,
            "{} No WebDriver at {}, pages will be read without JavaScript",
            "!".yellow(),
            settings.renderer.webdriver
        )?;
    }
    let http = HttpFetcher::new(&settings.http)?;
    let scanner = Scanner::new(settings.platform.clone());

    // Discovery
    let listing = match &args.url {
        Some(url) => listing_from_flag(url, settings)?,
        None => prompt::ask_listing_url(&mut input, &mut out, &settings.platform)?,
    };

    writeln!(out, "\nScanning {listing} for videos...")?;
    let plan = RenderPlan {
        settle: settings.renderer.settle(),
        max_scrolls: settings.renderer.max_scrolls,
        scroll_wait: settings.renderer.scroll_wait(),
    };
    let links = Harvester::new(renderer.as_ref(), &http, &scanner, plan).harvest(&listing);

    if links.is_empty() {
        writeln!(out, "{}", "No video links found!".red())?;
        writeln!(out, "Possible reasons:")?;
        writeln!(out, "1. The page needs JavaScript and no WebDriver is running")?;
        writeln!(out, "2. The URL is not a playlist or channel page")?;
        writeln!(out, "3. The website structure has changed")?;
        return Ok(ExitCode::FAILURE);
    }

    writeln!(out, "\nFound {} videos", links.len().green())?;
    for (i, link) in links.iter().take(5).enumerate() {
        writeln!(out, "  {}. {link}", i + 1)?;
    }
    if links.len() > 5 {
        writeln!(out, "  ... and {} more", links.len() - 5)?;
    }

    std::fs::create_dir_all(&settings.links_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not create {}", settings.links_dir.display()))?;
    let list = io::write_link_list(&settings.links_dir, listing.as_str(), &links)?;
    writeln!(out, "Links saved to: {}", list.display())?;

    // Operator setup
    let root = match &args.out {
        Some(dir) => dir.clone(),
        None => prompt::ask_download_dir(&mut input, &mut out, &settings.download_dir)?,
    };
    if !args.yes && !prompt::confirm(&mut input, &mut out, links.len())? {
        writeln!(out, "Download cancelled")?;
        return Ok(ExitCode::SUCCESS);
    }

    let dir = io::create_playlist_dir(&root)?;
    writeln!(out, "\nVideos will be saved to: {}", dir.display())?;
    info!("Downloading {} videos to {}", links.len(), dir.display());

    // Downloads
    let catalog = CatalogBuilder::new(&ytdl, renderer.as_ref(), settings.renderer.settle());
    let options = DownloadOptions {
        pacing: settings.pacing(),
        retries: settings.retries,
        fragment_retries: settings.fragment_retries,
    };
    let selector = Selector::new(&mut input, &mut out);
    let stats = Orchestrator::new(&catalog, &ytdl, selector, &dir, options).run(links);

    reporter::report(&stats, &dir, &mut out)?;
    let absolute = std::fs::canonicalize(&dir).unwrap_or(dir);
    writeln!(out, "\nAll files saved in: {}", absolute.display())?;

    Ok(ExitCode::SUCCESS)
}

fn listing_from_flag(url: &str, settings: &Settings) -> Result<Url> {
    match prompt::parse_listing(url, &settings.platform) {
        Some(url) => Ok(url),
        None => bail(format!(
            "Not a {} page URL: {url}",
            settings.platform.domain
        )),
    }
}
