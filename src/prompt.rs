use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use owo_colors::OwoColorize;
use url::Url;

use crate::{
    result::{Error, Result},
    types::Platform,
};

/// Print the prompt and read one trimmed line. End of input is [`Error::InputClosed`].
pub fn ask<R, W>(input: &mut R, output: &mut W, prompt: &str) -> Result<String>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    write!(output, "{prompt}")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(Error::InputClosed);
    }
    Ok(line.trim().to_owned())
}

/// Parse a listing page URL, only accepting web pages of the platform
pub fn parse_listing(text: &str, platform: &Platform) -> Option<Url> {
    let text = text.trim();
    if text.is_empty() || !text.contains(&platform.domain) {
        return None;
    }

    Url::parse(text)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Ask for the listing page until a usable URL is given
pub fn ask_listing_url<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    platform: &Platform,
) -> Result<Url> {
    loop {
        let line = ask(input, output, "\nEnter playlist URL: ")?;
        if line.is_empty() {
            writeln!(output, "{}", "URL cannot be empty!".red())?;
            continue;
        }
        match parse_listing(&line, platform) {
            Some(url) => return Ok(url),
            None => writeln!(
                output,
                "{}",
                format!("Please enter a valid {} URL!", platform.domain).red()
            )?,
        }
    }
}

/// Ask where to save the videos, an empty answer keeps the default
pub fn ask_download_dir<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    default: &Path,
) -> Result<PathBuf> {
    let line = ask(
        input,
        output,
        &format!("\nDownload folder (default: {}): ", default.display()),
    )?;

    Ok(if line.is_empty() {
        default.to_path_buf()
    } else {
        PathBuf::from(line)
    })
}

/// Last chance to back out before downloading
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, count: usize) -> Result<bool> {
    let line = ask(input, output, &format!("\nDownload {count} videos? (y/n): "))?;
    Ok(matches!(line.to_lowercase().as_str(), "y" | "yes"))
}
