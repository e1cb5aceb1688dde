use std::{fmt::Display, path::PathBuf};

use miette::miette;

#[derive(Debug)]
pub enum Error {
    /// No page renderer could be reached at startup
    RendererUnavailable,

    /// The media fetcher returned but the expected file is not on disk
    MissingOutput(PathBuf),

    /// The operator closed the input stream
    InputClosed,

    Miette(miette::Report),
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Miette(miette!("{err}"))
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::RendererUnavailable => miette!("No page renderer available"),
            Error::MissingOutput(path) => {
                miette!("Download failed, file not created: {}", path.display())
            }
            Error::InputClosed => miette!("Input closed"),
            Error::Miette(err) => err,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::RendererUnavailable => write!(f, "No page renderer available"),
            Error::MissingOutput(path) => {
                write!(f, "Download failed, file not created: {}", path.display())
            }
            Error::InputClosed => write!(f, "Input closed"),
            // Show the whole chain, the top message alone is often too vague
            Error::Miette(report) => {
                let mut chain = report.chain();
                if let Some(first) = chain.next() {
                    write!(f, "{first}")?;
                }
                for cause in chain {
                    write!(f, ": {cause}")?;
                }
                Ok(())
            }
        }
    }
}

impl Error {
    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }

    /// Render the error on one line, cut to at most `max` characters.
    pub fn truncated(&self, max: usize) -> String {
        truncate(&self.to_string(), max)
    }
}

pub fn bail<T, D>(msg: D) -> Result<T>
where
    D: Display + std::fmt::Debug + Send + Sync + 'static,
{
    Err(Error::Miette(miette!("{msg}")))
}

/// Cut a string to at most `max` characters, never splitting a character.
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        assert_eq!(truncate("ویدیو آپارات", 5), "ویدیو");
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn display_includes_the_cause_chain() {
        let err = Error::Miette(miette!("connection refused").wrap_err("Could not probe video"));
        assert_eq!(err.to_string(), "Could not probe video: connection refused");
    }

    #[test]
    fn wrap_only_touches_reports() {
        let err = Error::InputClosed.wrap_err_with(|| "context");
        assert!(matches!(err, Error::InputClosed));
    }
}
