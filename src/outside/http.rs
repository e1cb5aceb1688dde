use miette::{IntoDiagnostic, WrapErr};
use reqwest::{
    blocking::Client,
    header::{self, HeaderMap, HeaderValue},
};
use tracing::debug;

use crate::{config::HttpSettings, result::Result};

/// Interface for fetching the raw HTML of a page, without running its scripts
pub trait StaticFetcher {
    /// GET the page. Non-2xx statuses and timeouts are errors.
    fn get(&self, url: &str) -> Result<String>;
}

/// Plain HTTP client presenting itself as a desktop browser
#[derive(Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(browser_headers())
            .timeout(settings.timeout())
            .gzip(true)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build HTTP client")?;

        Ok(Self { client })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

impl StaticFetcher for HttpFetcher {
    fn get(&self, url: &str) -> Result<String> {
        debug!("GET {url}");
        let res = self
            .client
            .get(url)
            .send()
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not load {url}"))?
            .error_for_status()
            .into_diagnostic()?;

        Ok(res
            .text()
            .into_diagnostic()
            .wrap_err("Could not read page body")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_look_like_a_browser() {
        let headers = browser_headers();
        assert!(headers
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html")));
        assert!(headers.contains_key(header::ACCEPT_LANGUAGE));
    }

    #[test]
    fn unreachable_host_is_an_error() {
        let fetcher = HttpFetcher::new(&HttpSettings {
            timeout_secs: 1,
            user_agent: "test".to_owned(),
        })
        .unwrap();

        assert!(fetcher.get("http://127.0.0.1:9/playlist").is_err());
    }
}
