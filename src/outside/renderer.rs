use std::{thread, time::Duration};

use miette::{IntoDiagnostic, WrapErr};
use reqwest::{blocking::Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info, trace, warn};

use crate::{
    config::{HttpSettings, RendererSettings},
    result::{bail, truncate, Error, Result},
};

/// How long to let a page run its scripts before reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPlan {
    /// Wait after the navigation
    pub settle: Duration,
    /// Scroll-to-bottom cycles triggering lazy-loaded content
    pub max_scrolls: u32,
    /// Wait after each scroll
    pub scroll_wait: Duration,
}

impl RenderPlan {
    /// Only wait for the first render, no scrolling
    pub fn settle_only(settle: Duration) -> Self {
        Self {
            settle,
            max_scrolls: 0,
            scroll_wait: Duration::ZERO,
        }
    }
}

/// Interface for turning a URL into the HTML of the fully loaded page
pub trait PageRenderer {
    /// Load the page, let it run its scripts as the plan says, and return its HTML.
    fn render(&self, url: &str, plan: &RenderPlan) -> Result<String>;

    /// Whether pages can be rendered at all
    fn is_available(&self) -> bool {
        true
    }
}

/// Stand-in used when no renderer could be reached at startup
#[derive(Debug)]
pub struct NoRenderer;

impl PageRenderer for NoRenderer {
    fn render(&self, _url: &str, _plan: &RenderPlan) -> Result<String> {
        Err(Error::RendererUnavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Select the page renderer once for the whole run.
///
/// Callers only ever see whether a render succeeded, not whether
/// a browser is installed.
pub fn load_renderer(renderer: &RendererSettings, http: &HttpSettings) -> Box<dyn PageRenderer> {
    match WebDriver::connect(&renderer.webdriver, renderer.headless, http) {
        Ok(driver) => {
            info!("Rendering pages through WebDriver at {}", renderer.webdriver);
            Box::new(driver)
        }
        Err(err) => {
            warn!(
                "No WebDriver reachable at {}, pages will be fetched without JavaScript: {}",
                renderer.webdriver,
                err.truncated(200)
            );
            Box::new(NoRenderer)
        }
    }
}

/// A headless browser driven through the
/// [W3C WebDriver](https://www.w3.org/TR/webdriver2/) HTTP protocol,
/// e.g. `chromedriver --port=9515`.
#[derive(Debug)]
pub struct WebDriver {
    client: Client,
    endpoint: String,
    headless: bool,
    user_agent: String,
}

impl WebDriver {
    /// Verify that the endpoint answers and is ready to open sessions
    pub fn connect(endpoint: &str, headless: bool, http: &HttpSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(http.timeout())
            .build()
            .into_diagnostic()
            .wrap_err("Could not build WebDriver client")?;

        let driver = Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            headless,
            user_agent: http.user_agent.clone(),
        };

        let status = driver.call(driver.client.get(driver.url("/status")))?;
        if status.pointer("/ready").and_then(Value::as_bool) == Some(false) {
            let message = status
                .pointer("/message")
                .and_then(Value::as_str)
                .unwrap_or("not ready");
            return bail(format!("WebDriver not ready: {message}"));
        }

        Ok(driver)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    fn call(&self, request: reqwest::blocking::RequestBuilder) -> Result<Value> {
        let res = request
            .send()
            .into_diagnostic()
            .wrap_err("WebDriver request failed")?;
        let status = res.status();
        let body = res
            .text()
            .into_diagnostic()
            .wrap_err("Could not read WebDriver response")?;
        read_value(status, &body)
    }

    fn capabilities(&self) -> Value {
        let mut args = vec![
            "--no-sandbox".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
            "--disable-gpu".to_owned(),
            "--window-size=1920,1080".to_owned(),
            format!("--user-agent={}", self.user_agent),
        ];
        if self.headless {
            args.insert(0, "--headless".to_owned());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }

    fn create_session(&self) -> Result<String> {
        let value = self.call(self.client.post(self.url("/session")).json(&self.capabilities()))?;
        match value.pointer("/sessionId").and_then(Value::as_str) {
            Some(id) => Ok(id.to_owned()),
            None => bail("WebDriver session id missing in response"),
        }
    }

    fn execute(&self, session: &str, script: &str) -> Result<Value> {
        self.call(
            self.client
                .post(self.url(&format!("/session/{session}/execute/sync")))
                .json(&json!({ "script": script, "args": [] })),
        )
    }

    fn page_height(&self, session: &str) -> Result<u64> {
        Ok(self
            .execute(session, "return document.body.scrollHeight;")?
            .as_u64()
            .unwrap_or(0))
    }

    fn load(&self, session: &str, url: &str, plan: &RenderPlan) -> Result<String> {
        self.call(
            self.client
                .post(self.url(&format!("/session/{session}/url")))
                .json(&json!({ "url": url })),
        )?;
        thread::sleep(plan.settle);

        let cycles = scroll_until_stable(
            plan.max_scrolls,
            plan.scroll_wait,
            || self.page_height(session),
            || {
                self.execute(session, "window.scrollTo(0, document.body.scrollHeight);")
                    .map(|_| ())
            },
        )?;
        debug!("{cycles} scroll cycles on {url}");

        let source = self.call(self.client.get(self.url(&format!("/session/{session}/source"))))?;
        match source.as_str() {
            Some(html) => Ok(html.to_owned()),
            None => bail("WebDriver page source is not a string"),
        }
    }
}

impl PageRenderer for WebDriver {
    fn render(&self, url: &str, plan: &RenderPlan) -> Result<String> {
        let session = self.create_session()?;
        debug!("WebDriver session {session} opened for {url}");

        let res = self.load(&session, url, plan);

        // Always close the browser, even when loading failed
        if let Err(err) = self.call(self.client.delete(self.url(&format!("/session/{session}")))) {
            warn!("Could not close WebDriver session {session}: {}", err.truncated(200));
        }

        res
    }
}

/// Scroll to the bottom and wait, at most `max_scrolls` times, stopping early
/// once the page height no longer changes. Return the number of cycles run.
pub fn scroll_until_stable<H, S>(
    max_scrolls: u32,
    wait: Duration,
    mut height: H,
    mut scroll: S,
) -> Result<u32>
where
    H: FnMut() -> Result<u64>,
    S: FnMut() -> Result<()>,
{
    let mut last_height = height()?;
    for cycle in 1..=max_scrolls {
        scroll()?;
        thread::sleep(wait);

        let current = height()?;
        trace!("Scroll {cycle}: page height {last_height} -> {current}");
        if current == last_height {
            return Ok(cycle);
        }
        last_height = current;
    }
    Ok(max_scrolls)
}

/// Extract the `value` of a WebDriver response, turning protocol errors into errors.
fn read_value(status: StatusCode, body: &str) -> Result<Value> {
    let json: Value = serde_json::from_str(body).unwrap_or_default();

    if let Some(err) = json.pointer("/value/error").and_then(Value::as_str) {
        let message = json
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown webdriver error");
        return bail(format!("{err}: {}", truncate(message, 200)));
    }
    if !status.is_success() {
        return bail(format!("WebDriver HTTP {}: {}", status.as_u16(), truncate(body, 200)));
    }

    match json {
        Value::Object(mut map) => Ok(map.remove("value").unwrap_or(Value::Null)),
        _ => bail(format!("Unexpected WebDriver response: {}", truncate(body, 200))),
    }
}
