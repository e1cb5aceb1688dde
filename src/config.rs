use std::{path::PathBuf, time::Duration};

use config::{Config, Environment, File, FileFormat};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;

use crate::{cli::Args, types::Platform};

/// Prefix of the environment variables overriding the settings
pub const ENV_PREFIX: &str = "PLGRAB";

/// Built-in defaults, the lowest configuration layer
const DEFAULTS: &str = r#"
download_dir = "Aparat_Downloads"
links_dir = "."
pacing_secs = 3
retries = 3
fragment_retries = 3

[platform]
host = "www.aparat.com"
domain = "aparat.com"
marker = "/v/"

[renderer]
webdriver = "http://localhost:9515"
headless = true
settle_secs = 5
scroll_wait_secs = 2
max_scrolls = 3

[http]
timeout_secs = 30
user_agent = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Default download root proposed to the operator
    pub download_dir: PathBuf,
    /// Where the harvested link list is written
    pub links_dir: PathBuf,
    /// Pause after each successful download
    pub pacing_secs: u64,
    pub retries: u32,
    pub fragment_retries: u32,
    pub platform: Platform,
    pub renderer: RendererSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RendererSettings {
    /// WebDriver endpoint, e.g. a running `chromedriver`
    pub webdriver: String,
    pub headless: bool,
    pub settle_secs: u64,
    pub scroll_wait_secs: u64,
    pub max_scrolls: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Settings {
    /// Layer the defaults, the optional config file, the environment
    /// and finally the command line flags.
    pub fn load(args: &Args) -> Result<Self> {
        let mut settings: Settings = Config::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::from(args.config.as_path()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .into_diagnostic()
            .wrap_err("Could not read the configuration")?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid configuration")?;

        if let Some(webdriver) = &args.webdriver {
            settings.renderer.webdriver = webdriver.clone();
        }
        if args.no_pacing {
            settings.pacing_secs = 0;
        }

        Ok(settings)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

impl RendererSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn scroll_wait(&self) -> Duration {
        Duration::from_secs(self.scroll_wait_secs)
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
