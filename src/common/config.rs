//! Configuration file handling

use serde::Deserialize;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Default settings applied when the command line omits them
    #[serde(default)]
    pub defaults: Defaults,

    /// HTTP engine settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Run behavior
    #[serde(default)]
    pub run: RunConfig,
}

/// Default settings
#[derive(Debug, Deserialize, Default)]
pub struct Defaults {
    /// Target used when neither the flow nor `--target` defines one
    pub target: Option<String>,

    /// Print HTTP timing phases for every response
    #[serde(default)]
    pub timings: bool,
}

/// HTTP engine settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Whether redirects are followed
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            follow_redirects: default_follow_redirects(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_follow_redirects() -> bool {
    true
}

/// What happens when the engine fails part-way through a flow
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnRunError {
    /// Log the failure and carry on
    #[default]
    Log,
    /// Drop the failure without logging (observers still get the error event)
    Silent,
    /// Return the failure to the caller
    Fail,
}

/// Run behavior
#[derive(Debug, Deserialize, Default)]
pub struct RunConfig {
    #[serde(default)]
    pub on_error: OnRunError,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| super::Error::file_read(&path, &e))?;
                return Self::parse(&content);
            }
        }
        Ok(Self::default())
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
