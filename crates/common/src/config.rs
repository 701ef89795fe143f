//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Every value has a default, so running without a config file is normal.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Base URL of the gift code API. Endpoint names are appended to it.
pub const DEFAULT_BASE_URL: &str = "https://cdkey.lilith.com/api/";

/// Config file looked up in the working directory when none is given.
const DEFAULT_CONFIG_FILE: &str = "afk-redeem.toml";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Remote API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Applied by the HTTP client to each request
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Persisted session settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Directory holding one cookie file per player
    #[serde(default = "default_session_dir")]
    pub dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_session_dir(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_session_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&contents).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "parsed config file");
        config.finish()
    }

    /// Defaults overlaid with environment variables, for runs without a file.
    pub fn from_env() -> Result<Self> {
        Config::default().finish()
    }

    /// Load from `path` when one was resolved, otherwise from the environment.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_env(),
        }
    }

    /// Resolve config file path from CLI arg, AFKARENA_CONFIG env var, or
    /// the default file if it exists in the working directory.
    pub fn resolve_path(cli_path: Option<&str>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(PathBuf::from(p));
        }
        if let Ok(p) = std::env::var("AFKARENA_CONFIG") {
            return Some(PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    }

    fn finish(mut self) -> Result<Self> {
        if let Ok(url) = std::env::var("AFKARENA_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(dir) = std::env::var("AFKARENA_SESSION_DIR") {
            self.session.dir = PathBuf::from(dir);
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        // Endpoints are joined by plain concatenation
        if !self.api.base_url.ends_with('/') {
            self.api.base_url.push('/');
        }

        if self.api.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than 0".into()));
        }

        if self.session.dir.as_os_str().is_empty() {
            return Err(Error::Config("session dir must not be empty".into()));
        }

        Ok(self)
    }
}
