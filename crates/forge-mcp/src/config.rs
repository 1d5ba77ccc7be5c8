//! Startup configuration
//!
//! Values come from three layers, highest precedence first:
//!
//! 1. command-line flags and their environment fallbacks (`GITHUB_TOKEN`,
//!    `PORT`, `GITHUB_API_URL`)
//! 2. an optional TOML file given with `--config`
//! 3. built-in defaults
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! transport = "sse"
//!
//! [github]
//! api_url = "https://api.github.com"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use forge_host::DEFAULT_API_URL;
use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Which transport the server speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Sse,
    Stdio,
}

/// Shape of the optional TOML config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub github: GitHubSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub transport: Option<TransportKind>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSection {
    pub api_url: Option<String>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("invalid config file {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub github_token: Option<String>,
    pub transport: Option<TransportKind>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_url: Option<String>,
    pub config: Option<PathBuf>,
}

/// Validated configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub github_token: String,
    pub api_url: String,
    pub transport: TransportKind,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Merge overrides, the config file they name, and defaults.
    ///
    /// # Errors
    ///
    /// `Error::Config` if the token is missing or blank, or the config file
    /// cannot be read or parsed.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let file = match &overrides.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::merge(overrides, file)
    }

    fn merge(overrides: Overrides, file: ConfigFile) -> Result<Self> {
        let github_token = overrides
            .github_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "a GitHub token is required (--github-token or GITHUB_TOKEN)".to_string(),
                )
            })?;

        let host = overrides
            .host
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }

        Ok(Self {
            github_token,
            api_url: overrides
                .api_url
                .or(file.github.api_url)
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            transport: overrides
                .transport
                .or(file.server.transport)
                .unwrap_or_default(),
            host,
            port: overrides.port.or(file.server.port).unwrap_or(DEFAULT_PORT),
        })
    }

    /// Address the SSE transport binds, e.g. `127.0.0.1:3000`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("transport", &self.transport)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
