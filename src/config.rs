//! Provider configuration
//!
//! Every setting resolves in the same order (highest priority first):
//! 1. The value set in the provider block
//! 2. The matching `METAKUBE_*` environment variable
//! 3. The built-in default
//!
//! The API token is special: an explicit token wins, otherwise it is read from
//! `token_path` (default `~/.metakube/auth`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetryConfig;
use crate::{Error, Result};

/// Default API endpoint
pub const DEFAULT_HOST: &str = "https://metakube.syseleven.de";
/// Default token file, relative to the home directory
pub const DEFAULT_TOKEN_PATH: &str = "~/.metakube/auth";
/// Default timeout for a single HTTP request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const HOST_ENV: &str = "METAKUBE_HOST";
const TOKEN_ENV: &str = "METAKUBE_TOKEN";
const TOKEN_PATH_ENV: &str = "METAKUBE_TOKEN_PATH";
const LOG_DEBUG_ENV: &str = "METAKUBE_LOG_DEBUG";
const LOG_PATH_ENV: &str = "METAKUBE_LOG_PATH";
const DEV_ENV: &str = "METAKUBE_DEV";

/// Provider block as written by the user
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct ProviderConfig {
    /// API endpoint
    #[serde(default)]
    pub host: Option<String>,
    /// Bearer token
    #[serde(default)]
    pub token: Option<String>,
    /// File holding the bearer token
    #[serde(default)]
    pub token_path: Option<String>,
    /// Log at debug level
    #[serde(default)]
    pub debug: Option<bool>,
    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_path: Option<String>,
    /// Human-readable logs instead of JSON
    #[serde(default)]
    pub development: Option<bool>,
}

/// Fully resolved provider settings
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub host: String,
    pub token: String,
    pub request_timeout: Duration,
    pub telemetry: TelemetryConfig,
}

impl ProviderConfig {
    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<Settings> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary environment lookup
    pub fn resolve_with<F>(&self, env: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let host = self
            .host
            .clone()
            .filter(|h| !h.is_empty())
            .or_else(|| lookup(HOST_ENV))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let token = match self.token.clone().filter(|t| !t.is_empty()) {
            Some(token) => token,
            None => match lookup(TOKEN_ENV) {
                Some(token) => token,
                None => {
                    let path = self
                        .token_path
                        .clone()
                        .filter(|p| !p.is_empty())
                        .or_else(|| lookup(TOKEN_PATH_ENV))
                        .unwrap_or_else(|| DEFAULT_TOKEN_PATH.to_string());
                    read_token_file(&expand_home(&path)?)?
                }
            },
        };

        let debug = self
            .debug
            .or_else(|| lookup(LOG_DEBUG_ENV).map(|v| parse_flag(&v)))
            .unwrap_or(false);
        let development = self
            .development
            .or_else(|| lookup(DEV_ENV).map(|v| parse_flag(&v)))
            .unwrap_or(false);
        let log_path = self
            .log_path
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| lookup(LOG_PATH_ENV))
            .map(|p| expand_home(&p))
            .transpose()?;

        Ok(Settings {
            host,
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            telemetry: TelemetryConfig {
                debug,
                development,
                log_path,
            },
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expand a leading `~/` to the home directory
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| Error::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

fn read_token_file(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "no token configured and failed to read {}: {}",
            path.display(),
            e
        ))
    })?;
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::config(format!("token file {} is empty", path.display())));
    }
    Ok(token.to_string())
}
