//! Layered configuration for cumulus.
//!
//! Values are merged from, lowest precedence first:
//! 1. built-in defaults,
//! 2. `config.toml` in the platform configuration directory,
//! 3. an explicitly requested TOML file,
//! 4. `CUMULUS_` environment variables, with `__` separating sections
//!    (`CUMULUS_DRIVE__PAGE_SIZE=200`).
//!
//! The result is validated before it is returned.

pub mod error;

use crate::error::{ErrorKind, Result};
use cumulus_storage::backend::{DEFAULT_API_BASE, DriveOptions};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "CUMULUS_";
const FILE_NAME: &str = "config.toml";
const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub drive: DriveConfig,
    /// OAuth client registration, for hosts that acquire tokens themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub api_base: String,
    /// Files requested per listing page, `1..=1000`.
    pub page_size: u32,
    /// Timeout for listing and metadata requests. Downloads are not limited.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}
impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}
impl DriveConfig {
    pub fn options(&self) -> DriveOptions {
        DriveOptions {
            api_base: self.api_base.clone(),
            page_size: self.page_size,
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}
impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

impl Config {
    /// Load from every layer, with `explicit` (if any) above the user's
    /// configuration file. An explicit file that does not exist is an error;
    /// a missing user file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            exn::bail!(ErrorKind::Missing(path.to_path_buf()));
        }
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = default_path() {
            tracing::debug!(path = %path.display(), "Merging user configuration");
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let drive = &self.drive;
        if !(drive.api_base.starts_with("https://") || drive.api_base.starts_with("http://")) {
            exn::bail!(ErrorKind::Invalid(format!("drive.api_base must be an HTTP(S) URL, got `{}`", drive.api_base)));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&drive.page_size) {
            exn::bail!(ErrorKind::Invalid(format!(
                "drive.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                drive.page_size
            )));
        }
        if drive.timeout_secs == 0 || drive.connect_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid("drive timeouts must be non-zero".to_string()));
        }
        if let Some(oauth) = &self.oauth {
            for (field, value) in [
                ("client_id", &oauth.client_id),
                ("client_secret", &oauth.client_secret),
                ("redirect_url", &oauth.redirect_url),
            ] {
                if value.trim().is_empty() {
                    exn::bail!(ErrorKind::Invalid(format!("oauth.{field} must not be empty")));
                }
            }
        }
        Ok(())
    }
}

/// `config.toml` in the platform configuration directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cumulus").map(|dirs| dirs.config_dir().join(FILE_NAME))
}
