//! Server configuration.
//!
//! Loaded from ~/.config/almanac/config.toml, with ALMANAC_* environment
//! variables taking precedence:
//!
//!   [google]
//!   client_id = "your-client-id.apps.googleusercontent.com"
//!   client_secret = "your-client-secret"

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 4280;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub google: GoogleConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    pub redirect_uri: Option<String>,
}

fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("almanac")
        .join("config.toml"))
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        let path = config_path()?;

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            ServerConfig::default()
        };

        config.apply_env()?;

        if config.google.client_id.is_empty() || config.google.client_secret.is_empty() {
            anyhow::bail!(
                "Google credentials not configured.\n\n\
                Add to {} (or set ALMANAC_GOOGLE_CLIENT_ID / ALMANAC_GOOGLE_CLIENT_SECRET):\n\n\
                [google]\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            );
        }

        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("ALMANAC_PORT") {
            self.port = Some(port.parse().context("ALMANAC_PORT is not a valid port")?);
        }
        if let Ok(db) = std::env::var("ALMANAC_DB") {
            self.db_path = Some(PathBuf::from(db));
        }
        if let Ok(id) = std::env::var("ALMANAC_GOOGLE_CLIENT_ID") {
            self.google.client_id = id;
        }
        if let Ok(secret) = std::env::var("ALMANAC_GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = secret;
        }
        if let Ok(uri) = std::env::var("ALMANAC_GOOGLE_REDIRECT_URI") {
            self.google.redirect_uri = Some(uri);
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.db_path {
            return Ok(path.clone());
        }
        Ok(dirs::data_dir()
            .context("Could not determine data directory")?
            .join("almanac")
            .join("almanac.db"))
    }

    /// Where Google redirects after consent. Defaults to this server's own
    /// callback route.
    pub fn redirect_uri(&self) -> String {
        self.google
            .redirect_uri
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}/oauth/callback", self.port()))
    }
}
