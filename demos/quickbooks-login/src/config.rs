//! Configuration for the QuickBooks login demo
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - `config.toml` (or the file named by `QB_CONFIG_FILE`)
//! - `QB__`-prefixed environment variables, e.g. `QB__SERVER__PORT`
//! - `QB_CLIENT_ID` / `QB_CLIENT_SECRET`

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use ras_identity_quickbooks::QuickBooksConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    pub quickbooks: QuickBooksConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut builder = ConfigBuilder::builder().set_default(
            "quickbooks.redirect_uri",
            "http://localhost:3000/quickbooks/callback",
        )?;

        let config_path =
            std::env::var("QB_CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            info!("Loading configuration from {}", config_path);
            builder = builder.add_source(File::with_name(&config_path));
        } else {
            debug!("No config file found at {}, using defaults", config_path);
        }

        builder = builder
            .add_source(
                Environment::with_prefix("QB")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("quickbooks.client_id", std::env::var("QB_CLIENT_ID").ok())?
            .set_override_option(
                "quickbooks.client_secret",
                std::env::var("QB_CLIENT_SECRET").ok(),
            )?;

        let config = builder.build().context("Failed to build configuration")?;

        let settings: Config = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.quickbooks.client_id.trim().is_empty() {
            anyhow::bail!("QuickBooks client id must not be empty");
        }

        if self.quickbooks.client_secret.trim().is_empty() {
            anyhow::bail!("QuickBooks client secret must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ras_identity_quickbooks::Environment as QuickBooksEnvironment;

    fn parse(toml: &str) -> Result<Config> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    #[test]
    fn test_server_defaults() {
        let config = parse(
            r#"
            [quickbooks]
            client_id = "id"
            client_secret = "secret"
            redirect_uri = "http://localhost:3000/quickbooks/callback"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, default_host());
        assert_eq!(config.quickbooks.environment, QuickBooksEnvironment::Production);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_credentials() {
        let config = parse(
            r#"
            [server]
            port = 8080

            [quickbooks]
            client_id = ""
            client_secret = "secret"
            redirect_uri = "http://localhost:8080/quickbooks/callback"
            environment = "sandbox"
            "#,
        )
        .unwrap();

        assert_eq!(config.quickbooks.environment, QuickBooksEnvironment::Sandbox);
        assert!(config.validate().is_err());
    }
}
