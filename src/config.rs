//! Configuration management
//!
//! Values are layered, lowest priority first: built-in defaults, an optional
//! TOML file, `CHORD_STATS__*` environment variables, and finally the
//! command-line flags (which also read `DATABASE_URL`, `PORT` and `AUTH_TOKEN`).

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Chord quiz statistics service
#[derive(Parser, Debug)]
#[command(name = "chord-stats", version)]
pub struct Cli {
    /// Path to an optional TOML config file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// URL of the statistics database (e.g. "sqlite:stats.db")
    #[arg(short = 'u', long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Port that the server will be listening on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Shared secret expected in the X-Auth-Token header
    #[arg(short, long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Wall-clock budget for a single request
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub token: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    pub malformed_body: MalformedBodyPolicy,
}

/// What `POST /stats` does with a body that is not a decodable record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedBodyPolicy {
    /// Store a zero-valued record in its place
    #[default]
    AcceptAsZero,
    /// Answer 400 and store nothing
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 60)?
            .set_default("database.max_connections", 5)?
            .set_default("ingest.malformed_body", "accept_as_zero")?
            .set_default("logging.level", "info")?
            .add_source(config::File::from(cli.config.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix("CHORD_STATS")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", cli.database_url.clone())?
            .set_override_option("server.port", cli.port.map(i64::from))?
            .set_override_option("auth.token", cli.auth_token.clone())?;

        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Invalid port: 0 is not allowed");
        }
        if self.server.host.is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least one second");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }
        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be at least 1");
        }

        if self.auth.token.is_empty() {
            anyhow::bail!("Auth token cannot be empty");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid logging level '{}'. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}
