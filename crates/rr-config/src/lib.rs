//! # rr-config
//!
//! Layered runtime settings: built-in defaults, then `config/default.toml`,
//! then `config/local.toml`, then `REVIEWS__*` environment variables
//! (e.g. `REVIEWS__SERVER__PORT=5000`). A `.env` file is read first.

use config::{Config, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const ENV_PREFIX: &str = "REVIEWS";
const PLACEHOLDER_SECRET: &str = "change-me";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_max_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// sqlx connection URL, e.g. `sqlite:data/reviews.db`
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    /// Key used to sign and verify bearer tokens
    #[serde(deserialize_with = "secret")]
    pub token_secret: SecretString,
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    pub filter: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl AuthSettings {
    /// True while the secret is still the built-in default.
    pub fn uses_placeholder_secret(&self) -> bool {
        self.token_secret.expose_secret() == PLACEHOLDER_SECRET
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `log.filter`.
pub fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if log.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn secret<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

impl Settings {
    /// Loads settings from the standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("loaded environment from {}", path.display());
        }

        let builder = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        Self::finish(builder.build()?)
    }

    /// Defaults overlaid with a TOML document. Handy in tests and tooling.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000_i64)?
            .set_default("server.cors_max_age_secs", 3600_i64)?
            .set_default("database.url", "sqlite:data/reviews.db")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("auth.token_secret", PLACEHOLDER_SECRET)?
            .set_default("auth.token_ttl_secs", 86_400_i64)?
            .set_default("log.filter", "info")?
            .set_default("log.json", false)?)
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let settings: Settings = config.try_deserialize()?;

        if settings.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "database.max_connections",
                reason: "must be at least 1".to_string(),
            });
        }
        if settings.auth.token_secret.expose_secret().is_empty() {
            return Err(ConfigError::Invalid {
                key: "auth.token_secret",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(settings)
    }
}
