//! # af-config
//!
//! Layered settings: built-in defaults, then a TOML file, then `AF__*`
//! environment variables (`AF__BACKEND__KIND=rest`). A `.env` file in the
//! working directory is loaded into the environment first.

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "AF";
pub const DEFAULT_CONFIG_FILE: &str = "alumni-forum";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Sqlite,
    Rest,
}

#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub database_url: String,
    pub max_connections: u32,
    /// Project URL of the hosted backend, e.g. `https://abc.example.co`
    pub rest_url: Option<String>,
    pub api_key: Option<SecretString>,
    pub access_token: Option<SecretString>,
    /// Column on the hosted replies table that stores the parent reply.
    /// Replies are posted flat when unset.
    pub reply_parent_column: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// Default filter directive; `RUST_LOG` overrides it.
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForumSettings {
    /// Inserted into an empty SQLite store on startup.
    #[serde(default)]
    pub seed_categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub backend: BackendSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub forum: ForumSettings,
    /// The `.env` file that was read, if any. Logged by the caller once
    /// tracing is up.
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
    Ok(Config::builder()
        .set_default("backend.kind", "sqlite")?
        .set_default("backend.database_url", "sqlite:alumni_forum.db?mode=rwc")?
        .set_default("backend.max_connections", 5)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings, SettingsError> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    /// Loads settings from `path` (required) or `alumni-forum.toml` in the
    /// working directory (optional), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let env_file = dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let builder = defaults()?.add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let mut settings = finish(builder)?;
        settings.env_file = env_file;
        Ok(settings)
    }

    /// Defaults overlaid with a TOML document. No environment.
    pub fn from_toml(toml: &str) -> Result<Self, SettingsError> {
        finish(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.backend.max_connections == 0 {
            return Err(SettingsError::Invalid(
                "backend.max_connections must be at least 1".into(),
            ));
        }
        if self.backend.kind == BackendKind::Rest {
            if self.backend.rest_url.is_none() {
                return Err(SettingsError::Invalid(
                    "backend.rest_url is required for the rest backend".into(),
                ));
            }
            if self.backend.api_key.is_none() {
                return Err(SettingsError::Invalid(
                    "backend.api_key is required for the rest backend".into(),
                ));
            }
        }
        Ok(())
    }
}
