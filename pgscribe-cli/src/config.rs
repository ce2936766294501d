//! Layered configuration: defaults, optional TOML file, environment, CLI flags

use chrono::NaiveDateTime;
use pgscribe_schema::AssembleOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "pgscribe.toml";

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}. Check TOML syntax.")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid {name} value: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("No database configured. Set DATABASE_URL, or DB_HOST and DB_NAME, or [database] in pgscribe.toml")]
    MissingDatabase,

    #[error("Invalid database URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub generate: GenerateConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Full connection string; wins over the individual parts
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: None,
            port: 5432,
            name: None,
            username: None,
            password: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub schemas: Vec<String>,
    pub tables: Vec<String>,
    pub exclude: Vec<String>,
    pub output: PathBuf,
    /// Remove the target directories before writing
    pub clean: bool,
    pub include_views: bool,
    /// Base timestamp (`YYYYMMDDHHMMSS`) for migration and seeder file names
    pub timestamp: Option<String>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            schemas: vec!["public".to_string()],
            tables: Vec::new(),
            exclude: Vec::new(),
            output: PathBuf::from("generated"),
            clean: false,
            include_views: false,
            timestamp: None,
        }
    }
}

impl AppConfig {
    /// Load `path`, or `pgscribe.toml` when present, then apply the environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => AppConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `DB_*` and `DATABASE_URL` overrides read through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db = &mut self.database;
        if let Some(host) = lookup("DB_HOST") {
            db.host = Some(host);
        }
        if let Some(port) = lookup("DB_PORT") {
            db.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                name: "DB_PORT",
                value: port,
            })?;
        }
        if let Some(name) = lookup("DB_NAME") {
            db.name = Some(name);
        }
        if let Some(user) = lookup("DB_USERNAME").or_else(|| lookup("DB_USER")) {
            db.username = Some(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            db.password = Some(password);
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            db.url = Some(url);
        }
        Ok(())
    }
}

impl DatabaseConfig {
    /// Connection string, built from the parts when no URL is set
    pub fn connection_url(&self) -> ConfigResult<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }

        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingDatabase)?;
        let name = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::MissingDatabase)?;

        let mut url = Url::parse(&format!("postgres://{}", host))?;
        let invalid = |name: &'static str, value: &str| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
        };
        url.set_port(Some(self.port))
            .map_err(|_| invalid("port", &self.port.to_string()))?;
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            url.set_username(username)
                .map_err(|_| invalid("username", username))?;
            if let Some(password) = self.password.as_deref() {
                url.set_password(Some(password))
                    .map_err(|_| invalid("password", "***"))?;
            }
        }
        url.set_path(name);
        Ok(url.to_string())
    }
}

impl GenerateConfig {
    pub fn assemble_options(&self) -> AssembleOptions {
        let schemas = if self.schemas.is_empty() {
            AssembleOptions::default().schemas
        } else {
            self.schemas.clone()
        };
        AssembleOptions {
            schemas,
            tables: self.tables.clone(),
            exclude: self.exclude.clone(),
            include_views: self.include_views,
        }
    }

    /// Configured timestamp base, or the current UTC time
    pub fn timestamp_base(&self) -> ConfigResult<NaiveDateTime> {
        match self.timestamp.as_deref() {
            Some(value) => NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|_| {
                ConfigError::InvalidValue {
                    name: "timestamp",
                    value: value.to_string(),
                }
            }),
            None => Ok(chrono::Utc::now().naive_utc()),
        }
    }
}

/// Hide the password of a connection string for display
pub fn masked_url(database_url: &str) -> String {
    match Url::parse(database_url) {
        Ok(mut url) => {
            if url.password().is_some() && url.set_password(Some("***")).is_err() {
                return "***".to_string();
            }
            url.to_string()
        }
        Err(_) => "***".to_string(),
    }
}
