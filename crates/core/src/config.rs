//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the pipeline and the
//! adapters. Nothing reads process-wide environment variables during request handling, which
//! keeps behaviour consistent across threads and lets tests build configs directly.

use crate::constants::*;
use crate::error::ConfigError;
use omstorage_types::ProjectId;
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Settings the upload pipeline itself needs.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    storage_root: PathBuf,
    public_url_prefix: String,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// The prefix must start with `/`; a trailing `/` is dropped so URLs never contain `//`.
    pub fn new(storage_root: PathBuf, public_url_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = public_url_prefix.trim();
        if !prefix.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: PUBLIC_URL_PREFIX_ENV,
                reason: format!("must start with '/', got '{}'", prefix),
            });
        }

        Ok(Self {
            storage_root,
            public_url_prefix: prefix.trim_end_matches('/').to_owned(),
        })
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Same settings, rooted elsewhere. Used once the blob store has canonicalised the root.
    pub fn with_storage_root(&self, storage_root: PathBuf) -> Self {
        Self {
            storage_root,
            public_url_prefix: self.public_url_prefix.clone(),
        }
    }

    /// The normalised prefix. Empty when configured as `/`.
    pub fn public_url_prefix(&self) -> &str {
        &self.public_url_prefix
    }

    /// Route the blob store root is served under. Never empty.
    pub fn static_route(&self) -> &str {
        if self.public_url_prefix.is_empty() {
            "/"
        } else {
            &self.public_url_prefix
        }
    }

    /// `{prefix}/{project}/{name}`
    pub fn public_url(&self, project: &ProjectId, object_name: &str) -> String {
        format!("{}/{}/{}", self.public_url_prefix, project, object_name)
    }
}

/// TLS negotiation with Postgres, in libpq's vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Allow,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Allow => "allow",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    fn to_pg(self) -> PgSslMode {
        match self {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Allow => PgSslMode::Allow,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
            SslMode::VerifyCa => PgSslMode::VerifyCa,
            SslMode::VerifyFull => PgSslMode::VerifyFull,
        }
    }
}

impl FromStr for SslMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "allow" => Ok(SslMode::Allow),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(ConfigError::InvalidValue {
                key: DB_SSLMODE_ENV,
                reason: format!("unknown SSL mode '{}'", other),
            }),
        }
    }
}

impl std::fmt::Display for SslMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters for the metadata database.
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: SslMode,
    pub timezone: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("ssl_mode", &self.ssl_mode)
            .field("timezone", &self.timezone)
            .finish()
    }
}

impl DatabaseConfig {
    /// Builds connect options with the session `TimeZone` set on every connection.
    pub fn connect_options(&self) -> PgConnectOptions {
        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name)
            .ssl_mode(self.ssl_mode.to_pg())
            .options([("TimeZone", self.timezone.as_str())]);
        if !self.password.is_empty() {
            options = options.password(&self.password);
        }
        options
    }
}

/// Everything a server process needs, resolved from the environment.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub core: CoreConfig,
    pub database: DatabaseConfig,
    pub server_port: u16,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Reads the process environment. Call after loading any `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`. Unset and blank values take the default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let storage_root = get(STORAGE_ROOT_ENV).unwrap_or_else(|| DEFAULT_STORAGE_ROOT.into());
        let prefix =
            get(PUBLIC_URL_PREFIX_ENV).unwrap_or_else(|| DEFAULT_PUBLIC_URL_PREFIX.into());
        let core = CoreConfig::new(PathBuf::from(storage_root), &prefix)?;

        let server_port = parse_or(get(SERVER_PORT_ENV), SERVER_PORT_ENV, DEFAULT_SERVER_PORT)?;

        let max_upload_bytes = parse_or(
            get(MAX_UPLOAD_BYTES_ENV),
            MAX_UPLOAD_BYTES_ENV,
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;
        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: MAX_UPLOAD_BYTES_ENV,
                reason: "must be greater than zero".into(),
            });
        }

        let database = DatabaseConfig {
            host: get(DB_HOST_ENV).unwrap_or_else(|| DEFAULT_DB_HOST.into()),
            port: parse_or(get(DB_PORT_ENV), DB_PORT_ENV, DEFAULT_DB_PORT)?,
            user: get(DB_USER_ENV).unwrap_or_else(|| DEFAULT_DB_USER.into()),
            // Passwords may legitimately contain surrounding whitespace.
            password: lookup(DB_PASSWORD_ENV).unwrap_or_default(),
            name: get(DB_NAME_ENV).unwrap_or_else(|| DEFAULT_DB_NAME.into()),
            ssl_mode: get(DB_SSLMODE_ENV)
                .as_deref()
                .unwrap_or(DEFAULT_DB_SSLMODE)
                .parse()?,
            timezone: get(DB_TIMEZONE_ENV).unwrap_or_else(|| DEFAULT_DB_TIMEZONE.into()),
        };

        Ok(Self {
            core,
            database,
            server_port,
            max_upload_bytes,
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            reason: format!("'{}': {}", raw, e),
        }),
    }
}
