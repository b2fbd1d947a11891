//! Constants used throughout the omstorage core crate.
//!
//! Environment variable names and their defaults live here so the config layer and the
//! binaries agree on them.

/// Blob store root directory.
pub const STORAGE_ROOT_ENV: &str = "STORAGE_ROOT";
pub const DEFAULT_STORAGE_ROOT: &str = "./uploads";

/// Prefix of every public URL, also the route static files are served under.
pub const PUBLIC_URL_PREFIX_ENV: &str = "PUBLIC_URL_PREFIX";
pub const DEFAULT_PUBLIC_URL_PREFIX: &str = "/storage";

/// HTTP port. The server binds on all interfaces.
pub const SERVER_PORT_ENV: &str = "SERVER_PORT";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

/// Maximum request body size accepted by the upload routes.
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub const DB_HOST_ENV: &str = "DB_HOST";
pub const DEFAULT_DB_HOST: &str = "localhost";

pub const DB_PORT_ENV: &str = "DB_PORT";
pub const DEFAULT_DB_PORT: u16 = 5432;

pub const DB_USER_ENV: &str = "DB_USER";
pub const DEFAULT_DB_USER: &str = "postgres";

pub const DB_PASSWORD_ENV: &str = "DB_PASSWORD";

pub const DB_NAME_ENV: &str = "DB_NAME";
pub const DEFAULT_DB_NAME: &str = "omstorage";

pub const DB_SSLMODE_ENV: &str = "DB_SSLMODE";
pub const DEFAULT_DB_SSLMODE: &str = "require";

/// Session `TimeZone` for database connections.
pub const DB_TIMEZONE_ENV: &str = "DB_TIMEZONE";
pub const DEFAULT_DB_TIMEZONE: &str = "Asia/Kolkata";

/// Table holding one row per stored file.
pub const FILE_METADATA_TABLE: &str = "file_metadata";
