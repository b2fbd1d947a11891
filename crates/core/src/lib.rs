//! # omstorage core
//!
//! Core logic of the omstorage upload service.
//!
//! This crate contains the upload pipeline and the adapters it is wired to:
//! - [`UploadService`]: validate, allocate an identity, store the bytes, derive image previews,
//!   record metadata
//! - [`FileRepository`] implementations for Postgres and for process memory
//! - [`AppConfig`], resolved once at startup and passed down
//!
//! **No API concerns**: HTTP routing, multipart parsing and response shapes belong in
//! `api-rest`; the admin CLI lives in `omstorage-cli`.

pub mod config;
pub mod constants;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod repositories;

pub use config::{AppConfig, CoreConfig, DatabaseConfig, SslMode};
pub use error::{
    ConfigError, RepositoryError, RepositoryResult, UploadError, UploadResult, UploadWarning,
};
pub use pipeline::{BatchOutcome, IncomingFile, UploadOutcome, UploadRequest, UploadService};
pub use record::{FileRecord, NewFileRecord};
pub use repositories::{FileRepository, InMemoryFileRepository, PgFileRepository};

pub use omstorage_preview::DerivativeKind;
