//! Error types shared across the crate.
//!
//! Only data-access failures live here. Per-recipe resolution problems are
//! not errors; they are collected as [`ResolutionFailure`] values by the
//! engine and the run carries on.
//!
//! [`ResolutionFailure`]: crate::domain::resolution::ResolutionFailure

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("failed to write config file: {0}")]
    Write(String),
}

/// Failures talking to the game-data API. All of them abort the run.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api responded with status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("api error: {0}")]
    Api(String),
    #[error("no access token, call generate_token first")]
    MissingToken,
}

/// Snapshot store failures. A missing snapshot file is not one of them.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error("snapshot io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt snapshot {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Name lookups against the catalog that came back empty.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown profession tier: {0}")]
    ProfessionTier(String),
    #[error("unknown profession tier id {profession}-{tier}")]
    ProfessionTierId { profession: u32, tier: u32 },
    #[error("unknown item: {0}")]
    Item(String),
    #[error("unknown realm: {0}")]
    Realm(String),
    #[error("unknown profession id {0}")]
    Profession(u32),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

pub type Result<T> = std::result::Result<T, Error>;
