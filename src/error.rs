use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::btree::TreeError;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("invalid backend endpoint: {0}")]
    Endpoint(#[from] tonic::transport::Error),

    #[error("backend unavailable after {attempts} attempt(s): {status}")]
    Unavailable {
        attempts: u32,
        status: tonic::Status,
    },

    #[error("backend rejected request: {0}")]
    Rejected(tonic::Status),

    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
}

pub type LookupResult<T> = Result<T, LookupError>;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("invalid tree settings: {0}")]
    Tree(#[from] TreeError),

    #[error("failed to read seed file {path}: {source}")]
    SeedFile {
        path: PathBuf,
        source: std::io::Error,
    },
}
