#![forbid(unsafe_code)]

use std::path::PathBuf;

use thiserror::Error;

use crate::model::TaskId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("store answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("update rejected: {0}")]
    Rejected(String),

    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config value for '{key}': {msg}")]
    InvalidValue { key: String, msg: String },

    #[error("failed to determine platform config directory")]
    NoConfigDir,
}
