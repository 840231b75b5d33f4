// src/errors.rs

use thiserror::Error;

/// Failures while decoding an inbound bid request.
///
/// Both variants are client-caused and recovered locally: the handler
/// answers HTTP 204 with an empty body and keeps serving.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed JSON payload")]
    MalformedJson,
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// Startup configuration failures. These abort the process: running a
/// bidder with a broken config (e.g. an empty creative catalog) is
/// worse than not running it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of a single pacer tick. Logged and dropped; the next
/// scheduled tick is the retry.
#[derive(Error, Debug)]
pub enum PacerError {
    #[error("banker transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("banker request timed out")]
    Timeout,
    #[error("banker returned non-success status: {0}")]
    Status(reqwest::StatusCode),
}
