//! error.rs — Error taxonomy for the emission engine

use poeminv_types::ParseError;
use thiserror::Error;

/// Errors raised while loading configuration or calculating emissions.
#[derive(Debug, Error)]
pub enum Error {
    /// Rule set is malformed or incomplete. Fatal for the object being built.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A domain value violates its invariant.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Caller-supplied argument violates a precondition.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operating mode not supported by the requested calculation.
    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    /// Engine group not supported by the requested lookup.
    #[error("Invalid engine group: {0}")]
    InvalidEngineGroup(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::UnknownVariant { kind: "mode", .. } => Error::InvalidMode(e.to_string()),
            ParseError::UnknownVariant { kind: "engine group", .. } => {
                Error::InvalidEngineGroup(e.to_string())
            }
            _ => Error::InvalidValue(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
