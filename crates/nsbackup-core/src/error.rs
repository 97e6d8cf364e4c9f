//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Could not decode {which} object: {source}")]
    Decode {
        which: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Admission request is missing the {which} object")]
    MissingObject { which: &'static str },

    #[error("Failed to parse configuration: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the error was caused by the caller's payload
    pub fn is_client_error(&self) -> bool {
        matches!(self, CoreError::Decode { .. } | CoreError::MissingObject { .. })
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
