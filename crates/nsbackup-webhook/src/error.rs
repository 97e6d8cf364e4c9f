//! CLI error types
//!
//! Every failure that reaches `main` is converted into a `CliError` so that
//! miette can render it with a stable diagnostic code.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Configuration file missing or invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nsbackup::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Admission review could not be read or decoded
    #[error("Invalid admission review: {message}")]
    #[diagnostic(code(nsbackup::cli::review))]
    Review { message: String },

    /// Kubernetes client could not be created
    #[error("Kubernetes error: {message}")]
    #[diagnostic(
        code(nsbackup::cli::kube),
        help("check KUBECONFIG or that the pod runs with a service account")
    )]
    Kube { message: String },

    /// TLS material could not be loaded
    #[error("TLS error: {message}")]
    #[diagnostic(code(nsbackup::cli::tls))]
    Tls { message: String },

    /// Server failed while running
    #[error("Server error: {message}")]
    #[diagnostic(code(nsbackup::cli::server))]
    Server { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(nsbackup::cli::io))]
    Io { message: String },
}

impl CliError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    pub fn review(message: impl Into<String>) -> Self {
        Self::Review {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<nsbackup_core::CoreError> for CliError {
    fn from(err: nsbackup_core::CoreError) -> Self {
        match err {
            nsbackup_core::CoreError::Io(e) => e.into(),
            e if e.is_client_error() => CliError::review(e.to_string()),
            e => CliError::Config {
                message: e.to_string(),
                help: Some("run `nsbackup-webhook config` to see the expected shape".to_string()),
            },
        }
    }
}

impl From<nsbackup_kube::KubeError> for CliError {
    fn from(err: nsbackup_kube::KubeError) -> Self {
        CliError::Kube {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
