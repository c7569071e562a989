//! Error types for ltesim

use thiserror::Error;

/// Error types for the ltesim library.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or unsupported PDU contents.
    #[error("PDU error: {0}")]
    Pdu(String),

    /// Entity state errors.
    #[error("State error: {0}")]
    State(String),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}
