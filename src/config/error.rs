//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid backend URL (expected http:// or https://): {0}")]
    InvalidApiUrl(String),

    #[error("Invalid stream URL (expected ws:// or wss://): {0}")]
    InvalidStreamUrl(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Reconnect delay must be greater than zero")]
    InvalidReconnectDelay,

    #[error("Command buffer must be greater than zero")]
    InvalidCommandBuffer,

    #[error("Log level must not be empty")]
    EmptyLogLevel,
}
