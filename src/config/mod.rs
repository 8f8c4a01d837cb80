//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `CHATLINK` prefix and nested values use double underscores as separators.
//! Every value has a default, so an empty environment yields a usable setup
//! pointing at `http://localhost:8000`.
//!
//! # Example
//!
//! ```no_run
//! use chatlink::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Backend at {}", config.backend.api_url);
//! ```

mod backend;
mod error;
mod logging;
mod session;

pub use backend::BackendConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Backend endpoints and request timeout
    #[serde(default)]
    pub backend: BackendConfig,

    /// Session controller tuning (reconnect delay, queue size)
    #[serde(default)]
    pub session: SessionConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `CHATLINK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `CHATLINK__BACKEND__API_URL=http://host:8000` -> `backend.api_url`
    /// - `CHATLINK__SESSION__RECONNECT_DELAY_SECS=5` -> `session.reconnect_delay_secs`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("CHATLINK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.backend.validate()?;
        self.session.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
