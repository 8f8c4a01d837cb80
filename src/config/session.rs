//! Session behaviour configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Tuning for the session controller
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Delay between an unsolicited close and the next connection attempt
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Capacity of the controller's command queue
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

impl SessionConfig {
    /// Get reconnect delay as Duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reconnect_delay_secs == 0 {
            return Err(ValidationError::InvalidReconnectDelay);
        }
        if self.command_buffer == 0 {
            return Err(ValidationError::InvalidCommandBuffer);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay(),
            command_buffer: default_command_buffer(),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    5
}

fn default_command_buffer() -> usize {
    32
}
