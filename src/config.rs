use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::service::DEFAULT_BRIDGE_PATH;
use crate::domain::{BridgeError, RelaySettings, Result};

pub const APP_NAME: &str = "wsbridge";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address the HTTP listener binds to
    pub bind: String,
    /// Path of the upgrade endpoint
    pub path: String,
    pub connect_timeout_ms: u64,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub read_buffer_size: usize,
    pub close_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".into(),
            path: DEFAULT_BRIDGE_PATH.into(),
            connect_timeout_ms: 10_000,
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        let settings = RelaySettings::default();
        Self {
            read_buffer_size: settings.read_buffer_size,
            close_timeout_ms: settings.close_timeout.as_millis() as u64,
        }
    }
}

impl BridgeConfig {
    /// Load from `path`, or from the platform config directory when none is given.
    ///
    /// confy writes the defaults out when the file does not exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, None),
        }
        .map_err(|e| BridgeError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(BridgeError::Config(format!("path '{}' must start with '/'", self.path)));
        }
        if self.relay.read_buffer_size == 0 {
            return Err(BridgeError::Config("relay.read_buffer_size must be positive".into()));
        }
        if self.connect_timeout_ms == 0 {
            return Err(BridgeError::Config("connect_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            read_buffer_size: self.relay.read_buffer_size,
            close_timeout: Duration::from_millis(self.relay.close_timeout_ms),
        }
    }
}
