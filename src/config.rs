//! Recorder configuration

use crate::identity::{system_hostname, Identity};
use crate::{Error, Format, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

fn default_limit_secs() -> u64 {
    60
}

/// Settings of a single recording. Fixed once the recorder is created.
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    #[serde(default)]
    pub server_id: String,
    #[serde(default)]
    pub stream_name: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub stream_id: String,
    #[serde(default)]
    pub channel_id: String,
    /// Overrides the system hostname in path templates
    #[serde(default)]
    pub hostname: Option<String>,
    /// Path template (MP4) or root directory (NVR)
    pub path: String,
    #[serde(default)]
    pub format: Format,
    /// Segment rotation limit in seconds (MP4 only)
    #[serde(default = "default_limit_secs")]
    pub limit_secs: u64,
}

impl RecorderConfig {
    pub fn new(path: impl Into<String>, format: Format) -> Self {
        Self {
            server_id: String::new(),
            stream_name: String::new(),
            channel_name: String::new(),
            stream_id: String::new(),
            channel_id: String::new(),
            hostname: None,
            path: path.into(),
            format,
            limit_secs: default_limit_secs(),
        }
    }

    pub fn limit(&self) -> Duration {
        Duration::from_secs(self.limit_secs)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            server_id: self.server_id.clone(),
            stream_name: self.stream_name.clone(),
            channel_name: self.channel_name.clone(),
            stream_id: self.stream_id.clone(),
            channel_id: self.channel_id.clone(),
            hostname: self.hostname.clone().unwrap_or_else(system_hostname),
        }
    }
}

/// Config file listing every recording
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recordings: Vec<RecorderConfig>,
}

impl Config {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;

        if config.recordings.is_empty() {
            return Err(Error::InvalidInput("no recordings configured".to_string()));
        }

        Ok(config)
    }
}
