use crate::error::{Result, ReplayError};
use crate::format::ts::{PcrScan, TS_PACKET_SIZE};
use crate::pacing::{DiscontinuityWindow, PacingConfig, DEFAULT_CHUNK_SIZE};
use log::debug;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

const CONFIG_PATHS: [&str; 2] = ["./tsreplay.toml", "./config.toml"];

const DEFAULT_TEMPLATE: &str = include_str!("../config.template.toml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayConfig {
    pub endpoint: String,
    pub chunk_size: usize,
    pub max_backward_jump: Duration,
    pub max_forward_jump: Duration,
    pub pcr_scan: PcrScan,
    pub restart_backoff: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        let window = DiscontinuityWindow::default();
        Self {
            endpoint: String::from("udp://127.0.0.1:9000"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_backward_jump: window.max_backward,
            max_forward_jump: window.max_forward,
            pcr_scan: PcrScan::LastPacket,
            restart_backoff: Duration::from_secs(1),
        }
    }
}

impl ReplayConfig {
    /// Defaults, overridden by the first readable config file, then by
    /// `TSREPLAY_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut config = ReplayConfig::default();

        for path in &CONFIG_PATHS {
            if let Ok(content) = fs::read_to_string(path) {
                debug!("Loading configuration from {}", path);
                config.apply_file(&content)?;
                break;
            }
        }

        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a single config file on top of the defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = ReplayConfig::default();
        config.apply_file(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `key = value` lines; `#` starts a comment.
    pub fn apply_file(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"').trim_matches('\'');
                self.set(key.trim(), value)?;
            }
        }
        Ok(())
    }

    /// Applies environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in [
            "endpoint",
            "chunk_size",
            "max_backward_jump_ms",
            "max_forward_jump_ms",
            "pcr_scan",
            "restart_backoff_ms",
        ] {
            let var = format!("TSREPLAY_{}", key.to_ascii_uppercase());
            if let Some(value) = lookup(&var) {
                self.set(key, value.trim())?;
            }
        }
        Ok(())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "endpoint" => {
                if !value.is_empty() {
                    self.endpoint = value.to_string();
                }
            }
            "chunk_size" => self.chunk_size = value.parse()?,
            "max_backward_jump_ms" => {
                self.max_backward_jump = Duration::from_millis(value.parse()?)
            }
            "max_forward_jump_ms" => self.max_forward_jump = Duration::from_millis(value.parse()?),
            "pcr_scan" => self.pcr_scan = value.parse()?,
            "restart_backoff_ms" => self.restart_backoff = Duration::from_millis(value.parse()?),
            _ => debug!("Ignoring unknown config key {}", key),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size % TS_PACKET_SIZE != 0 {
            return Err(ReplayError::Config(format!(
                "chunk_size {} is not a positive multiple of {}",
                self.chunk_size, TS_PACKET_SIZE
            )));
        }
        if self.endpoint.is_empty() {
            return Err(ReplayError::Config("endpoint is empty".into()));
        }
        Ok(())
    }

    /// Engine settings derived from this configuration.
    pub fn pacing(&self) -> PacingConfig {
        PacingConfig {
            chunk_size: self.chunk_size,
            window: DiscontinuityWindow {
                max_backward: self.max_backward_jump,
                max_forward: self.max_forward_jump,
            },
            pcr_scan: self.pcr_scan,
        }
    }
}

/// Returns the commented configuration template.
pub fn default_config_template() -> &'static str {
    DEFAULT_TEMPLATE
}

/// Creates a default config template file if it doesn't exist
pub fn create_default_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    if !path.as_ref().exists() {
        fs::write(path, DEFAULT_TEMPLATE)?;
    }
    Ok(())
}
