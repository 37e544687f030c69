//! Handraise configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main Handraise configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Role domain suffixes
    pub domains: DomainsConfig,

    /// Presence publishing configuration
    pub presence: PresenceConfig,

    /// Store channel sizing
    pub store: StoreConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.domains.responder_suffix.is_empty() {
            return Err(eyre::eyre!("domains.responder-suffix must not be empty"));
        }
        if self.domains.requester_suffix.is_empty() {
            return Err(eyre::eyre!("domains.requester-suffix must not be empty"));
        }
        if self.presence.heartbeat_interval_ms == 0 {
            return Err(eyre::eyre!("presence.heartbeat-interval-ms must be positive"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .handraise.yml
        let local_config = PathBuf::from(".handraise.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/handraise/handraise.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("handraise").join("handraise.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Email-domain suffixes that gate the two roles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainsConfig {
    /// Suffix granting the responder role (checked first)
    #[serde(rename = "responder-suffix")]
    pub responder_suffix: String,

    /// Suffix granting the requester role
    #[serde(rename = "requester-suffix")]
    pub requester_suffix: String,
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            responder_suffix: "@staff.example.edu".to_string(),
            requester_suffix: "@example.edu".to_string(),
        }
    }
}

/// Presence publishing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Interval between liveness heartbeats in milliseconds
    #[serde(rename = "heartbeat-interval-ms")]
    pub heartbeat_interval_ms: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 15_000,
        }
    }
}

/// Store channel sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Event bus capacity for presentation-layer notifications
    #[serde(rename = "event-capacity")]
    pub event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { event_capacity: 256 }
    }
}
