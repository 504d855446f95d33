//! # Client Configuration
//!
//! Runtime settings of the client engine, loadable from JSON. Every field has
//! a default except the token server URL, which must be configured.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use tilespace_shared::constants::{audio, movement, network, tile};
use tilespace_shared::Vector2;

use crate::error::ClientError;

/// How distance is turned into spatializer parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// Position a 3D panner at the peer's relative position
    #[default]
    Panner,
    /// Linear gain falloff toward the earshot radius
    Gain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Token endpoint (HTTP POST)
    pub server_url: String,

    /// Participant listing endpoint (HTTP GET)
    pub participants_url: Option<String>,

    pub tile_size: i32,

    /// Discrete tile-stepping period
    pub tick_interval_ms: u64,

    /// Divisor applied to the remaining pixel gap each frame
    pub interpolation_divisor: i32,

    /// Earshot radius used until room metadata provides one
    pub default_earshot_radius: f64,

    /// Radius within which the nearest object can be triggered
    pub action_radius: f64,

    pub audio_mode: AudioMode,

    pub token_refresh_margin_secs: u64,

    /// Spawn tile used when the map defines none
    pub default_spawn: Vector2,

    /// Base directory used until room metadata provides one
    pub base_dir: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            participants_url: None,
            tile_size: tile::TILE_SIZE,
            tick_interval_ms: movement::DEFAULT_TICK_INTERVAL_MS,
            interpolation_divisor: movement::DEFAULT_INTERPOLATION_DIVISOR,
            default_earshot_radius: audio::DEFAULT_EARSHOT_RADIUS,
            action_radius: audio::DEFAULT_ACTION_RADIUS,
            audio_mode: AudioMode::default(),
            token_refresh_margin_secs: network::TOKEN_REFRESH_MARGIN_SECS,
            default_spawn: Vector2::new(tile::DEFAULT_SPAWN.0, tile::DEFAULT_SPAWN.1),
            base_dir: String::new(),
        }
    }
}

impl ClientConfig {
    /// Config pointing at the given token endpoint, everything else default.
    pub fn with_server_url(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json_str: &str) -> Result<Self, ClientError> {
        let config: ClientConfig = serde_json::from_str(json_str)
            .map_err(|e| ClientError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Misconfiguration is fatal at startup.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.server_url.trim().is_empty() {
            return Err(ClientError::Config("no server URL configured".into()));
        }
        if self.tile_size <= 0 {
            return Err(ClientError::Config(format!("tile size must be positive, got {}", self.tile_size)));
        }
        if self.interpolation_divisor < 1 {
            return Err(ClientError::Config(format!(
                "interpolation divisor must be at least 1, got {}",
                self.interpolation_divisor
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(ClientError::Config("tick interval must be non-zero".into()));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
