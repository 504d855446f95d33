//! # Shared Constants
//!
//! Constants used across the shared model and the client engine.

/// Version of the TileSpace client
pub const TILESPACE_CLIENT_VERSION: &str = "0.1.0";

/// Tile grid constants
pub mod tile {
    /// Logical pixel size of one tile
    pub const TILE_SIZE: i32 = 32;

    /// Tile the players appear on when the map defines no spawn point
    pub const DEFAULT_SPAWN: (i32, i32) = (10, 0);
}

/// Movement constants
pub mod movement {
    /// Discrete tile-stepping period (in milliseconds)
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

    /// Most steps one clock update may catch up after a stall
    pub const MAX_CATCH_UP_STEPS: u32 = 3;

    /// Divisor applied to the remaining pixel gap on every rendered frame
    pub const DEFAULT_INTERPOLATION_DIVISOR: i32 = 4;
}

/// Network constants
pub mod network {
    /// Tokens are refreshed this many seconds before their expiry
    pub const TOKEN_REFRESH_MARGIN_SECS: u64 = 5 * 60;
}

/// Audio and interaction constants
pub mod audio {
    /// Default earshot radius in tile units
    pub const DEFAULT_EARSHOT_RADIUS: f64 = 8.0;

    /// Default radius (tile units) within which an object can be triggered
    pub const DEFAULT_ACTION_RADIUS: f64 = 1.5;
}
