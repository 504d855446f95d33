//! # TileSpace Client Module
//!
//! Client-side engine of a shared 2D tile room: game state, movement,
//! peer synchronization, object interaction and spatial audio.
//!
//! The system is organized into several sub-modules:
//! - `store`: The game state store and its change notifications
//! - `movement`: Tile stepping, collision and pixel interpolation
//! - `input`: Key and touch aggregation
//! - `net`: Data channel sync with remote participants, HTTP endpoints
//! - `object`: Object interaction, editor painting and object workers
//! - `audio`: Earshot gating and spatialization
//! - `auth`: Room token caching
//! - `room`: Loading and saving room metadata
//! - `client`: The engine facade tying everything together

use log::info;

// Module declarations
pub mod config;      // Runtime settings
pub mod error;       // Error types
pub mod store;       // Game state
pub mod movement;    // Stepping and interpolation
pub mod input;       // Input aggregation
pub mod net;         // Network layer
pub mod object;      // Objects and workers
pub mod audio;       // Spatial audio
pub mod auth;        // Tokens
pub mod room;        // Room metadata
pub mod client;      // Engine facade

// Re-export commonly used items
pub use config::{AudioMode, ClientConfig};
pub use error::{AuthError, ClientError};
pub use store::{EditorTool, GameStore, StoreEvent};
pub use input::InputKey;
pub use net::{RemoteParticipant, Transport};
pub use net::http::{HttpParticipantsService, HttpTokenService, ParticipantsService};
pub use object::worker::{register_script, ObjectScript, WorkerCommand, WorkerReply};
pub use audio::{AudioRenderer, MediaStreamInfo, SpatialParams};
pub use auth::{TokenCache, TokenService};
pub use client::{guest_username, SpaceClient, TileAction};

/// Initialize the client module
pub fn init() {
    info!(
        "Initializing TileSpace client module v{}",
        tilespace_shared::constants::TILESPACE_CLIENT_VERSION
    );
}
