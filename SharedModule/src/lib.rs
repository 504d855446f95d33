//! # SharedModule
//!
//! World model and wire formats shared by every TileSpace participant. This
//! module contains the geometry and direction primitives, tile attributes,
//! world objects, players, the compact room metadata codec, the data channel
//! packets and the token/participant endpoint bodies.

// Export module structure
pub mod types;
pub mod direction;
pub mod tile;
pub mod object;
pub mod player;
pub mod metadata;
pub mod packet;
pub mod connection;
pub mod constants;
pub mod error;

// Re-export commonly used items for convenience
pub use types::Vector2;
pub use direction::{Direction, LeftRight};
pub use tile::{PortalTarget, TileAttribute, TileAttributes, TileParam};
pub use object::{MediaType, ObjectId, WorldObject};
pub use player::{AnimationState, CharacterName, ParticipantMetadata, Player};
pub use metadata::{decode_metadata, encode_metadata, RoomMetadata, RoomScalars};
pub use packet::{NetworkPacket, ObjectPayload};
pub use connection::{ConnectionDetails, RoomParticipantsInfo, TokenClaims, TokenRequest, TokenResponse};
pub use error::{MetadataError, PacketError, TokenError};
