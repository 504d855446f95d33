//! # Player Types
//!
//! Avatars shown on the map: the locally controlled one and the mirrors of
//! remote participants.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::direction::Direction;
use crate::types::Vector2;

/// Sprite animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationState {
    #[default]
    Idle,
    Walk,
}

impl AnimationState {
    pub fn as_str(self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Walk => "walk",
        }
    }
}

impl FromStr for AnimationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AnimationState::Idle),
            "walk" => Ok(AnimationState::Walk),
            _ => Err(format!("Unknown animation: {}", s)),
        }
    }
}

/// Selectable character sprites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterName {
    #[default]
    Doux,
    Mort,
    Targ,
    Vita,
}

impl CharacterName {
    pub const ALL: [CharacterName; 4] = [
        CharacterName::Doux,
        CharacterName::Mort,
        CharacterName::Targ,
        CharacterName::Vita,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CharacterName::Doux => "doux",
            CharacterName::Mort => "mort",
            CharacterName::Targ => "targ",
            CharacterName::Vita => "vita",
        }
    }
}

/// Metadata each participant attaches to its session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantMetadata {
    pub character: CharacterName,
}

impl ParticipantMetadata {
    /// Extract the character from a participant's metadata string.
    pub fn character_of(metadata: &str) -> Option<CharacterName> {
        serde_json::from_str::<ParticipantMetadata>(metadata)
            .ok()
            .map(|m| m.character)
    }
}

/// A player avatar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique participant identity
    pub username: String,

    /// Rendered pixel position, interpolated toward `target_pos`
    pub position: Vector2,

    /// Discrete movement goal in tile units
    pub target_pos: Vector2,

    pub animation: AnimationState,

    pub character: CharacterName,

    pub direction: Direction,
}

impl Player {
    /// A player standing still at `tile`.
    pub fn spawn(
        username: impl Into<String>,
        character: CharacterName,
        tile: Vector2,
        direction: Direction,
        tile_size: i32,
    ) -> Self {
        Self {
            username: username.into(),
            position: tile.to_pixels(tile_size),
            target_pos: tile,
            animation: AnimationState::Idle,
            character,
            direction,
        }
    }

    /// Whether the rendered position has caught up with the target tile.
    pub fn is_settled(&self, tile_size: i32) -> bool {
        self.position == self.target_pos.to_pixels(tile_size)
    }
}
