//! # World Objects
//!
//! Interactive map objects (media or script backed). An object's id is its
//! slot index in the room's object list and doubles as its wire id.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::Vector2;

/// Index of an object in the room's object list
pub type ObjectId = usize;

/// Kind of payload an object opens when triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    /// Audio media
    #[serde(rename = "a")]
    Audio,
    /// Image media
    #[serde(rename = "i")]
    Image,
    /// Video media
    #[serde(rename = "v")]
    Video,
    /// Embedded page
    #[serde(rename = "p")]
    Page,
    /// Script running in an isolated worker
    #[serde(rename = "s")]
    Script,
}

impl MediaType {
    pub fn code(self) -> &'static str {
        match self {
            MediaType::Audio => "a",
            MediaType::Image => "i",
            MediaType::Video => "v",
            MediaType::Page => "p",
            MediaType::Script => "s",
        }
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(MediaType::Audio),
            "i" => Ok(MediaType::Image),
            "v" => Ok(MediaType::Video),
            "p" => Ok(MediaType::Page),
            "s" => Ok(MediaType::Script),
            _ => Err(format!("Unknown media type: {}", s)),
        }
    }
}

/// A world object as held by the game state. The worker handle of a script
/// object is owned by the client engine, not by this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldObject {
    /// Pixel position, tile aligned
    pub position: Vector2,

    /// Sprite shown while inactive
    pub image: String,

    /// Sprite shown while active
    pub active_image: Option<String>,

    pub media_type: Option<MediaType>,

    /// Media or script location, relative to the room's base directory
    pub uri: Option<String>,

    pub active: bool,
}

impl WorldObject {
    pub fn new(position: Vector2, image: impl Into<String>) -> Self {
        Self {
            position,
            image: image.into(),
            active_image: None,
            media_type: None,
            uri: None,
            active: false,
        }
    }

    /// Objects with neither a uri nor an active image are decoration only.
    pub fn is_interactive(&self) -> bool {
        self.uri.is_some() || self.active_image.is_some()
    }

    pub fn is_script(&self) -> bool {
        self.media_type == Some(MediaType::Script)
    }

    /// Tile this object is aligned to.
    pub fn tile(&self, tile_size: i32) -> Vector2 {
        self.position.to_tile(tile_size)
    }

    /// Sprite for the current activation state.
    pub fn current_image(&self) -> &str {
        match (&self.active_image, self.active) {
            (Some(active_image), true) => active_image,
            _ => &self.image,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_requires_payload() {
        let mut object = WorldObject::new(Vector2::new(0, 0), "lamp.png");
        assert!(!object.is_interactive());
        object.active_image = Some("lamp_on.png".into());
        assert!(object.is_interactive());
        assert_eq!(object.current_image(), "lamp.png");
        object.active = true;
        assert_eq!(object.current_image(), "lamp_on.png");
    }

    #[test]
    fn media_type_codes() {
        assert_eq!("s".parse::<MediaType>(), Ok(MediaType::Script));
        assert_eq!(MediaType::Video.code(), "v");
        assert!("x".parse::<MediaType>().is_err());
    }
}
