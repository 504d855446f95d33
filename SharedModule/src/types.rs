//! # Common Types
//!
//! Geometry primitives shared by the world model, the metadata codec and the
//! network packets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer 2D vector.
///
/// Dual-use: a tile coordinate or a pixel offset depending on context. The
/// caller tracks which unit an instance is in; the helpers below name the
/// conversion they perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: i32,
    pub y: i32,
}

impl Vector2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Tile coordinate to pixel position using the given tile size.
    pub fn to_pixels(self, tile_size: i32) -> Self {
        Self::new(self.x * tile_size, self.y * tile_size)
    }

    /// Pixel position to the tile it is aligned to (rounded to nearest).
    pub fn to_tile(self, tile_size: i32) -> Self {
        let size = tile_size.max(1) as f64;
        Self::new(
            (self.x as f64 / size).round() as i32,
            (self.y as f64 / size).round() as i32,
        )
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Component-wise difference `self - other`.
    pub fn sub(self, other: Vector2) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    /// Euclidean length
    pub fn length(self) -> f64 {
        ((self.x as f64).powi(2) + (self.y as f64).powi(2)).sqrt()
    }

    /// Euclidean distance between two vectors of the same unit.
    pub fn distance(self, other: Vector2) -> f64 {
        self.sub(other).length()
    }

    /// Textual `"x,y"` key used by the map editor and debug overlays.
    pub fn tile_key(self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// Parse a `"x,y"` key back into a coordinate.
    pub fn from_tile_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(Self::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_key_parses_back() {
        let v = Vector2::new(-3, 12);
        assert_eq!(v.tile_key(), "-3,12");
        assert_eq!(Vector2::from_tile_key("-3,12"), Some(v));
        assert_eq!(Vector2::from_tile_key("3;12"), None);
    }

    #[test]
    fn pixel_and_tile_conversion() {
        let tile = Vector2::new(10, 10);
        let px = tile.to_pixels(32);
        assert_eq!(px, Vector2::new(320, 320));
        assert_eq!(px.to_tile(32), tile);
        assert_eq!(Vector2::new(330, 305).to_tile(32), tile);
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(Vector2::new(0, 0).distance(Vector2::new(3, 4)), 5.0);
    }
}
