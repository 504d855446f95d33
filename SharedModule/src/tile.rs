//! # Tile Attributes
//!
//! Behaviors bound to single tile coordinates: impassable walls (optionally
//! one-way), spawn points, portals, private zones and spotlights.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::direction::Direction;
use crate::types::Vector2;

/// Where a portal leads. At least one of room or coordinate is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortalTarget {
    /// Another room, arriving at its spawn point
    Room(String),
    /// Another tile in the same room
    Coordinate(Vector2),
    /// A specific tile in another room
    RoomCoordinate(String, Vector2),
}

impl PortalTarget {
    /// Build a target from the optional parts; `None` if both are absent.
    pub fn from_parts(room: Option<String>, coordinate: Option<Vector2>) -> Option<Self> {
        match (room, coordinate) {
            (Some(room), Some(coordinate)) => Some(PortalTarget::RoomCoordinate(room, coordinate)),
            (Some(room), None) => Some(PortalTarget::Room(room)),
            (None, Some(coordinate)) => Some(PortalTarget::Coordinate(coordinate)),
            (None, None) => None,
        }
    }

    pub fn room(&self) -> Option<&str> {
        match self {
            PortalTarget::Room(room) | PortalTarget::RoomCoordinate(room, _) => Some(room),
            PortalTarget::Coordinate(_) => None,
        }
    }

    pub fn coordinate(&self) -> Option<Vector2> {
        match self {
            PortalTarget::Coordinate(c) | PortalTarget::RoomCoordinate(_, c) => Some(*c),
            PortalTarget::Room(_) => None,
        }
    }
}

/// A tile attribute, dispatched by variant rather than by a `type` string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TileParam {
    Impassable {
        direction: Option<Direction>,
    },
    Spawn {
        direction: Option<Direction>,
    },
    Portal {
        direction: Option<Direction>,
        target: PortalTarget,
    },
    Private {
        identifier: String,
    },
    Spotlight {
        identifier: String,
    },
}

/// Attribute discriminant, used for tool palettes and list keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileAttribute {
    Impassable,
    Spawn,
    Portal,
    Private,
    Spotlight,
}

impl TileParam {
    pub fn attribute(&self) -> TileAttribute {
        match self {
            TileParam::Impassable { .. } => TileAttribute::Impassable,
            TileParam::Spawn { .. } => TileAttribute::Spawn,
            TileParam::Portal { .. } => TileAttribute::Portal,
            TileParam::Private { .. } => TileAttribute::Private,
            TileParam::Spotlight { .. } => TileAttribute::Spotlight,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            TileParam::Impassable { direction }
            | TileParam::Spawn { direction }
            | TileParam::Portal { direction, .. } => *direction,
            TileParam::Private { .. } | TileParam::Spotlight { .. } => None,
        }
    }

    /// Whether a mover facing `facing` is kept out of this tile.
    ///
    /// Impassable tiles with a stored direction are one-way: a mover whose
    /// facing equals that direction passes through.
    pub fn blocks(&self, facing: Direction) -> bool {
        match self {
            TileParam::Impassable { direction: None } => true,
            TileParam::Impassable { direction: Some(allowed) } => *allowed != facing,
            _ => false,
        }
    }
}

impl TileAttribute {
    pub fn name(self) -> &'static str {
        match self {
            TileAttribute::Impassable => "impassable",
            TileAttribute::Spawn => "spawn",
            TileAttribute::Portal => "portal",
            TileAttribute::Private => "private",
            TileAttribute::Spotlight => "spotlight",
        }
    }
}

/// Tile attributes keyed by tile coordinate. At most one per tile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileAttributes {
    tiles: HashMap<Vector2, TileParam>,
}

impl TileAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tile: Vector2) -> Option<&TileParam> {
        self.tiles.get(&tile)
    }

    /// Set or erase (`None`) the attribute at `tile`. Returns the previous one.
    pub fn set(&mut self, tile: Vector2, param: Option<TileParam>) -> Option<TileParam> {
        match param {
            Some(param) => self.tiles.insert(tile, param),
            None => self.tiles.remove(&tile),
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vector2, &TileParam)> {
        self.tiles.iter()
    }

    /// Entries sorted by (y, x) so encoded output is stable.
    pub fn sorted(&self) -> Vec<(Vector2, &TileParam)> {
        let mut entries: Vec<_> = self.tiles.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(k, _)| (k.y, k.x));
        entries
    }

    /// All spawn tiles with their facing, in stable order.
    pub fn spawn_points(&self) -> Vec<(Vector2, Option<Direction>)> {
        self.sorted()
            .into_iter()
            .filter_map(|(tile, param)| match param {
                TileParam::Spawn { direction } => Some((tile, *direction)),
                _ => None,
            })
            .collect()
    }

    /// Whether entering `tile` while facing `facing` is blocked.
    pub fn is_blocked(&self, tile: Vector2, facing: Direction) -> bool {
        self.tiles.get(&tile).is_some_and(|param| param.blocks(facing))
    }
}

impl FromIterator<(Vector2, TileParam)> for TileAttributes {
    fn from_iter<I: IntoIterator<Item = (Vector2, TileParam)>>(iter: I) -> Self {
        Self {
            tiles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_way_impassable_lets_matching_facing_through() {
        let wall = TileParam::Impassable { direction: Some(Direction::E) };
        assert!(!wall.blocks(Direction::E));
        assert!(wall.blocks(Direction::W));
        assert!(TileParam::Impassable { direction: None }.blocks(Direction::E));
        assert!(!TileParam::Spawn { direction: None }.blocks(Direction::E));
    }

    #[test]
    fn setting_none_erases() {
        let mut tiles = TileAttributes::new();
        let at = Vector2::new(1, 2);
        tiles.set(at, Some(TileParam::Private { identifier: "office".into() }));
        assert_eq!(tiles.len(), 1);
        let previous = tiles.set(at, None);
        assert!(matches!(previous, Some(TileParam::Private { .. })));
        assert!(tiles.is_empty());
    }

    #[test]
    fn portal_target_requires_a_part() {
        assert_eq!(PortalTarget::from_parts(None, None), None);
        let target = PortalTarget::from_parts(Some("Dark".into()), Some(Vector2::new(1, 1))).unwrap();
        assert_eq!(target.room(), Some("Dark"));
        assert_eq!(target.coordinate(), Some(Vector2::new(1, 1)));
    }
}
