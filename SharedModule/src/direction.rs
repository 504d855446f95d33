//! # Compass Directions
//!
//! 8-way facing used by players, one-way impassable tiles, spawn points and
//! portals, plus the mapping to the legacy left/right sprite orientation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the eight compass directions. "Any direction" is `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

/// Legacy two-way sprite orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeftRight {
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// Combine held movement keys into the resultant direction.
    ///
    /// North if up-not-down, south if down-not-up; east if right-not-left,
    /// west if left-not-right. Opposing keys cancel. Returns `None` when no
    /// axis survives.
    pub fn from_input(up: bool, down: bool, left: bool, right: bool) -> Option<Direction> {
        let vertical = match (up, down) {
            (true, false) => Some(Direction::N),
            (false, true) => Some(Direction::S),
            _ => None,
        };
        let horizontal = match (right, left) {
            (true, false) => Some(Direction::E),
            (false, true) => Some(Direction::W),
            _ => None,
        };

        match (vertical, horizontal) {
            (Some(v), Some(h)) => Some(v.combine(h)),
            (Some(v), None) => Some(v),
            (None, Some(h)) => Some(h),
            (None, None) => None,
        }
    }

    fn combine(self, horizontal: Direction) -> Direction {
        match (self, horizontal) {
            (Direction::N, Direction::E) => Direction::NE,
            (Direction::N, Direction::W) => Direction::NW,
            (Direction::S, Direction::E) => Direction::SE,
            (Direction::S, Direction::W) => Direction::SW,
            (other, _) => other,
        }
    }

    /// Tile step `(dx, dy)` for this direction; north is negative y.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::N => (0, -1),
            Direction::S => (0, 1),
            Direction::E => (1, 0),
            Direction::W => (-1, 0),
            Direction::NE => (1, -1),
            Direction::NW => (-1, -1),
            Direction::SE => (1, 1),
            Direction::SW => (-1, 1),
        }
    }

    /// East/west component, if any.
    pub fn horizontal(self) -> Option<Direction> {
        match self {
            Direction::E | Direction::NE | Direction::SE => Some(Direction::E),
            Direction::W | Direction::NW | Direction::SW => Some(Direction::W),
            Direction::N | Direction::S => None,
        }
    }

    /// North/south component, if any.
    pub fn vertical(self) -> Option<Direction> {
        match self {
            Direction::N | Direction::NE | Direction::NW => Some(Direction::N),
            Direction::S | Direction::SE | Direction::SW => Some(Direction::S),
            Direction::E | Direction::W => None,
        }
    }

    pub fn is_diagonal(self) -> bool {
        self.horizontal().is_some() && self.vertical().is_some()
    }

    /// Whether a north-ish facing; used for draw ordering.
    pub fn faces_north(self) -> bool {
        self.vertical() == Some(Direction::N)
    }

    pub fn faces_south(self) -> bool {
        self.vertical() == Some(Direction::S)
    }

    pub fn to_left_right(self) -> LeftRight {
        match self {
            Direction::N | Direction::NE | Direction::E | Direction::SE => LeftRight::Right,
            Direction::S | Direction::SW | Direction::W | Direction::NW => LeftRight::Left,
        }
    }

    pub fn from_left_right(legacy: LeftRight) -> Direction {
        match legacy {
            LeftRight::Left => Direction::W,
            LeftRight::Right => Direction::E,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::N => "N",
            Direction::S => "S",
            Direction::E => "E",
            Direction::W => "W",
            Direction::NE => "NE",
            Direction::NW => "NW",
            Direction::SE => "SE",
            Direction::SW => "SW",
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Direction::N => "↑",
            Direction::NE => "↗",
            Direction::E => "→",
            Direction::SE => "↘",
            Direction::S => "↓",
            Direction::SW => "↙",
            Direction::W => "←",
            Direction::NW => "↖",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Unknown direction: {}", s))
    }
}

impl LeftRight {
    pub fn as_str(self) -> &'static str {
        match self {
            LeftRight::Left => "left",
            LeftRight::Right => "right",
        }
    }
}

impl FromStr for LeftRight {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(LeftRight::Left),
            "right" => Ok(LeftRight::Right),
            _ => Err(format!("Unknown legacy direction: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resultant_direction_cancels_opposites() {
        assert_eq!(Direction::from_input(true, false, false, true), Some(Direction::NE));
        assert_eq!(Direction::from_input(false, true, true, false), Some(Direction::SW));
        assert_eq!(Direction::from_input(true, true, false, true), Some(Direction::E));
        assert_eq!(Direction::from_input(true, true, true, true), None);
        assert_eq!(Direction::from_input(false, false, false, false), None);
    }

    #[test]
    fn diagonal_components() {
        assert_eq!(Direction::SW.horizontal(), Some(Direction::W));
        assert_eq!(Direction::SW.vertical(), Some(Direction::S));
        assert_eq!(Direction::N.horizontal(), None);
        assert!(Direction::NE.is_diagonal());
        assert!(!Direction::E.is_diagonal());
    }

    #[test]
    fn legacy_orientation() {
        assert_eq!(Direction::N.to_left_right(), LeftRight::Right);
        assert_eq!(Direction::S.to_left_right(), LeftRight::Left);
        assert_eq!(Direction::from_left_right(LeftRight::Left), Direction::W);
        assert_eq!("right".parse::<LeftRight>(), Ok(LeftRight::Right));
    }

    #[test]
    fn parses_and_serializes_as_compass_text() {
        assert_eq!("NW".parse::<Direction>(), Ok(Direction::NW));
        assert!("X".parse::<Direction>().is_err());
        assert_eq!(serde_json::to_string(&Direction::SE).unwrap(), "\"SE\"");
    }
}
