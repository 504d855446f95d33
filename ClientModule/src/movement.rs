//! # Movement
//!
//! Discrete tile stepping with collision, the fixed-period movement timer and
//! the per-frame pixel interpolation that trails behind it.

use std::time::Duration;

use log::trace;
use tilespace_shared::constants::movement::MAX_CATCH_UP_STEPS;
use tilespace_shared::{Direction, TileAttributes, Vector2};

/// Attempt a single tile step from `from` in `direction`.
///
/// A diagonal step that is blocked falls back to its horizontal part, then
/// to its vertical part. Whether a tile blocks depends on `facing`, which is
/// the mover's current facing rather than the step direction. Returns the new
/// tile, or `None` when every candidate is blocked. In edit mode nothing blocks.
pub fn try_step(
    tiles: &TileAttributes,
    from: Vector2,
    direction: Direction,
    facing: Direction,
    edit_mode: bool,
) -> Option<Vector2> {
    let candidates = [Some(direction), direction.horizontal(), direction.vertical()];
    let mut tried: Vec<Direction> = Vec::with_capacity(3);

    for candidate in candidates.into_iter().flatten() {
        if tried.contains(&candidate) {
            continue;
        }
        tried.push(candidate);

        let (dx, dy) = candidate.delta();
        let next = from.offset(dx, dy);
        if edit_mode || !tiles.is_blocked(next, facing) {
            return Some(next);
        }
        trace!("Step {} from {} blocked at {}", candidate, from, next);
    }
    None
}

/// One frame of interpolation along a single axis.
///
/// The step is the remaining gap divided by `divisor`, rounded away from
/// zero, so it never exceeds the gap and always makes progress.
fn advance_axis(current: i32, target: i32, divisor: i32) -> i32 {
    let gap = target - current;
    let divisor = divisor.max(1);
    if gap > 0 {
        current + (gap + divisor - 1) / divisor
    } else if gap < 0 {
        current + gap.div_euclid(divisor)
    } else {
        current
    }
}

/// Advance a pixel position one frame toward `target` (also in pixels).
pub fn advance_position(current: Vector2, target: Vector2, divisor: i32) -> Vector2 {
    Vector2::new(
        advance_axis(current.x, target.x, divisor),
        advance_axis(current.y, target.y, divisor),
    )
}

/// Fixed-period stepping timer.
///
/// Runs exactly while a resultant direction exists. Starting a running timer
/// or stopping a stopped one does nothing, so there is never more than one
/// active period.
#[derive(Debug, Clone)]
pub struct MovementTimer {
    interval: Duration,
    accumulated: Duration,
    running: bool,
}

impl MovementTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: Duration::ZERO,
            running: false,
        }
    }

    /// Returns true when the timer was not already running; the caller
    /// takes the first step immediately in that case.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.accumulated = Duration::ZERO;
        true
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.accumulated = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Feed elapsed time; returns how many ticks fired. A stall longer than
    /// the catch-up allowance is forgotten rather than replayed.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if !self.running || self.interval.is_zero() {
            return 0;
        }
        self.accumulated += elapsed;
        let mut ticks = 0;
        while self.accumulated >= self.interval && ticks < MAX_CATCH_UP_STEPS {
            self.accumulated -= self.interval;
            ticks += 1;
        }
        if self.accumulated >= self.interval {
            trace!("Dropping {:?} of movement backlog", self.accumulated);
            self.accumulated = Duration::ZERO;
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilespace_shared::{decode_metadata, TileParam};

    fn wall(direction: Option<Direction>) -> TileAttributes {
        [(Vector2::new(5, 5), TileParam::Impassable { direction })].into_iter().collect()
    }

    #[test]
    fn unrestricted_wall_blocks() {
        let tiles = wall(None);
        let from = Vector2::new(4, 5);
        assert_eq!(try_step(&tiles, from, Direction::E, Direction::E, false), None);
    }

    #[test]
    fn one_way_wall_passes_matching_facing() {
        let tiles = wall(Some(Direction::E));
        let from = Vector2::new(4, 5);
        assert_eq!(
            try_step(&tiles, from, Direction::E, Direction::E, false),
            Some(Vector2::new(5, 5))
        );
    }

    #[test]
    fn one_way_wall_from_metadata_blocks_wrong_facing() {
        let metadata = decode_metadata(r#"{"I":[[5,5,"E"]]}"#, 32).unwrap();
        let from = Vector2::new(4, 5);
        assert_eq!(
            try_step(&metadata.tile_attributes, from, Direction::E, Direction::W, false),
            None
        );
    }

    #[test]
    fn blocked_diagonal_slides_along_an_axis() {
        // Wall to the north-east; horizontal part is free.
        let tiles: TileAttributes = [(Vector2::new(5, 4), TileParam::Impassable { direction: None })]
            .into_iter()
            .collect();
        let from = Vector2::new(4, 5);
        assert_eq!(
            try_step(&tiles, from, Direction::NE, Direction::NE, false),
            Some(Vector2::new(5, 5))
        );

        // Diagonal and horizontal blocked; vertical is free.
        let tiles: TileAttributes = [
            (Vector2::new(5, 4), TileParam::Impassable { direction: None }),
            (Vector2::new(5, 5), TileParam::Impassable { direction: None }),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            try_step(&tiles, from, Direction::NE, Direction::NE, false),
            Some(Vector2::new(4, 4))
        );
    }

    #[test]
    fn edit_mode_walks_through_walls() {
        let tiles = wall(None);
        assert_eq!(
            try_step(&tiles, Vector2::new(4, 5), Direction::E, Direction::W, true),
            Some(Vector2::new(5, 5))
        );
    }

    #[test]
    fn interpolation_converges_without_overshoot() {
        for (start, target) in [(0, 320), (320, 0), (17, 18), (-64, 97)] {
            let target = Vector2::new(target, -target);
            let mut pos = Vector2::new(start, -start);
            let mut frames = 0;
            while pos != target {
                let next = advance_position(pos, target, 4);
                assert!((target.x - next.x).abs() < (target.x - pos.x).abs() || target.x == pos.x);
                assert!((target.y - next.y).abs() < (target.y - pos.y).abs() || target.y == pos.y);
                assert!((next.x - pos.x).signum() * (target.x - next.x).signum() >= 0);
                pos = next;
                frames += 1;
                assert!(frames < 64, "did not converge");
            }
        }
    }

    #[test]
    fn timer_start_is_idempotent() {
        let mut timer = MovementTimer::new(Duration::from_millis(100));
        assert_eq!(timer.advance(Duration::from_millis(500)), 0);
        assert!(timer.start());
        assert!(!timer.start());
        assert_eq!(timer.advance(Duration::from_millis(250)), 2);
        assert_eq!(timer.advance(Duration::from_millis(50)), 1);
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.advance(Duration::from_millis(500)), 0);
    }

    #[test]
    fn stalls_are_not_replayed() {
        let mut timer = MovementTimer::new(Duration::from_millis(100));
        timer.start();
        assert_eq!(timer.advance(Duration::from_secs(5)), MAX_CATCH_UP_STEPS);
        assert_eq!(timer.advance(Duration::from_millis(50)), 0);
        assert_eq!(timer.advance(Duration::from_millis(50)), 1);
    }
}
