//! # Input
//!
//! Aggregates held movement keys (and an optional touch joystick) into a
//! resultant direction, and turns the action key into a one-shot trigger.

use std::str::FromStr;

use tilespace_shared::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKey {
    Up,
    Down,
    Left,
    Right,
    Action,
}

impl FromStr for InputKey {
    type Err = String;

    /// Accepts browser-style key names and WASD.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowUp" | "w" | "W" => Ok(InputKey::Up),
            "ArrowDown" | "s" | "S" => Ok(InputKey::Down),
            "ArrowLeft" | "a" | "A" => Ok(InputKey::Left),
            "ArrowRight" | "d" | "D" => Ok(InputKey::Right),
            " " | "Space" | "Enter" | "e" | "E" => Ok(InputKey::Action),
            _ => Err(format!("Unbound key: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputState {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
    touch: Option<Direction>,
    action_pending: bool,
    action_held: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: InputKey) {
        match key {
            InputKey::Up => self.up = true,
            InputKey::Down => self.down = true,
            InputKey::Left => self.left = true,
            InputKey::Right => self.right = true,
            InputKey::Action => {
                // Key repeat does not retrigger
                if !self.action_held {
                    self.action_pending = true;
                }
                self.action_held = true;
            }
        }
    }

    pub fn release(&mut self, key: InputKey) {
        match key {
            InputKey::Up => self.up = false,
            InputKey::Down => self.down = false,
            InputKey::Left => self.left = false,
            InputKey::Right => self.right = false,
            InputKey::Action => self.action_held = false,
        }
    }

    /// Direction reported by an on-screen joystick; `None` when released.
    pub fn set_touch_direction(&mut self, direction: Option<Direction>) {
        self.touch = direction;
    }

    /// Combined direction of all held keys; the touch joystick wins when active.
    pub fn resultant(&self) -> Option<Direction> {
        self.touch
            .or_else(|| Direction::from_input(self.up, self.down, self.left, self.right))
    }

    /// Consume a pending action press.
    pub fn take_action(&mut self) -> bool {
        std::mem::take(&mut self.action_pending)
    }

    /// Drop every held key, e.g. when entering chat mode.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
