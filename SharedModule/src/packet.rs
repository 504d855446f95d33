//! # Data Channel Packets
//!
//! Small tagged JSON packets exchanged between peers over the unordered,
//! best-effort data channel:
//!
//! ```text
//! {"channelId":"position","payload":{"x":3,"y":4}}
//! {"channelId":"direction","payload":"NE"}
//! {"channelId":"animation","payload":"walk"}
//! {"channelId":"object","payload":{"id":2,"active":true}}
//! ```
//!
//! Every packet fully replaces one field of the sender's state, so duplicate
//! or reordered delivery converges on the next packet.

use serde::{Deserialize, Serialize};

use crate::direction::{Direction, LeftRight};
use crate::error::PacketError;
use crate::object::ObjectId;
use crate::player::AnimationState;
use crate::types::Vector2;

/// Target tile on the wire. Peers may send fractional numbers; they are
/// rounded to the nearest tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePosition {
    pub x: f64,
    pub y: f64,
}

impl WirePosition {
    pub fn tile(self) -> Vector2 {
        Vector2::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl From<Vector2> for WirePosition {
    fn from(v: Vector2) -> Self {
        Self {
            x: v.x as f64,
            y: v.y as f64,
        }
    }
}

/// Animation payload. Older peers send `"<animation>_<left|right>"`; the
/// orientation part is kept so it can be applied as a facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AnimationPayload {
    pub animation: AnimationState,
    pub legacy_direction: Option<Direction>,
}

impl AnimationPayload {
    pub fn new(animation: AnimationState) -> Self {
        Self {
            animation,
            legacy_direction: None,
        }
    }
}

impl TryFrom<String> for AnimationPayload {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.split_once('_') {
            Some((animation, legacy)) => Ok(Self {
                animation: animation.parse()?,
                legacy_direction: Some(Direction::from_left_right(legacy.parse::<LeftRight>()?)),
            }),
            None => Ok(Self::new(value.parse()?)),
        }
    }
}

impl From<AnimationPayload> for String {
    fn from(payload: AnimationPayload) -> Self {
        match payload.legacy_direction {
            Some(direction) => format!(
                "{}_{}",
                payload.animation.as_str(),
                direction.to_left_right().as_str()
            ),
            None => payload.animation.as_str().to_string(),
        }
    }
}

/// Object activation change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPayload {
    pub id: ObjectId,
    pub active: bool,
}

/// A data channel packet, tagged by `channelId`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channelId", content = "payload", rename_all = "lowercase")]
pub enum NetworkPacket {
    Position(WirePosition),
    Direction(Direction),
    Animation(AnimationPayload),
    Object(ObjectPayload),
}

impl NetworkPacket {
    pub fn position(tile: Vector2) -> Self {
        NetworkPacket::Position(tile.into())
    }

    pub fn animation(animation: AnimationState) -> Self {
        NetworkPacket::Animation(AnimationPayload::new(animation))
    }

    pub fn object(id: ObjectId, active: bool) -> Self {
        NetworkPacket::Object(ObjectPayload { id, active })
    }

    pub fn channel_id(&self) -> &'static str {
        match self {
            NetworkPacket::Position(_) => "position",
            NetworkPacket::Direction(_) => "direction",
            NetworkPacket::Animation(_) => "animation",
            NetworkPacket::Object(_) => "object",
        }
    }

    /// UTF-8 JSON bytes for the transport
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_matches_channel_layout() {
        let bytes = NetworkPacket::position(Vector2::new(3, 4)).encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"channelId":"position","payload":{"x":3.0,"y":4.0}}));

        let bytes = NetworkPacket::object(2, true).encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value, serde_json::json!({"channelId":"object","payload":{"id":2,"active":true}}));
    }

    #[test]
    fn decodes_integer_and_fractional_positions() {
        let packet = NetworkPacket::decode(br#"{"channelId":"position","payload":{"x":3,"y":4}}"#).unwrap();
        assert_eq!(packet, NetworkPacket::position(Vector2::new(3, 4)));

        let packet = NetworkPacket::decode(br#"{"channelId":"position","payload":{"x":2.6,"y":-0.2}}"#).unwrap();
        match packet {
            NetworkPacket::Position(p) => assert_eq!(p.tile(), Vector2::new(3, 0)),
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn legacy_animation_carries_orientation() {
        let packet = NetworkPacket::decode(br#"{"channelId":"animation","payload":"walk_left"}"#).unwrap();
        assert_eq!(
            packet,
            NetworkPacket::Animation(AnimationPayload {
                animation: AnimationState::Walk,
                legacy_direction: Some(Direction::W),
            })
        );

        let packet = NetworkPacket::decode(br#"{"channelId":"animation","payload":"idle"}"#).unwrap();
        assert_eq!(packet, NetworkPacket::animation(AnimationState::Idle));
    }

    #[test]
    fn rejects_unknown_channels_and_bad_bytes() {
        assert!(NetworkPacket::decode(br#"{"channelId":"chat","payload":"hi"}"#).is_err());
        assert!(NetworkPacket::decode(&[0xff, 0xfe]).is_err());
        assert!(NetworkPacket::decode(br#"{"channelId":"animation","payload":"run"}"#).is_err());
    }
}
