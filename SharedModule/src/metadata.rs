//! # Room Metadata Codec
//!
//! Converts between the typed world model (tile attributes, objects and room
//! scalars) and the compact positional-array JSON stored as room metadata.
//!
//! ```text
//! {
//!   "B": "https://host/rooms/dark/",   base directory
//!   "E": 8,                            earshot radius (tiles)
//!   "M": 1,                            debug mode
//!   "U": 1700000000000,                updated timestamp (ms)
//!   "A": [[x, y, identifier]],         spotlight
//!   "D": [[x, y, dir?, room?, tx?, ty?]], portal
//!   "I": [[x, y, dir?]],               impassable
//!   "P": [[x, y, identifier]],         private
//!   "S": [[x, y, dir?]],               spawn
//!   "O": [[x, y, image, activeImage|0, mediaType|0, uri|0]]
//! }
//! ```
//!
//! Tile tuples drop trailing absent fields; an absent field followed by a
//! present one is written as `null`. Object tuples always carry every slot,
//! using `0` for absent fields. All coordinates are tile units.

use log::{debug, warn};
use serde_json::{json, Map, Value};

use crate::direction::Direction;
use crate::error::MetadataError;
use crate::object::{MediaType, WorldObject};
use crate::tile::{PortalTarget, TileAttribute, TileAttributes, TileParam};
use crate::types::Vector2;

const KEY_BASE_DIR: &str = "B";
const KEY_EARSHOT: &str = "E";
const KEY_DEBUG: &str = "M";
const KEY_UPDATED: &str = "U";
const KEY_OBJECTS: &str = "O";

/// List key for each tile attribute type
const TILE_KEYS: [(&str, TileAttribute); 5] = [
    ("A", TileAttribute::Spotlight),
    ("D", TileAttribute::Portal),
    ("I", TileAttribute::Impassable),
    ("P", TileAttribute::Private),
    ("S", TileAttribute::Spawn),
];

/// Room-level scalar fields; `None` means "not present in the metadata".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomScalars {
    pub base_dir: Option<String>,
    pub earshot_radius: Option<f64>,
    pub debug_mode: Option<bool>,
    pub updated: Option<u64>,
}

/// Fully decoded room metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomMetadata {
    pub tile_attributes: TileAttributes,
    pub objects: Vec<WorldObject>,
    pub scalars: RoomScalars,
}

fn tile_key_for(attribute: TileAttribute) -> &'static str {
    TILE_KEYS
        .iter()
        .find(|(_, a)| *a == attribute)
        .map(|(k, _)| *k)
        .unwrap_or("I")
}

fn attribute_for_key(key: &str) -> Option<TileAttribute> {
    TILE_KEYS.iter().find(|(k, _)| *k == key).map(|(_, a)| *a)
}

/// Decode a metadata string.
///
/// The whole payload is validated before anything is returned, so a failure
/// never yields a partially decoded world.
pub fn decode_metadata(json_str: &str, tile_size: i32) -> Result<RoomMetadata, MetadataError> {
    let root: Value = serde_json::from_str(json_str)?;
    let map = root.as_object().ok_or(MetadataError::NotAnObject)?;

    let mut metadata = RoomMetadata::default();

    for (key, value) in map {
        match key.as_str() {
            KEY_BASE_DIR => {
                let base_dir = value
                    .as_str()
                    .ok_or_else(|| MetadataError::field(key, 0, "expected a string"))?;
                metadata.scalars.base_dir = Some(base_dir.to_string());
            }
            KEY_EARSHOT => {
                let radius = value
                    .as_f64()
                    .ok_or_else(|| MetadataError::field(key, 0, "expected a number"))?;
                metadata.scalars.earshot_radius = Some(radius);
            }
            KEY_DEBUG => {
                let flag = value
                    .as_f64()
                    .map(|n| n != 0.0)
                    .or_else(|| value.as_bool())
                    .ok_or_else(|| MetadataError::field(key, 0, "expected a number"))?;
                metadata.scalars.debug_mode = Some(flag);
            }
            KEY_UPDATED => {
                let updated = value
                    .as_f64()
                    .ok_or_else(|| MetadataError::field(key, 0, "expected a number"))?;
                metadata.scalars.updated = Some(updated.max(0.0) as u64);
            }
            KEY_OBJECTS => {
                for (index, tuple) in tuples(key, value)?.iter().enumerate() {
                    metadata.objects.push(decode_object(key, index, tuple, tile_size)?);
                }
            }
            other => match attribute_for_key(other) {
                Some(attribute) => {
                    for (index, tuple) in tuples(key, value)?.iter().enumerate() {
                        let (tile, param) = decode_tile(key, index, tuple, attribute)?;
                        metadata.tile_attributes.set(tile, Some(param));
                    }
                }
                None => debug!("Skipping unknown metadata key: {}", other),
            },
        }
    }

    debug!(
        "Decoded metadata: {} tile attributes, {} objects",
        metadata.tile_attributes.len(),
        metadata.objects.len()
    );

    Ok(metadata)
}

/// Encode the world into a metadata string.
pub fn encode_metadata<'a>(
    tile_attributes: &TileAttributes,
    objects: impl IntoIterator<Item = &'a WorldObject>,
    scalars: &RoomScalars,
    tile_size: i32,
) -> Result<String, MetadataError> {
    let mut root = Map::new();

    if let Some(base_dir) = &scalars.base_dir {
        root.insert(KEY_BASE_DIR.into(), json!(base_dir));
    }
    if let Some(radius) = scalars.earshot_radius {
        root.insert(KEY_EARSHOT.into(), json!(radius));
    }
    if let Some(debug_mode) = scalars.debug_mode {
        root.insert(KEY_DEBUG.into(), json!(if debug_mode { 1 } else { 0 }));
    }
    if let Some(updated) = scalars.updated {
        root.insert(KEY_UPDATED.into(), json!(updated));
    }

    for (key, _) in TILE_KEYS {
        root.insert(key.into(), Value::Array(Vec::new()));
    }
    for (tile, param) in tile_attributes.sorted() {
        let key = tile_key_for(param.attribute());
        if let Some(Value::Array(list)) = root.get_mut(key) {
            list.push(encode_tile(tile, param));
        }
    }

    let objects: Vec<Value> = objects
        .into_iter()
        .map(|object| encode_object(object, tile_size))
        .collect();
    root.insert(KEY_OBJECTS.into(), Value::Array(objects));

    Ok(serde_json::to_string(&Value::Object(root))?)
}

fn tuples<'v>(key: &str, value: &'v Value) -> Result<&'v Vec<Value>, MetadataError> {
    value
        .as_array()
        .ok_or_else(|| MetadataError::field(key, 0, "expected a list"))
}

fn coordinate(key: &str, index: usize, tuple: &[Value], at: usize) -> Result<Vector2, MetadataError> {
    let x = tuple.get(at).and_then(Value::as_f64);
    let y = tuple.get(at + 1).and_then(Value::as_f64);
    match (x, y) {
        (Some(x), Some(y)) => Ok(Vector2::new(x.round() as i32, y.round() as i32)),
        _ => Err(MetadataError::field(key, index, "missing coordinate")),
    }
}

/// Optional string slot; `null`, `0` and a missing slot all mean absent.
fn optional_str(key: &str, index: usize, tuple: &[Value], at: usize) -> Result<Option<String>, MetadataError> {
    match tuple.get(at) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(MetadataError::field(
            key,
            index,
            format!("expected a string at position {}, found {}", at, other),
        )),
    }
}

fn optional_direction(key: &str, index: usize, tuple: &[Value], at: usize) -> Result<Option<Direction>, MetadataError> {
    optional_str(key, index, tuple, at)?
        .map(|d| d.parse().map_err(|e: String| MetadataError::field(key, index, e)))
        .transpose()
}

fn optional_coordinate(key: &str, index: usize, tuple: &[Value], at: usize) -> Result<Option<Vector2>, MetadataError> {
    let present = |i: usize| !matches!(tuple.get(i), None | Some(Value::Null));
    if !present(at) && !present(at + 1) {
        return Ok(None);
    }
    coordinate(key, index, tuple, at).map(Some)
}

fn as_tuple<'v>(key: &str, index: usize, value: &'v Value) -> Result<&'v [Value], MetadataError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| MetadataError::field(key, index, "expected a tuple"))
}

fn decode_tile(
    key: &str,
    index: usize,
    value: &Value,
    attribute: TileAttribute,
) -> Result<(Vector2, TileParam), MetadataError> {
    let tuple = as_tuple(key, index, value)?;
    let tile = coordinate(key, index, tuple, 0)?;

    let param = match attribute {
        TileAttribute::Impassable => TileParam::Impassable {
            direction: optional_direction(key, index, tuple, 2)?,
        },
        TileAttribute::Spawn => TileParam::Spawn {
            direction: optional_direction(key, index, tuple, 2)?,
        },
        TileAttribute::Portal => {
            let direction = optional_direction(key, index, tuple, 2)?;
            let room = optional_str(key, index, tuple, 3)?;
            let coordinate = optional_coordinate(key, index, tuple, 4)?;
            let target = PortalTarget::from_parts(room, coordinate)
                .ok_or_else(|| MetadataError::field(key, index, "portal needs a room or a coordinate"))?;
            TileParam::Portal { direction, target }
        }
        TileAttribute::Private => TileParam::Private {
            identifier: optional_str(key, index, tuple, 2)?.unwrap_or_default(),
        },
        TileAttribute::Spotlight => TileParam::Spotlight {
            identifier: optional_str(key, index, tuple, 2)?.unwrap_or_default(),
        },
    };

    Ok((tile, param))
}

fn encode_tile(tile: Vector2, param: &TileParam) -> Value {
    let direction = |d: &Option<Direction>| d.map_or(Value::Null, |d| json!(d.as_str()));

    let mut fields = vec![json!(tile.x), json!(tile.y)];
    match param {
        TileParam::Impassable { direction: d } | TileParam::Spawn { direction: d } => {
            fields.push(direction(d));
        }
        TileParam::Portal { direction: d, target } => {
            fields.push(direction(d));
            fields.push(target.room().map_or(Value::Null, |r| json!(r)));
            match target.coordinate() {
                Some(c) => {
                    fields.push(json!(c.x));
                    fields.push(json!(c.y));
                }
                None => {
                    fields.push(Value::Null);
                    fields.push(Value::Null);
                }
            }
        }
        TileParam::Private { identifier } | TileParam::Spotlight { identifier } => {
            fields.push(json!(identifier));
        }
    }

    while fields.last().is_some_and(Value::is_null) {
        fields.pop();
    }
    Value::Array(fields)
}

fn decode_object(key: &str, index: usize, value: &Value, tile_size: i32) -> Result<WorldObject, MetadataError> {
    let tuple = as_tuple(key, index, value)?;
    let tile = coordinate(key, index, tuple, 0)?;
    let image = optional_str(key, index, tuple, 2)?.unwrap_or_default();
    let media_type = match optional_str(key, index, tuple, 4)? {
        Some(code) => match code.parse::<MediaType>() {
            Ok(media_type) => Some(media_type),
            Err(e) => {
                warn!("Object {} has {}; treating it as plain media", index, e);
                None
            }
        },
        None => None,
    };

    Ok(WorldObject {
        position: tile.to_pixels(tile_size),
        image,
        active_image: optional_str(key, index, tuple, 3)?,
        media_type,
        uri: optional_str(key, index, tuple, 5)?,
        active: false,
    })
}

fn encode_object(object: &WorldObject, tile_size: i32) -> Value {
    let tile = object.tile(tile_size);
    let or_zero = |s: Option<&str>| s.map_or(json!(0), |s| json!(s));
    json!([
        tile.x,
        tile.y,
        object.image,
        or_zero(object.active_image.as_deref()),
        or_zero(object.media_type.map(MediaType::code)),
        or_zero(object.uri.as_deref()),
    ])
}
