//! # Object Interaction
//!
//! Nearest-object lookup, the action trigger and edit-mode painting of tile
//! attributes and objects. Script objects delegate their activation state to
//! a worker (see [`worker`]); every other object toggles locally.

pub mod worker;

use log::{debug, trace};

use tilespace_shared::{NetworkPacket, ObjectId, Vector2, WorldObject};

use crate::net::{send_packet, Transport};
use crate::store::{EditorTool, GameStore};
use worker::{WorkerCommand, WorkerHub, WorkerReply};

/// The interactive object closest to `tile` within `radius` tiles.
///
/// Only objects with a uri or an active image count. Distances are measured
/// in tile units between tile-aligned positions; on a tie the object seen
/// first wins.
pub fn find_nearest_object<'a>(
    objects: impl IntoIterator<Item = (ObjectId, &'a WorldObject)>,
    tile: Vector2,
    radius: f64,
    tile_size: i32,
) -> Option<ObjectId> {
    let mut nearest: Option<(ObjectId, f64)> = None;
    for (id, object) in objects {
        if !object.is_interactive() {
            continue;
        }
        let distance = object.tile(tile_size).distance(tile);
        if distance > radius {
            continue;
        }
        match nearest {
            Some((_, best)) if best <= distance => {}
            _ => nearest = Some((id, distance)),
        }
    }
    nearest.map(|(id, _)| id)
}

/// Trigger object `id`.
///
/// An object with a worker is asked to decide its new state and nothing
/// changes until the worker replies. Otherwise the object toggles at once
/// and the change is broadcast. Returns false when the object is gone.
pub fn trigger_object(store: &mut GameStore, workers: &mut WorkerHub, transport: &mut dyn Transport, id: ObjectId) -> bool {
    let Some(active) = store.object(id).map(|o| o.active) else {
        trace!("Trigger on missing object {}", id);
        return false;
    };

    if workers.post(id, WorkerCommand::Trigger(active)) {
        debug!("Posted trigger to worker of object {}", id);
        return true;
    }

    let active = !active;
    store.set_object_active(id, active);
    send_packet(transport, &NetworkPacket::object(id, active), None);
    true
}

/// Apply a worker reply. Only broadcast replies change state; the new state
/// is applied locally and republished to the room.
pub fn apply_worker_reply(store: &mut GameStore, transport: &mut dyn Transport, id: ObjectId, reply: WorkerReply) {
    match (reply.is_broadcast(), reply.active) {
        (true, Some(active)) => {
            if store.set_object_active(id, active) {
                send_packet(transport, &NetworkPacket::object(id, active), None);
            } else {
                trace!("Worker reply for missing object {}", id);
            }
        }
        _ => debug!("Worker of object {} reported {:?}", id, reply),
    }
}

/// Apply an editor tool at `tile`. Returns the id of a newly placed object.
///
/// Objects are only ever appended, and never stacked on an occupied tile.
/// Any other tool first removes objects on the tile.
pub fn paint(store: &mut GameStore, tool: &EditorTool, tile: Vector2, tile_size: i32) -> Option<ObjectId> {
    let occupants: Vec<ObjectId> = store
        .live_objects()
        .filter(|(_, o)| o.tile(tile_size) == tile)
        .map(|(id, _)| id)
        .collect();

    match tool {
        EditorTool::Object(template) => {
            if !occupants.is_empty() {
                debug!("Tile {} already holds an object", tile);
                return None;
            }
            let object = WorldObject {
                position: tile.to_pixels(tile_size),
                active: false,
                ..template.clone()
            };
            Some(store.add_object(object))
        }
        EditorTool::Tile(param) => {
            store.batch(|store| {
                for id in occupants {
                    store.remove_object(id);
                }
                store.set_tile(tile, Some(param.clone()));
            });
            None
        }
        EditorTool::Erase => {
            store.batch(|store| {
                for id in occupants {
                    store.remove_object(id);
                }
                store.set_tile(tile, None);
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing::RecordingTransport;
    use tilespace_shared::{MediaType, TileParam};

    fn interactive(tile: Vector2) -> WorldObject {
        let mut object = WorldObject::new(tile.to_pixels(32), "door.png");
        object.active_image = Some("door_open.png".into());
        object
    }

    #[test]
    fn nearest_prefers_first_on_tie() {
        let objects = vec![
            interactive(Vector2::new(3, 5)),
            interactive(Vector2::new(5, 5)),
            WorldObject::new(Vector2::new(4, 5).to_pixels(32), "rock.png"),
        ];
        let found = find_nearest_object(objects.iter().enumerate(), Vector2::new(4, 5), 1.5, 32);
        assert_eq!(found, Some(0));
    }

    #[test]
    fn nearest_respects_radius() {
        let objects = vec![interactive(Vector2::new(0, 0)), interactive(Vector2::new(9, 9))];
        assert_eq!(find_nearest_object(objects.iter().enumerate(), Vector2::new(8, 8), 1.5, 32), Some(1));
        assert_eq!(find_nearest_object(objects.iter().enumerate(), Vector2::new(5, 5), 1.5, 32), None);
    }

    #[test]
    fn plain_objects_toggle_and_broadcast() {
        let mut store = GameStore::new(8.0, "");
        let id = store.add_object(interactive(Vector2::new(1, 1)));
        let mut workers = WorkerHub::new();
        let mut transport = RecordingTransport::default();

        assert!(trigger_object(&mut store, &mut workers, &mut transport, id));
        assert!(store.object(id).unwrap().active);
        assert_eq!(transport.sent, vec![(NetworkPacket::object(id, true), None)]);

        assert!(!trigger_object(&mut store, &mut workers, &mut transport, 99));
    }

    #[test]
    fn informational_replies_change_nothing() {
        let mut store = GameStore::new(8.0, "");
        let id = store.add_object(interactive(Vector2::new(1, 1)));
        let mut transport = RecordingTransport::default();
        apply_worker_reply(&mut store, &mut transport, id, WorkerReply { active: Some(true), broadcast: None });
        assert!(!store.object(id).unwrap().active);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn object_tool_never_stacks() {
        let mut store = GameStore::new(8.0, "");
        let mut template = interactive(Vector2::zero());
        template.media_type = Some(MediaType::Image);
        let tool = EditorTool::Object(template);

        let first = paint(&mut store, &tool, Vector2::new(10, 10), 32);
        assert_eq!(first, Some(0));
        assert_eq!(store.object(0).unwrap().position, Vector2::new(320, 320));
        assert_eq!(paint(&mut store, &tool, Vector2::new(10, 10), 32), None);
        assert_eq!(paint(&mut store, &tool, Vector2::new(11, 10), 32), Some(1));
    }

    #[test]
    fn tile_tool_replaces_objects() {
        let mut store = GameStore::new(8.0, "");
        let id = store.add_object(interactive(Vector2::new(2, 2)));
        let wall = EditorTool::Tile(TileParam::Impassable { direction: None });
        paint(&mut store, &wall, Vector2::new(2, 2), 32);
        assert!(store.object(id).is_none());
        assert!(store.tile_attribute(Vector2::new(2, 2)).is_some());

        paint(&mut store, &EditorTool::Erase, Vector2::new(2, 2), 32);
        assert!(store.tile_attribute(Vector2::new(2, 2)).is_none());
    }
}
