//! # Room Metadata
//!
//! Loading the shared room metadata into the store and saving the edited
//! world back.

use log::{info, warn};

use tilespace_shared::{decode_metadata, encode_metadata, RoomScalars, TokenClaims};

use crate::error::ClientError;
use crate::net::Transport;
use crate::store::GameStore;

/// Replace the world with the decoded `metadata`.
///
/// A payload that fails to decode is logged and ignored; the previous world
/// stays in place. Returns whether the world was replaced.
pub fn apply_metadata(store: &mut GameStore, metadata: &str, tile_size: i32) -> bool {
    match decode_metadata(metadata, tile_size) {
        Ok(decoded) => {
            info!(
                "Loaded room metadata: {} tile attributes, {} objects",
                decoded.tile_attributes.len(),
                decoded.objects.len()
            );
            store.replace_world(decoded);
            true
        }
        Err(e) => {
            warn!("Ignoring room metadata: {}", e);
            false
        }
    }
}

/// Fetch the room's current metadata from the transport and apply it.
pub fn load_metadata(store: &mut GameStore, transport: &mut dyn Transport, tile_size: i32) -> bool {
    match transport.room_metadata() {
        Ok(Some(metadata)) => apply_metadata(store, &metadata, tile_size),
        Ok(None) => false,
        Err(e) => {
            warn!("Failed to read room metadata: {}", e);
            false
        }
    }
}

/// Encode the world and write it to the room, stamped with `now` (unix
/// milliseconds). Requires the admin grant.
pub fn save_metadata(
    store: &GameStore,
    transport: &mut dyn Transport,
    claims: Option<&TokenClaims>,
    tile_size: i32,
    now: u64,
) -> Result<String, ClientError> {
    let claims = claims.ok_or(ClientError::NotConnected)?;
    if !claims.video.room_admin {
        return Err(ClientError::PermissionDenied("saving room metadata requires room admin"));
    }

    let scalars = RoomScalars {
        base_dir: Some(store.base_dir().to_string()).filter(|dir| !dir.is_empty()),
        earshot_radius: Some(store.earshot_radius()),
        debug_mode: Some(store.debug_mode()),
        updated: Some(now),
    };
    let encoded = encode_metadata(
        store.tile_attributes(),
        store.live_objects().map(|(_, object)| object),
        &scalars,
        tile_size,
    )?;

    transport
        .update_room_metadata(&encoded)
        .map_err(ClientError::Transport)?;
    info!("Saved room metadata ({} bytes)", encoded.len());
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing::RecordingTransport;
    use tilespace_shared::{TileParam, Vector2, WorldObject};

    fn claims(admin: bool) -> TokenClaims {
        serde_json::from_value(serde_json::json!({"sub": "ann", "exp": 9_999_999_999u64, "video": {"roomAdmin": admin}}))
            .unwrap()
    }

    #[test]
    fn bad_metadata_keeps_prior_world() {
        let mut store = GameStore::new(8.0, "");
        assert!(apply_metadata(&mut store, r#"{"I":[[5,5,"E"]]}"#, 32));
        assert!(!apply_metadata(&mut store, r#"{"I":[[1,1]"#, 32));
        assert!(!apply_metadata(&mut store, r#"[1,2,3]"#, 32));
        assert!(store.tile_attribute(Vector2::new(5, 5)).is_some());
        assert_eq!(store.tile_attributes().len(), 1);
    }

    #[test]
    fn save_requires_admin() {
        let store = GameStore::new(8.0, "");
        let mut transport = RecordingTransport::default();
        assert!(matches!(
            save_metadata(&store, &mut transport, Some(&claims(false)), 32, 1),
            Err(ClientError::PermissionDenied(_))
        ));
        assert!(matches!(
            save_metadata(&store, &mut transport, None, 32, 1),
            Err(ClientError::NotConnected)
        ));
        assert!(transport.metadata_updates.is_empty());
    }

    #[test]
    fn saved_world_loads_back() {
        let mut store = GameStore::new(6.0, "rooms/dark/");
        store.set_tile(Vector2::new(1, 2), Some(TileParam::Spawn { direction: None }));
        let doomed = store.add_object(WorldObject::new(Vector2::new(0, 0), "a.png"));
        store.add_object(WorldObject::new(Vector2::new(64, 32), "b.png"));
        store.remove_object(doomed);

        let mut transport = RecordingTransport::default();
        let saved = save_metadata(&store, &mut transport, Some(&claims(true)), 32, 1_700_000_000_000).unwrap();
        assert!(saved.contains(r#""U":1700000000000"#));
        assert_eq!(transport.metadata_updates, vec![saved]);

        let mut reloaded = GameStore::new(8.0, "");
        assert!(load_metadata(&mut reloaded, &mut transport, 32));
        assert_eq!(reloaded.earshot_radius(), 6.0);
        assert_eq!(reloaded.base_dir(), "rooms/dark/");
        assert_eq!(reloaded.tile_attributes(), store.tile_attributes());
        // Tombstones are compacted away on save
        assert_eq!(reloaded.objects().len(), 1);
        assert_eq!(reloaded.object(0).map(|o| o.position), Some(Vector2::new(64, 32)));
    }
}
