//! # Network Module
//!
//! Keeps the local mirror of remote players in sync with the real-time
//! transport: roster reconciliation, inbound packet application and the
//! reactive publishing of the local player's fields.
//!
//! Delivery is unordered and unreliable. Every packet fully replaces the
//! field it carries, so duplicates and stale packets are harmless and the
//! next change heals any loss.

pub mod http;

use log::{debug, trace, warn};

use tilespace_shared::{
    CharacterName, Direction, NetworkPacket, ParticipantMetadata, Player, Vector2,
};

use crate::store::{GameStore, StoreEvent};

/// The real-time room connection (data channel, audio tracks, room metadata).
pub trait Transport {
    /// Send `data` to one participant, or to everyone when `destination` is `None`.
    fn publish(&mut self, data: &[u8], destination: Option<&str>) -> Result<(), String>;

    /// Subscribe to or drop a participant's audio track.
    fn set_audio_subscribed(&mut self, identity: &str, subscribed: bool) -> Result<(), String>;

    /// Current room metadata, if the room has any.
    fn room_metadata(&mut self) -> Result<Option<String>, String>;

    fn update_room_metadata(&mut self, metadata: &str) -> Result<(), String>;
}

/// A remote participant as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteParticipant {
    pub identity: String,
    /// Participant metadata JSON, carrying the character choice
    pub metadata: Option<String>,
}

impl RemoteParticipant {
    pub fn new(identity: impl Into<String>, metadata: Option<String>) -> Self {
        Self {
            identity: identity.into(),
            metadata,
        }
    }

    pub fn character(&self) -> Option<CharacterName> {
        self.metadata.as_deref().and_then(ParticipantMetadata::character_of)
    }
}

/// Encode and send a packet. Failures are transient and only logged.
pub fn send_packet(transport: &mut dyn Transport, packet: &NetworkPacket, destination: Option<&str>) {
    let data = match packet.encode() {
        Ok(data) => data,
        Err(e) => {
            warn!("Failed to encode {} packet: {}", packet.channel_id(), e);
            return;
        }
    };
    if let Err(e) = transport.publish(&data, destination) {
        warn!("Failed to publish {} packet: {}", packet.channel_id(), e);
    }
}

/// Packet announcing a change of the local player, if the event is one.
pub fn packet_for(event: &StoreEvent) -> Option<NetworkPacket> {
    match event {
        StoreEvent::MyTargetChanged(target) => Some(NetworkPacket::position(*target)),
        StoreEvent::MyDirectionChanged(direction) => Some(NetworkPacket::Direction(*direction)),
        StoreEvent::MyAnimationChanged(animation) => Some(NetworkPacket::animation(*animation)),
        _ => None,
    }
}

/// Bring the remote player mirror in line with the transport's roster.
///
/// New identities get a player at `default_spawn`; known ones have their
/// character patched; players no longer present are dropped. Participants
/// that have not announced a character yet are skipped until they do.
/// Returns the identities that were added.
pub fn reconcile_roster(
    store: &mut GameStore,
    participants: &[RemoteParticipant],
    local_identity: &str,
    default_spawn: Vector2,
    tile_size: i32,
) -> Vec<String> {
    store.batch(|store| {
        let mut joined = Vec::new();

        for participant in participants {
            if participant.identity == local_identity {
                continue;
            }
            let Some(character) = participant.character() else {
                debug!("Participant {} has no character yet", participant.identity);
                continue;
            };
            if store.remote_player(&participant.identity).is_some() {
                store.set_remote_character(&participant.identity, character);
            } else {
                store.upsert_remote(Player::spawn(
                    participant.identity.clone(),
                    character,
                    default_spawn,
                    Direction::W,
                    tile_size,
                ));
                joined.push(participant.identity.clone());
            }
        }

        let departed: Vec<String> = store
            .remote_players()
            .iter()
            .filter(|p| !participants.iter().any(|r| r.identity == p.username))
            .map(|p| p.username.clone())
            .collect();
        for username in departed {
            debug!("Participant {} left", username);
            store.remove_remote(&username);
        }

        joined
    })
}

/// Apply one inbound data packet from `sender`.
///
/// Packets from identities not in the roster yet are dropped, whatever
/// their channel; object packets patch the activation flag of the object
/// they name.
pub fn apply_packet(store: &mut GameStore, sender: &str, data: &[u8]) {
    let packet = match NetworkPacket::decode(data) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("Dropping undecodable packet from {}: {}", sender, e);
            return;
        }
    };

    if store.remote_player(sender).is_none() {
        trace!("Dropping {} packet from unknown participant {}", packet.channel_id(), sender);
        return;
    }

    match &packet {
        NetworkPacket::Position(position) => {
            store.set_remote_target(sender, position.tile());
        }
        NetworkPacket::Direction(direction) => {
            store.set_remote_direction(sender, *direction);
        }
        NetworkPacket::Animation(payload) => store.batch(|store| {
            store.set_remote_animation(sender, payload.animation);
            if let Some(direction) = payload.legacy_direction {
                store.set_remote_direction(sender, direction);
            }
        }),
        NetworkPacket::Object(object) => {
            if !store.set_object_active(object.id, object.active) {
                trace!("Object packet for missing object {}", object.id);
            }
        }
    }
}

/// Send the local player's whole pose, to one participant or to everyone.
pub fn send_pose(transport: &mut dyn Transport, store: &GameStore, destination: Option<&str>) {
    let Some(me) = store.my_player() else { return };
    send_packet(transport, &NetworkPacket::position(me.target_pos), destination);
    send_packet(transport, &NetworkPacket::Direction(me.direction), destination);
    send_packet(transport, &NetworkPacket::animation(me.animation), destination);
}

/// Send the local player's pose straight to a participant that just became
/// active, instead of waiting for the next change.
pub fn greet_newcomer(transport: &mut dyn Transport, store: &GameStore, identity: &str) {
    debug!("Greeting {} with local pose", identity);
    send_pose(transport, store, Some(identity));
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;
    use tilespace_shared::{AnimationState, WorldObject};

    fn participant(identity: &str, character: &str) -> RemoteParticipant {
        RemoteParticipant::new(identity, Some(format!(r#"{{"character":"{}"}}"#, character)))
    }

    fn store_with(names: &[&str]) -> GameStore {
        let mut store = GameStore::new(8.0, "");
        let roster: Vec<_> = names.iter().map(|n| participant(n, "doux")).collect();
        reconcile_roster(&mut store, &roster, "me", Vector2::new(10, 0), 32);
        store.take_events();
        store
    }

    #[test]
    fn roster_adds_patches_and_removes() {
        let mut store = GameStore::new(8.0, "");
        let joined = reconcile_roster(
            &mut store,
            &[participant("me", "vita"), participant("ann", "mort"), RemoteParticipant::new("bob", None)],
            "me",
            Vector2::new(10, 0),
            32,
        );
        assert_eq!(joined, vec!["ann".to_string()]);
        let ann = store.remote_player("ann").unwrap();
        assert_eq!(ann.target_pos, Vector2::new(10, 0));
        assert_eq!(ann.animation, AnimationState::Idle);

        let joined = reconcile_roster(&mut store, &[participant("ann", "targ")], "me", Vector2::new(10, 0), 32);
        assert!(joined.is_empty());
        assert_eq!(store.remote_player("ann").unwrap().character, CharacterName::Targ);

        reconcile_roster(&mut store, &[], "me", Vector2::new(10, 0), 32);
        assert!(store.remote_players().is_empty());
    }

    #[test]
    fn position_packets_are_idempotent() {
        let mut store = store_with(&["ann"]);
        let data = br#"{"channelId":"position","payload":{"x":3,"y":4}}"#;
        apply_packet(&mut store, "ann", data);
        let once = store.remote_player("ann").cloned();
        apply_packet(&mut store, "ann", data);
        assert_eq!(store.remote_player("ann").cloned(), once);
        assert_eq!(once.unwrap().target_pos, Vector2::new(3, 4));
    }

    #[test]
    fn packets_from_unknown_senders_are_dropped() {
        let mut store = store_with(&["ann"]);
        apply_packet(&mut store, "zed", br#"{"channelId":"direction","payload":"NE"}"#);
        assert!(store.remote_player("zed").is_none());
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn object_packets_from_unknown_senders_are_dropped() {
        let mut store = store_with(&["ann"]);
        store.add_object(WorldObject::new(Vector2::new(0, 0), "lamp.png"));
        store.take_events();
        apply_packet(&mut store, "zed", br#"{"channelId":"object","payload":{"id":0,"active":true}}"#);
        assert!(!store.object(0).unwrap().active);
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn legacy_animation_sets_facing() {
        let mut store = store_with(&["ann"]);
        apply_packet(&mut store, "ann", br#"{"channelId":"animation","payload":"walk_right"}"#);
        let ann = store.remote_player("ann").unwrap();
        assert_eq!(ann.animation, AnimationState::Walk);
        assert_eq!(ann.direction, Direction::E);
    }

    #[test]
    fn object_packets_patch_activation() {
        let mut store = store_with(&["ann"]);
        store.add_object(WorldObject::new(Vector2::new(0, 0), "lamp.png"));
        apply_packet(&mut store, "ann", br#"{"channelId":"object","payload":{"id":0,"active":true}}"#);
        assert!(store.object(0).unwrap().active);
        // Unknown ids are a benign race
        apply_packet(&mut store, "ann", br#"{"channelId":"object","payload":{"id":7,"active":true}}"#);
    }

    #[test]
    fn newcomer_receives_pose_unicast() {
        let mut store = store_with(&[]);
        store.spawn_my_player(Player::spawn("me", CharacterName::Vita, Vector2::new(2, 3), Direction::S, 32));
        let mut transport = RecordingTransport::default();
        greet_newcomer(&mut transport, &store, "ann");
        assert_eq!(transport.channels(), vec!["position", "direction", "animation"]);
        assert!(transport.sent.iter().all(|(_, to)| to.as_deref() == Some("ann")));
        assert_eq!(transport.sent[0].0, NetworkPacket::position(Vector2::new(2, 3)));
    }

    #[test]
    fn publish_failures_are_not_fatal() {
        let mut transport = RecordingTransport {
            fail_publish: true,
            ..RecordingTransport::default()
        };
        send_packet(&mut transport, &NetworkPacket::object(0, true), None);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn only_local_changes_are_published() {
        assert_eq!(
            packet_for(&StoreEvent::MyDirectionChanged(Direction::N)),
            Some(NetworkPacket::Direction(Direction::N))
        );
        assert_eq!(packet_for(&StoreEvent::RemoteJoined("ann".into())), None);
    }
}
