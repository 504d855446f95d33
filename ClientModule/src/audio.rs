//! # Spatial Audio
//!
//! Decides which remote participants are within earshot, subscribes and
//! unsubscribes their audio tracks accordingly, and drives the spatializer
//! of every attached stream from the peers' relative positions.
//!
//! Subscription follows audibility, so peers out of earshot cost no
//! bandwidth. Private zones and spotlight tiles override plain distance.

use log::{debug, warn};
use std::collections::HashMap;

use tilespace_shared::{TileParam, Vector2};

use crate::config::AudioMode;
use crate::net::Transport;
use crate::store::GameStore;

/// A remote media stream as reported by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStreamInfo {
    pub id: String,
    pub audio_tracks: usize,
}

/// Spatializer input for one attached stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpatialParams {
    /// Source position relative to the listener, in tiles (x east, z south)
    Panner { x: f64, y: f64, z: f64 },
    Gain(f64),
}

/// The host's audio graph
pub trait AudioRenderer {
    fn attach(&mut self, identity: &str, stream: &MediaStreamInfo);
    fn update(&mut self, identity: &str, params: SpatialParams);
    fn detach(&mut self, identity: &str);
}

/// How well a speaker can be heard by the listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Audibility {
    Silent,
    /// Attenuated by distance (tiles)
    Distance(f64),
    /// Full volume regardless of distance
    Full,
}

impl Audibility {
    pub fn is_hearable(self) -> bool {
        !matches!(self, Audibility::Silent)
    }
}

fn private_zone(tile: Option<&TileParam>) -> Option<&str> {
    match tile {
        Some(TileParam::Private { identifier }) => Some(identifier),
        _ => None,
    }
}

/// Audibility of a speaker at `distance` tiles.
///
/// The boundary is inclusive: a speaker exactly at `earshot` is heard. A
/// speaker on a spotlight tile is heard by everyone. Private zones only
/// connect peers inside the same zone.
pub fn audibility(
    distance: f64,
    earshot: f64,
    listener_tile: Option<&TileParam>,
    speaker_tile: Option<&TileParam>,
) -> Audibility {
    if matches!(speaker_tile, Some(TileParam::Spotlight { .. })) {
        return Audibility::Full;
    }
    match (private_zone(listener_tile), private_zone(speaker_tile)) {
        (Some(listener), Some(speaker)) if listener == speaker => Audibility::Full,
        (None, None) if distance <= earshot => Audibility::Distance(distance),
        _ => Audibility::Silent,
    }
}

/// Linear falloff: `1 - clamp(distance / earshot, 0, 1)`.
pub fn gain_for(distance: f64, earshot: f64) -> f64 {
    if earshot <= 0.0 {
        return if distance <= 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - (distance / earshot).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
struct PeerAudio {
    relative: Vector2,
    audibility: Audibility,
    subscribed: bool,
    /// `None` until a stream with at least one audio track arrives
    stream: Option<MediaStreamInfo>,
    attached: bool,
}

impl Default for PeerAudio {
    fn default() -> Self {
        Self {
            relative: Vector2::zero(),
            audibility: Audibility::Silent,
            subscribed: false,
            stream: None,
            attached: false,
        }
    }
}

pub struct SpatialAudioCoordinator {
    mode: AudioMode,
    earshot: f64,
    peers: HashMap<String, PeerAudio>,
}

impl SpatialAudioCoordinator {
    pub fn new(mode: AudioMode) -> Self {
        Self {
            mode,
            earshot: 0.0,
            peers: HashMap::new(),
        }
    }

    pub fn is_hearable(&self, identity: &str) -> bool {
        self.peers.get(identity).map_or(false, |p| p.audibility.is_hearable())
    }

    pub fn is_subscribed(&self, identity: &str) -> bool {
        self.peers.get(identity).map_or(false, |p| p.subscribed)
    }

    /// Remote minus local position, in tiles.
    pub fn relative_position(&self, identity: &str) -> Option<Vector2> {
        self.peers.get(identity).map(|p| p.relative)
    }

    pub fn has_stream(&self, identity: &str) -> bool {
        self.peers.get(identity).map_or(false, |p| p.stream.is_some())
    }

    /// A stream arrived for `identity`. Streams without audio tracks leave
    /// the peer pending.
    pub fn set_stream(&mut self, identity: &str, stream: MediaStreamInfo, renderer: &mut dyn AudioRenderer) {
        let peer = self.peers.entry(identity.to_string()).or_default();
        if stream.audio_tracks == 0 {
            debug!("Stream {} of {} has no audio yet", stream.id, identity);
            return;
        }
        if peer.attached {
            renderer.detach(identity);
            peer.attached = false;
        }
        peer.stream = Some(stream);
        self.refresh_peer(identity, renderer);
    }

    /// Recompute relative positions and audibility for every remote player.
    pub fn recompute(&mut self, store: &GameStore, transport: &mut dyn Transport, renderer: &mut dyn AudioRenderer) {
        let Some(me) = store.my_player() else { return };
        let earshot = store.earshot_radius();
        self.earshot = earshot;
        let listener_tile = store.tile_attribute(me.target_pos);

        for remote in store.remote_players() {
            let relative = remote.target_pos.sub(me.target_pos);
            let audibility = audibility(
                relative.length(),
                earshot,
                listener_tile,
                store.tile_attribute(remote.target_pos),
            );

            let peer = self.peers.entry(remote.username.clone()).or_default();
            peer.relative = relative;
            peer.audibility = audibility;

            let hearable = audibility.is_hearable();
            if hearable != peer.subscribed {
                debug!("{} {} earshot", remote.username, if hearable { "entered" } else { "left" });
                match transport.set_audio_subscribed(&remote.username, hearable) {
                    Ok(()) => peer.subscribed = hearable,
                    Err(e) => warn!("Failed to update audio subscription for {}: {}", remote.username, e),
                }
            }
            self.refresh_peer(&remote.username, renderer);
        }

        let departed: Vec<String> = self
            .peers
            .keys()
            .filter(|identity| store.remote_player(identity).is_none())
            .cloned()
            .collect();
        for identity in departed {
            if let Some(peer) = self.peers.remove(&identity) {
                if peer.attached {
                    renderer.detach(&identity);
                }
                debug!("Tore down audio for {}", identity);
            }
        }
    }

    /// Attach, detach or update one peer's audio node to match its state.
    fn refresh_peer(&mut self, identity: &str, renderer: &mut dyn AudioRenderer) {
        let mode = self.mode;
        let earshot = self.earshot;
        let Some(peer) = self.peers.get_mut(identity) else { return };
        let Some(stream) = peer.stream.as_ref() else { return };

        if !peer.subscribed {
            if peer.attached {
                renderer.detach(identity);
                peer.attached = false;
            }
            return;
        }

        if !peer.attached {
            renderer.attach(identity, stream);
            peer.attached = true;
        }

        let params = match (mode, peer.audibility) {
            (AudioMode::Panner, Audibility::Distance(_)) => SpatialParams::Panner {
                x: peer.relative.x as f64,
                y: 0.0,
                z: peer.relative.y as f64,
            },
            (AudioMode::Panner, _) => SpatialParams::Panner { x: 0.0, y: 0.0, z: 0.0 },
            (AudioMode::Gain, Audibility::Distance(distance)) => SpatialParams::Gain(gain_for(distance, earshot)),
            (AudioMode::Gain, Audibility::Full) => SpatialParams::Gain(1.0),
            (AudioMode::Gain, Audibility::Silent) => SpatialParams::Gain(0.0),
        };
        renderer.update(identity, params);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingRenderer;
    use super::*;
    use crate::net::testing::RecordingTransport;
    use tilespace_shared::{CharacterName, Direction, Player};

    fn player(name: &str, x: i32, y: i32) -> Player {
        Player::spawn(name, CharacterName::Doux, Vector2::new(x, y), Direction::S, 32)
    }

    fn stream(id: &str, audio_tracks: usize) -> MediaStreamInfo {
        MediaStreamInfo {
            id: id.into(),
            audio_tracks,
        }
    }

    fn room(earshot: f64, remotes: &[(&str, i32, i32)]) -> GameStore {
        let mut store = GameStore::new(earshot, "");
        store.spawn_my_player(player("me", 0, 0));
        for (name, x, y) in remotes {
            store.upsert_remote(player(name, *x, *y));
        }
        store
    }

    #[test]
    fn earshot_boundary_is_inclusive() {
        assert!(audibility(5.0, 5.0, None, None).is_hearable());
        assert!(!audibility(5.01, 5.0, None, None).is_hearable());
    }

    #[test]
    fn gain_falls_off_linearly() {
        assert_eq!(gain_for(0.0, 8.0), 1.0);
        assert_eq!(gain_for(4.0, 8.0), 0.5);
        assert_eq!(gain_for(12.0, 8.0), 0.0);
        assert_eq!(gain_for(1.0, 0.0), 0.0);
    }

    #[test]
    fn zones_override_distance() {
        let red = TileParam::Private { identifier: "red".into() };
        let blue = TileParam::Private { identifier: "blue".into() };
        let stage = TileParam::Spotlight { identifier: String::new() };

        assert_eq!(audibility(30.0, 5.0, Some(&red), Some(&red)), Audibility::Full);
        assert_eq!(audibility(1.0, 5.0, Some(&red), Some(&blue)), Audibility::Silent);
        assert_eq!(audibility(1.0, 5.0, None, Some(&red)), Audibility::Silent);
        assert_eq!(audibility(50.0, 5.0, None, Some(&stage)), Audibility::Full);
    }

    #[test]
    fn subscription_follows_earshot() {
        let mut store = room(5.0, &[("near", 3, 4), ("far", 6, 0)]);
        let mut transport = RecordingTransport::default();
        let mut renderer = RecordingRenderer::default();
        let mut audio = SpatialAudioCoordinator::new(AudioMode::Gain);

        audio.recompute(&store, &mut transport, &mut renderer);
        assert!(audio.is_subscribed("near"));
        assert!(!audio.is_subscribed("far"));
        assert_eq!(transport.audio, vec![("near".to_string(), true)]);
        assert_eq!(audio.relative_position("far"), Some(Vector2::new(6, 0)));

        store.set_remote_target("near", Vector2::new(9, 9));
        audio.recompute(&store, &mut transport, &mut renderer);
        assert_eq!(transport.audio.last(), Some(&("near".to_string(), false)));
    }

    #[test]
    fn silent_streams_stay_pending() {
        let store = room(8.0, &[("ann", 1, 0)]);
        let mut transport = RecordingTransport::default();
        let mut renderer = RecordingRenderer::default();
        let mut audio = SpatialAudioCoordinator::new(AudioMode::Gain);
        audio.recompute(&store, &mut transport, &mut renderer);

        audio.set_stream("ann", stream("s0", 0), &mut renderer);
        assert!(!audio.has_stream("ann"));
        assert!(renderer.calls.is_empty());

        audio.set_stream("ann", stream("s1", 1), &mut renderer);
        assert!(renderer.attached("ann"));
        assert_eq!(renderer.last_update("ann"), Some(SpatialParams::Gain(1.0 - 1.0 / 8.0)));
    }

    #[test]
    fn departed_peers_are_torn_down() {
        let mut store = room(8.0, &[("ann", 1, 0)]);
        let mut transport = RecordingTransport::default();
        let mut renderer = RecordingRenderer::default();
        let mut audio = SpatialAudioCoordinator::new(AudioMode::Panner);
        audio.recompute(&store, &mut transport, &mut renderer);
        audio.set_stream("ann", stream("s1", 1), &mut renderer);
        assert_eq!(
            renderer.last_update("ann"),
            Some(SpatialParams::Panner { x: 1.0, y: 0.0, z: 0.0 })
        );

        store.remove_remote("ann");
        audio.recompute(&store, &mut transport, &mut renderer);
        assert!(!renderer.attached("ann"));
        assert!(audio.relative_position("ann").is_none());
    }
}
