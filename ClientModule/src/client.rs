//! # Space Client
//!
//! The engine facade. It owns the game store and every component around
//! it, receives transport callbacks, input and the two clocks (the frame
//! loop and the fixed stepping timer), and runs the effects that follow
//! each batch of store changes:
//!
//! - local player changes are published to the room
//! - the nearest interactive object is recomputed
//! - spatial audio is recomputed
//! - object workers follow object creation, deletion and reloads

use log::{debug, info, trace};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

use tilespace_shared::{
    AnimationState, CharacterName, Direction, ObjectId, Player, PortalTarget, TileParam, TokenClaims, Vector2,
};

use crate::audio::{AudioRenderer, MediaStreamInfo, SpatialAudioCoordinator};
use crate::auth::unix_now_millis;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::input::{InputKey, InputState};
use crate::movement::{try_step, MovementTimer};
use crate::net::{self, RemoteParticipant, Transport};
use crate::object::worker::WorkerHub;
use crate::object::{self, find_nearest_object};
use crate::room;
use crate::store::{EditorTool, GameStore, StoreEvent, SubscriptionId};

/// What the interact key did on a portal tile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileAction {
    /// Moved within the current room
    Teleport(Vector2),
    /// The host should switch rooms
    ChangeRoom { room: String, coordinate: Option<Vector2> },
}

/// Random guest name for the join form.
pub fn guest_username() -> String {
    format!("Dummy{}", rand::thread_rng().gen_range(0..1000))
}

pub struct SpaceClient<T: Transport, R: AudioRenderer> {
    config: ClientConfig,
    store: GameStore,
    input: InputState,
    timer: MovementTimer,
    workers: WorkerHub,
    audio: SpatialAudioCoordinator,
    transport: T,
    renderer: R,
    identity: Option<String>,
    claims: Option<TokenClaims>,
    nearest_object: Option<ObjectId>,
}

impl<T: Transport, R: AudioRenderer> SpaceClient<T, R> {
    /// Misconfiguration is fatal here.
    pub fn new(config: ClientConfig, transport: T, renderer: R) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            store: GameStore::new(config.default_earshot_radius, config.base_dir.clone()),
            input: InputState::new(),
            timer: MovementTimer::new(config.tick_interval()),
            workers: WorkerHub::new(),
            audio: SpatialAudioCoordinator::new(config.audio_mode),
            transport,
            renderer,
            identity: None,
            claims: None,
            nearest_object: None,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn audio(&self) -> &SpatialAudioCoordinator {
        &self.audio
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Replace the token claims, e.g. after a token refresh.
    pub fn set_claims(&mut self, claims: Option<TokenClaims>) {
        self.claims = claims;
    }

    /// Observe store changes, e.g. from a renderer.
    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.store.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Enter the room the transport is connected to: load its metadata and
    /// place the local player on a random spawn tile.
    pub fn connect(&mut self, identity: &str, character: CharacterName, claims: Option<TokenClaims>) {
        info!("Joining as {} ({})", identity, character.as_str());
        self.identity = Some(identity.to_string());
        self.claims = claims;

        let tile_size = self.config.tile_size;
        room::load_metadata(&mut self.store, &mut self.transport, tile_size);

        let spawns = self.store.tile_attributes().spawn_points();
        let (tile, direction) = match spawns.choose(&mut rand::thread_rng()) {
            Some((tile, direction)) => (*tile, direction.unwrap_or(Direction::S)),
            None => (self.config.default_spawn, Direction::S),
        };
        self.store
            .spawn_my_player(Player::spawn(identity, character, tile, direction, tile_size));
        self.process_events();
    }

    // --- Transport callbacks ---

    pub fn on_roster_changed(&mut self, participants: &[RemoteParticipant]) {
        let local = self.identity.clone().unwrap_or_default();
        let joined = net::reconcile_roster(
            &mut self.store,
            participants,
            &local,
            self.config.default_spawn,
            self.config.tile_size,
        );
        if !joined.is_empty() {
            debug!("New participants: {:?}", joined);
        }
        self.process_events();
    }

    /// A participant's data channel became usable.
    pub fn on_participant_active(&mut self, identity: &str) {
        net::greet_newcomer(&mut self.transport, &self.store, identity);
    }

    pub fn on_data(&mut self, sender: &str, data: &[u8]) {
        net::apply_packet(&mut self.store, sender, data);
        self.process_events();
    }

    pub fn on_room_metadata_changed(&mut self, metadata: &str) {
        room::apply_metadata(&mut self.store, metadata, self.config.tile_size);
        self.process_events();
    }

    pub fn on_track_subscribed(&mut self, identity: &str, stream: MediaStreamInfo) {
        self.audio.set_stream(identity, stream, &mut self.renderer);
    }

    // --- Input ---

    /// Key press or release. Returns the portal action when the interact
    /// key was used on a portal.
    pub fn key(&mut self, key: InputKey, pressed: bool) -> Option<TileAction> {
        if pressed {
            self.input.press(key);
        } else {
            self.input.release(key);
        }

        let action = if self.input.take_action() && !self.store.chat_mode() {
            self.trigger_action()
        } else {
            None
        };
        self.refresh_movement();
        self.process_events();
        action
    }

    pub fn set_touch_direction(&mut self, direction: Option<Direction>) {
        self.input.set_touch_direction(direction);
        self.refresh_movement();
        self.process_events();
    }

    /// While chatting, movement keys are tracked but do not move the player.
    pub fn set_chat_mode(&mut self, chat_mode: bool) {
        self.store.set_chat_mode(chat_mode);
        self.refresh_movement();
        self.process_events();
    }

    /// Start or stop walking to match the resultant direction.
    fn refresh_movement(&mut self) {
        let direction = if self.store.chat_mode() {
            None
        } else {
            self.input.resultant()
        };

        match direction {
            Some(direction) => {
                self.store.batch(|store| {
                    store.set_my_direction(direction);
                    store.set_my_animation(AnimationState::Walk);
                });
                if self.timer.start() {
                    self.step();
                }
            }
            None => {
                self.timer.stop();
                self.store.set_my_animation(AnimationState::Idle);
            }
        }
    }

    fn step(&mut self) {
        let Some(direction) = self.input.resultant() else { return };
        let Some(me) = self.store.my_player() else { return };
        if let Some(next) = try_step(
            self.store.tile_attributes(),
            me.target_pos,
            direction,
            me.direction,
            self.store.edit_mode(),
        ) {
            self.store.set_my_target(next);
        }
    }

    /// Interact with the nearest object, or use the portal underfoot.
    pub fn trigger_action(&mut self) -> Option<TileAction> {
        if let Some(id) = self.nearest_object {
            object::trigger_object(&mut self.store, &mut self.workers, &mut self.transport, id);
            return None;
        }

        let target = match self.store.my_tile_attribute() {
            Some(TileParam::Portal { target, .. }) => target.clone(),
            _ => return None,
        };
        match target {
            PortalTarget::Coordinate(coordinate) => {
                debug!("Teleporting to {}", coordinate);
                self.store.set_my_target(coordinate);
                Some(TileAction::Teleport(coordinate))
            }
            PortalTarget::Room(room) => Some(TileAction::ChangeRoom { room, coordinate: None }),
            PortalTarget::RoomCoordinate(room, coordinate) => Some(TileAction::ChangeRoom {
                room,
                coordinate: Some(coordinate),
            }),
        }
    }

    // --- Clocks ---

    /// Fixed-period clock: take due steps and apply worker replies.
    pub fn update(&mut self, elapsed: Duration) {
        let ticks = self.timer.advance(elapsed);
        for _ in 0..ticks {
            self.step();
        }
        for (id, reply) in self.workers.drain() {
            object::apply_worker_reply(&mut self.store, &mut self.transport, id, reply);
        }
        self.process_events();
    }

    /// Frame clock: move rendered positions toward their targets.
    pub fn frame(&mut self) -> bool {
        self.store
            .advance_positions(self.config.tile_size, self.config.interpolation_divisor)
    }

    /// Wait for the next worker reply and apply it. Returns false at once
    /// when no worker is running.
    pub async fn wait_for_worker(&mut self) -> bool {
        match self.workers.recv().await {
            Some((id, reply)) => {
                object::apply_worker_reply(&mut self.store, &mut self.transport, id, reply);
                self.process_events();
                true
            }
            None => false,
        }
    }

    // --- Editor ---

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.store.set_edit_mode(edit_mode);
        self.process_events();
    }

    pub fn set_active_tool(&mut self, tool: Option<EditorTool>) {
        self.store.set_active_tool(tool);
        self.process_events();
    }

    /// Apply the active tool at the local player's tile.
    pub fn paint(&mut self) -> Option<ObjectId> {
        if !self.store.edit_mode() {
            return None;
        }
        let tile = self.store.my_player()?.target_pos;
        let tool = self.store.active_tool()?.clone();
        let placed = object::paint(&mut self.store, &tool, tile, self.config.tile_size);
        self.process_events();
        placed
    }

    pub fn save_metadata(&mut self) -> Result<String, ClientError> {
        room::save_metadata(
            &self.store,
            &mut self.transport,
            self.claims.as_ref(),
            self.config.tile_size,
            unix_now_millis(),
        )
    }

    // --- Queries ---

    pub fn nearest_object(&self) -> Option<ObjectId> {
        self.nearest_object
    }

    pub fn current_tile_attribute(&self) -> Option<&TileParam> {
        self.store.my_tile_attribute()
    }

    pub fn render_order(&self) -> Vec<&Player> {
        self.store.players_in_draw_order()
    }

    // --- Effects ---

    /// Run the effects of every pending store change.
    fn process_events(&mut self) {
        let mut nearest_dirty = false;
        let mut audio_dirty = false;

        loop {
            let events = self.store.take_events();
            if events.is_empty() {
                break;
            }
            for event in &events {
                if let Some(packet) = net::packet_for(event) {
                    net::send_packet(&mut self.transport, &packet, None);
                }

                match event {
                    StoreEvent::MyPlayerSpawned | StoreEvent::WorldReloaded | StoreEvent::MyTargetChanged(_) => {
                        nearest_dirty = true;
                        audio_dirty = true;
                    }
                    StoreEvent::ObjectAdded(_) | StoreEvent::ObjectRemoved(_) => nearest_dirty = true,
                    StoreEvent::RemoteJoined(_)
                    | StoreEvent::RemoteLeft(_)
                    | StoreEvent::RemoteTargetChanged(_)
                    | StoreEvent::TileChanged(_)
                    | StoreEvent::EarshotChanged(_) => audio_dirty = true,
                    _ => {}
                }

                match event {
                    StoreEvent::MyPlayerSpawned => net::send_pose(&mut self.transport, &self.store, None),
                    StoreEvent::WorldReloaded => self.rebuild_workers(),
                    StoreEvent::ObjectAdded(id) => self.start_worker(*id),
                    StoreEvent::ObjectRemoved(id) => self.workers.terminate(*id),
                    _ => {}
                }
            }
        }

        if nearest_dirty {
            self.recompute_nearest();
        }
        if audio_dirty {
            self.audio.recompute(&self.store, &mut self.transport, &mut self.renderer);
        }
    }

    fn rebuild_workers(&mut self) {
        let scripts = self
            .store
            .live_objects()
            .filter(|(_, o)| o.is_script())
            .filter_map(|(id, o)| o.uri.as_deref().map(|uri| (id, uri)));
        self.workers.rebuild(self.store.base_dir(), scripts);
        trace!("{} object workers running", self.workers.len());
    }

    fn start_worker(&mut self, id: ObjectId) {
        let Some(object) = self.store.object(id) else { return };
        if !object.is_script() {
            return;
        }
        if let Some(uri) = object.uri.as_deref() {
            self.workers.spawn(id, self.store.base_dir(), uri);
        }
    }

    fn recompute_nearest(&mut self) {
        let nearest = self.store.my_player().and_then(|me| {
            find_nearest_object(
                self.store.live_objects(),
                me.target_pos,
                self.config.action_radius,
                self.config.tile_size,
            )
        });
        if nearest != self.nearest_object {
            trace!("Nearest object: {:?}", nearest);
            self.nearest_object = nearest;
        }
    }
}
