//! # Game State Store
//!
//! The single owner of all mutable game state: the local player, remote
//! player mirrors, tile attributes, world objects and room scalars.
//!
//! Every logical field has exactly one mutation method. Each change is
//! recorded as a [`StoreEvent`]; the engine drains the journal to drive its
//! effects (publishing, audio, nearest object, workers), and external
//! observers such as a renderer can subscribe to be notified. Mutations made
//! inside [`GameStore::batch`] are delivered to observers only once the whole
//! batch has been applied.

use log::{debug, trace};

use tilespace_shared::{
    AnimationState, CharacterName, Direction, ObjectId, Player, RoomMetadata, TileAttributes, TileParam,
    Vector2, WorldObject,
};

use crate::movement::advance_position;

/// Identifies an observer registration
pub type SubscriptionId = u64;

type Observer = Box<dyn FnMut(&StoreEvent)>;

/// A change applied to the store
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    MyPlayerSpawned,
    MyTargetChanged(Vector2),
    MyDirectionChanged(Direction),
    MyAnimationChanged(AnimationState),
    RemoteJoined(String),
    RemoteLeft(String),
    RemoteTargetChanged(String),
    /// Direction, animation or character of a remote player changed
    RemoteAppearanceChanged(String),
    ObjectActivated { id: ObjectId, active: bool },
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    /// Tile attributes and objects were replaced from room metadata
    WorldReloaded,
    TileChanged(Vector2),
    EarshotChanged(f64),
    ModeChanged,
}

/// Painter's tool used in edit mode
#[derive(Debug, Clone, PartialEq)]
pub enum EditorTool {
    /// Paint a tile attribute
    Tile(TileParam),
    /// Remove the tile attribute
    Erase,
    /// Place a copy of this object (its position is ignored)
    Object(WorldObject),
}

pub struct GameStore {
    my_player: Option<Player>,
    remote_players: Vec<Player>,

    tile_attributes: TileAttributes,

    /// Object slots; a removed object leaves `None` so ids never shift
    objects: Vec<Option<WorldObject>>,

    earshot_radius: f64,
    base_dir: String,

    debug_mode: bool,
    edit_mode: bool,
    chat_mode: bool,
    active_tool: Option<EditorTool>,

    journal: Vec<StoreEvent>,
    notified: usize,
    batch_depth: usize,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: SubscriptionId,
}

impl GameStore {
    pub fn new(earshot_radius: f64, base_dir: impl Into<String>) -> Self {
        Self {
            my_player: None,
            remote_players: Vec::new(),
            tile_attributes: TileAttributes::new(),
            objects: Vec::new(),
            earshot_radius,
            base_dir: base_dir.into(),
            debug_mode: false,
            edit_mode: false,
            chat_mode: false,
            active_tool: None,
            journal: Vec::new(),
            notified: 0,
            batch_depth: 0,
            observers: Vec::new(),
            next_subscription: 1,
        }
    }

    // --- Change notification ---

    /// Register an observer called for every event after it is applied.
    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Apply several mutations as one unit; observers see them only afterwards.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.notify();
        }
        result
    }

    /// Drain the events recorded since the last call.
    pub fn take_events(&mut self) -> Vec<StoreEvent> {
        if self.batch_depth > 0 {
            return Vec::new();
        }
        self.notified = 0;
        std::mem::take(&mut self.journal)
    }

    fn emit(&mut self, event: StoreEvent) {
        trace!("Store event: {:?}", event);
        self.journal.push(event);
        if self.batch_depth == 0 {
            self.notify();
        }
    }

    fn notify(&mut self) {
        let fresh = &self.journal[self.notified..];
        for (_, observer) in self.observers.iter_mut() {
            for event in fresh {
                observer(event);
            }
        }
        self.notified = self.journal.len();
    }

    // --- Local player ---

    pub fn my_player(&self) -> Option<&Player> {
        self.my_player.as_ref()
    }

    pub fn spawn_my_player(&mut self, player: Player) {
        debug!("Local player {} spawned at {}", player.username, player.target_pos);
        self.my_player = Some(player);
        self.emit(StoreEvent::MyPlayerSpawned);
    }

    pub fn set_my_target(&mut self, target: Vector2) {
        let Some(player) = self.my_player.as_mut() else { return };
        if player.target_pos == target {
            return;
        }
        player.target_pos = target;
        self.emit(StoreEvent::MyTargetChanged(target));
    }

    pub fn set_my_direction(&mut self, direction: Direction) {
        let Some(player) = self.my_player.as_mut() else { return };
        if player.direction == direction {
            return;
        }
        player.direction = direction;
        self.emit(StoreEvent::MyDirectionChanged(direction));
    }

    pub fn set_my_animation(&mut self, animation: AnimationState) {
        let Some(player) = self.my_player.as_mut() else { return };
        if player.animation == animation {
            return;
        }
        player.animation = animation;
        self.emit(StoreEvent::MyAnimationChanged(animation));
    }

    // --- Remote players ---

    pub fn remote_players(&self) -> &[Player] {
        &self.remote_players
    }

    pub fn remote_player(&self, username: &str) -> Option<&Player> {
        self.remote_players.iter().find(|p| p.username == username)
    }

    fn remote_mut(&mut self, username: &str) -> Option<&mut Player> {
        self.remote_players.iter_mut().find(|p| p.username == username)
    }

    /// Add a remote player, or patch the character of an existing one.
    pub fn upsert_remote(&mut self, player: Player) {
        let username = player.username.clone();
        match self.remote_mut(&username) {
            Some(existing) => {
                if existing.character != player.character {
                    existing.character = player.character;
                    self.emit(StoreEvent::RemoteAppearanceChanged(username));
                }
            }
            None => {
                self.remote_players.push(player);
                self.emit(StoreEvent::RemoteJoined(username));
            }
        }
    }

    pub fn remove_remote(&mut self, username: &str) -> bool {
        let before = self.remote_players.len();
        self.remote_players.retain(|p| p.username != username);
        let removed = self.remote_players.len() != before;
        if removed {
            self.emit(StoreEvent::RemoteLeft(username.to_string()));
        }
        removed
    }

    /// Returns false when the identity is not in the roster.
    pub fn set_remote_target(&mut self, username: &str, target: Vector2) -> bool {
        let Some(player) = self.remote_mut(username) else { return false };
        if player.target_pos != target {
            player.target_pos = target;
            self.emit(StoreEvent::RemoteTargetChanged(username.to_string()));
        }
        true
    }

    pub fn set_remote_direction(&mut self, username: &str, direction: Direction) -> bool {
        let Some(player) = self.remote_mut(username) else { return false };
        if player.direction != direction {
            player.direction = direction;
            self.emit(StoreEvent::RemoteAppearanceChanged(username.to_string()));
        }
        true
    }

    pub fn set_remote_animation(&mut self, username: &str, animation: AnimationState) -> bool {
        let Some(player) = self.remote_mut(username) else { return false };
        if player.animation != animation {
            player.animation = animation;
            self.emit(StoreEvent::RemoteAppearanceChanged(username.to_string()));
        }
        true
    }

    pub fn set_remote_character(&mut self, username: &str, character: CharacterName) -> bool {
        let Some(player) = self.remote_mut(username) else { return false };
        if player.character != character {
            player.character = character;
            self.emit(StoreEvent::RemoteAppearanceChanged(username.to_string()));
        }
        true
    }

    /// Move every player's pixel position one frame closer to its target.
    /// Returns whether anything moved. Render-only; no events.
    pub fn advance_positions(&mut self, tile_size: i32, divisor: i32) -> bool {
        let mut moved = false;
        let players = self.my_player.iter_mut().chain(self.remote_players.iter_mut());
        for player in players {
            let target = player.target_pos.to_pixels(tile_size);
            let next = advance_position(player.position, target, divisor);
            if next != player.position {
                player.position = next;
                moved = true;
            }
        }
        moved
    }

    /// Players sorted for drawing: north rows first, then west to east;
    /// on the same pixel a north-facing player is drawn first.
    pub fn players_in_draw_order(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.my_player.iter().chain(self.remote_players.iter()).collect();
        players.sort_by(|a, b| {
            a.position
                .y
                .cmp(&b.position.y)
                .then(a.position.x.cmp(&b.position.x))
                .then_with(|| b.direction.faces_north().cmp(&a.direction.faces_north()))
        });
        players
    }

    // --- World ---

    pub fn tile_attributes(&self) -> &TileAttributes {
        &self.tile_attributes
    }

    pub fn tile_attribute(&self, tile: Vector2) -> Option<&TileParam> {
        self.tile_attributes.get(tile)
    }

    /// Attribute of the tile the local player is heading to.
    pub fn my_tile_attribute(&self) -> Option<&TileParam> {
        self.my_player
            .as_ref()
            .and_then(|p| self.tile_attributes.get(p.target_pos))
    }

    pub fn set_tile(&mut self, tile: Vector2, param: Option<TileParam>) {
        if self.tile_attributes.get(tile) == param.as_ref() {
            return;
        }
        self.tile_attributes.set(tile, param);
        self.emit(StoreEvent::TileChanged(tile));
    }

    pub fn objects(&self) -> &[Option<WorldObject>] {
        &self.objects
    }

    pub fn object(&self, id: ObjectId) -> Option<&WorldObject> {
        self.objects.get(id).and_then(Option::as_ref)
    }

    /// Live objects with their ids
    pub fn live_objects(&self) -> impl Iterator<Item = (ObjectId, &WorldObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|o| (id, o)))
    }

    /// Append an object; existing ids are never reused or shifted.
    pub fn add_object(&mut self, object: WorldObject) -> ObjectId {
        self.objects.push(Some(object));
        let id = self.objects.len() - 1;
        self.emit(StoreEvent::ObjectAdded(id));
        id
    }

    /// Tombstone an object slot.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<WorldObject> {
        let removed = self.objects.get_mut(id).and_then(Option::take);
        if removed.is_some() {
            self.emit(StoreEvent::ObjectRemoved(id));
        }
        removed
    }

    /// Returns false when the object does not exist.
    pub fn set_object_active(&mut self, id: ObjectId, active: bool) -> bool {
        let Some(object) = self.objects.get_mut(id).and_then(Option::as_mut) else {
            return false;
        };
        if object.active != active {
            object.active = active;
            self.emit(StoreEvent::ObjectActivated { id, active });
        }
        true
    }

    /// Replace tile attributes, objects and room scalars in one batch.
    pub fn replace_world(&mut self, metadata: RoomMetadata) {
        self.batch(|store| {
            let RoomMetadata {
                tile_attributes,
                objects,
                scalars,
            } = metadata;
            store.tile_attributes = tile_attributes;
            store.objects = objects.into_iter().map(Some).collect();
            if let Some(base_dir) = scalars.base_dir {
                store.base_dir = base_dir;
            }
            if let Some(debug_mode) = scalars.debug_mode {
                store.debug_mode = debug_mode;
            }
            store.emit(StoreEvent::WorldReloaded);
            if let Some(radius) = scalars.earshot_radius {
                store.set_earshot_radius(radius);
            }
        });
    }

    // --- Room scalars and modes ---

    pub fn earshot_radius(&self) -> f64 {
        self.earshot_radius
    }

    pub fn set_earshot_radius(&mut self, radius: f64) {
        if self.earshot_radius == radius {
            return;
        }
        self.earshot_radius = radius;
        self.emit(StoreEvent::EarshotChanged(radius));
    }

    pub fn base_dir(&self) -> &str {
        &self.base_dir
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    pub fn set_debug_mode(&mut self, debug_mode: bool) {
        if self.debug_mode != debug_mode {
            self.debug_mode = debug_mode;
            self.emit(StoreEvent::ModeChanged);
        }
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        if self.edit_mode != edit_mode {
            self.edit_mode = edit_mode;
            self.emit(StoreEvent::ModeChanged);
        }
    }

    pub fn chat_mode(&self) -> bool {
        self.chat_mode
    }

    pub fn set_chat_mode(&mut self, chat_mode: bool) {
        if self.chat_mode != chat_mode {
            self.chat_mode = chat_mode;
            self.emit(StoreEvent::ModeChanged);
        }
    }

    pub fn active_tool(&self) -> Option<&EditorTool> {
        self.active_tool.as_ref()
    }

    pub fn set_active_tool(&mut self, tool: Option<EditorTool>) {
        self.active_tool = tool;
        self.emit(StoreEvent::ModeChanged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tilespace_shared::RoomScalars;

    fn remote(name: &str, tile: Vector2) -> Player {
        Player::spawn(name, CharacterName::Doux, tile, Direction::W, 32)
    }

    #[test]
    fn setters_only_record_real_changes() {
        let mut store = GameStore::new(8.0, "");
        store.spawn_my_player(remote("me", Vector2::new(1, 1)));
        store.set_my_target(Vector2::new(1, 1));
        store.set_my_target(Vector2::new(2, 1));
        store.set_my_direction(Direction::W);
        assert_eq!(
            store.take_events(),
            vec![StoreEvent::MyPlayerSpawned, StoreEvent::MyTargetChanged(Vector2::new(2, 1))]
        );
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn observers_see_batches_only_when_complete() {
        let mut store = GameStore::new(8.0, "");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        store.batch(|s| {
            s.upsert_remote(remote("ann", Vector2::new(0, 0)));
            s.upsert_remote(remote("bob", Vector2::new(0, 0)));
            assert!(seen.borrow().is_empty());
        });
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn unsubscribed_observer_is_silent() {
        let mut store = GameStore::new(8.0, "");
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let id = store.subscribe(move |_| *sink.borrow_mut() += 1);
        store.set_edit_mode(true);
        assert!(store.unsubscribe(id));
        store.set_edit_mode(false);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn removed_objects_leave_tombstones() {
        let mut store = GameStore::new(8.0, "");
        let a = store.add_object(WorldObject::new(Vector2::new(0, 0), "a.png"));
        let b = store.add_object(WorldObject::new(Vector2::new(32, 0), "b.png"));
        assert!(store.remove_object(a).is_some());
        assert!(store.object(a).is_none());
        assert_eq!(store.object(b).map(|o| o.image.as_str()), Some("b.png"));
        assert!(!store.set_object_active(a, true));
        assert!(store.set_object_active(b, true));
        assert_eq!(store.live_objects().count(), 1);
        let c = store.add_object(WorldObject::new(Vector2::new(64, 0), "c.png"));
        assert_eq!(c, 2);
    }

    #[test]
    fn unknown_remote_updates_are_rejected() {
        let mut store = GameStore::new(8.0, "");
        assert!(!store.set_remote_target("ghost", Vector2::new(1, 1)));
        assert!(store.take_events().is_empty());
    }

    #[test]
    fn replace_world_applies_scalars() {
        let mut store = GameStore::new(8.0, "");
        let mut metadata = RoomMetadata::default();
        metadata.objects.push(WorldObject::new(Vector2::new(0, 0), "a.png"));
        metadata.scalars = RoomScalars {
            base_dir: Some("rooms/dark/".into()),
            earshot_radius: Some(4.0),
            debug_mode: Some(true),
            updated: None,
        };
        store.replace_world(metadata);
        assert_eq!(store.base_dir(), "rooms/dark/");
        assert_eq!(store.earshot_radius(), 4.0);
        assert!(store.debug_mode());
        assert_eq!(
            store.take_events(),
            vec![StoreEvent::WorldReloaded, StoreEvent::EarshotChanged(4.0)]
        );
    }

    #[test]
    fn draw_order_is_north_first_then_west() {
        let mut store = GameStore::new(8.0, "");
        store.upsert_remote(remote("south", Vector2::new(0, 5)));
        store.upsert_remote(remote("east", Vector2::new(3, 1)));
        store.upsert_remote(remote("west", Vector2::new(1, 1)));
        let names: Vec<_> = store.players_in_draw_order().iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["west", "east", "south"]);
    }
}
