//! In-memory world — one shared state object that implements every
//! collaborator contract.
//!
//! Used by `save-runner demo` and by the integration tests. Scenes are
//! templates: loading one replaces the live entity list and respawns the
//! player, while session-wide managers (inventory, journal, flags, ...)
//! survive the swap.
//!
//! Every mutating call bumps `mutations`, so tests can assert that an
//! operation left the world untouched.

use crate::{
    clock::{DayPhase, WorldTime},
    collaborator::{
        BoolFlagStore, CameraRig, Collaborators, CutsceneTracker, DialogueTracker, EntityLookup,
        FadeTarget, Inventory, ItemCatalog, ItemDefinition, JournalPage, JournalTracker,
        PlayerRig, PlayerStats, SaveIndicator, SceneLoadStatus, SceneLoader, ScreenFader,
        TipTracker, WorldClock,
    },
    types::{EntityInfo, Quat, SceneName, Vec3},
};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct SceneTemplate {
    pub name:           SceneName,
    pub entities:       Vec<EntityInfo>,
    pub spawn_position: Vec3,
    pub spawn_rotation: Quat,
}

impl SceneTemplate {
    pub fn new(name: impl Into<SceneName>, entities: Vec<EntityInfo>) -> Self {
        Self {
            name: name.into(),
            entities,
            spawn_position: Vec3::ZERO,
            spawn_rotation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingScene {
    Loading { scene: SceneName, frames_left: u32 },
    Unknown { scene: SceneName },
}

#[derive(Debug)]
pub struct WorldState {
    // ── Session-wide managers ──────────────────────
    pub flags:        BTreeMap<String, bool>,
    pub inventory:    Vec<String>,
    pub item_catalog: BTreeMap<String, ItemDefinition>,
    pub dialogue:     BTreeMap<String, bool>,
    pub cutscenes:    Vec<String>,
    pub tips:         Vec<String>,
    pub journal:      Vec<JournalPage>,
    pub page_catalog: BTreeMap<String, JournalPage>,
    pub time:         WorldTime,
    pub day_phase:    DayPhase,
    pub oxygen:       f32,
    pub energy:       f32,
    pub alive:        bool,

    // ── Scene-bound state ──────────────────────────
    pub active_scene:    SceneName,
    pub scenes:          BTreeMap<SceneName, SceneTemplate>,
    pub entities:        Vec<EntityInfo>,
    pub player_position: Vec3,
    pub player_rotation: Quat,
    pub camera_pitch:    f32,
    /// Frames a scene load stays pending before completing.
    pub load_frames:     u32,
    pending_scene:       Option<PendingScene>,

    // ── Presentation ───────────────────────────────
    pub fades:             Vec<FadeTarget>,
    pub indicator_visible: bool,
    pub indicator_shows:   u32,

    pub mutations: u64,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            flags: BTreeMap::new(),
            inventory: Vec::new(),
            item_catalog: BTreeMap::new(),
            dialogue: BTreeMap::new(),
            cutscenes: Vec::new(),
            tips: Vec::new(),
            journal: Vec::new(),
            page_catalog: BTreeMap::new(),
            time: WorldTime::default(),
            day_phase: DayPhase::Night,
            oxygen: 100.0,
            energy: 100.0,
            alive: true,
            active_scene: SceneName::new(),
            scenes: BTreeMap::new(),
            entities: Vec::new(),
            player_position: Vec3::ZERO,
            player_rotation: Quat::IDENTITY,
            camera_pitch: 0.0,
            load_frames: 1,
            pending_scene: None,
            fades: Vec::new(),
            indicator_visible: false,
            indicator_shows: 0,
            mutations: 0,
        }
    }
}

impl WorldState {
    pub fn entity(&self, name: &str) -> Option<&EntityInfo> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn journal_ids(&self) -> Vec<String> {
        self.journal.iter().map(|p| p.id.clone()).collect()
    }

    fn install_scene(&mut self, name: &str) -> bool {
        let Some(template) = self.scenes.get(name) else {
            return false;
        };
        self.entities = template.entities.clone();
        self.player_position = template.spawn_position;
        self.player_rotation = template.spawn_rotation;
        self.camera_pitch = 0.0;
        self.active_scene = template.name.clone();
        true
    }
}

/// Cheaply clonable handle; every clone sees the same world.
#[derive(Debug, Clone, Default)]
pub struct SharedWorld(Rc<RefCell<WorldState>>);

impl SharedWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn borrow(&self) -> Ref<'_, WorldState> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, WorldState> {
        self.0.borrow_mut()
    }

    pub fn add_scene(&self, template: SceneTemplate) {
        self.0.borrow_mut().scenes.insert(template.name.clone(), template);
    }

    /// Make `name` the live scene immediately, bypassing the loader.
    pub fn enter_scene(&self, name: &str) -> bool {
        self.0.borrow_mut().install_scene(name)
    }

    pub fn add_item_definition(&self, id: &str, display_name: &str) {
        self.0.borrow_mut().item_catalog.insert(
            id.to_string(),
            ItemDefinition {
                id: id.to_string(),
                display_name: display_name.to_string(),
            },
        );
    }

    pub fn add_page_definition(&self, id: &str, title: &str) {
        self.0.borrow_mut().page_catalog.insert(
            id.to_string(),
            JournalPage {
                id: id.to_string(),
                title: title.to_string(),
            },
        );
    }

    /// Remove an entity from the live scene, as gameplay destruction would.
    pub fn remove_entity(&self, name: &str) -> bool {
        let mut world = self.0.borrow_mut();
        let before = world.entities.len();
        world.entities.retain(|e| e.name != name);
        world.entities.len() != before
    }

    /// A bundle with every collaborator slot backed by this world.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            flags:     Some(Box::new(self.clone())),
            inventory: Some(Box::new(self.clone())),
            items:     Some(Box::new(self.clone())),
            dialogue:  Some(Box::new(self.clone())),
            cutscenes: Some(Box::new(self.clone())),
            tips:      Some(Box::new(self.clone())),
            journal:   Some(Box::new(self.clone())),
            clock:     Some(Box::new(self.clone())),
            stats:     Some(Box::new(self.clone())),
            player:    Some(Box::new(self.clone())),
            camera:    Some(Box::new(self.clone())),
            scenes:    Some(Box::new(self.clone())),
            entities:  Some(Box::new(self.clone())),
            fader:     Some(Box::new(self.clone())),
            indicator: Some(Box::new(self.clone())),
        }
    }

    fn mutate(&self) -> RefMut<'_, WorldState> {
        let mut world = self.0.borrow_mut();
        world.mutations += 1;
        world
    }
}

impl BoolFlagStore for SharedWorld {
    fn all_keys(&self) -> Vec<String> {
        self.borrow().flags.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> bool {
        self.borrow().flags.get(key).copied().unwrap_or(false)
    }

    fn set(&mut self, key: &str, value: bool) {
        self.mutate().flags.insert(key.to_string(), value);
    }
}

impl Inventory for SharedWorld {
    fn item_ids(&self) -> Vec<String> {
        self.borrow().inventory.clone()
    }

    fn load_from_ids(&mut self, ids: &[String]) {
        self.mutate().inventory = ids.to_vec();
    }
}

impl ItemCatalog for SharedWorld {
    fn resolve(&self, id: &str) -> Option<ItemDefinition> {
        self.borrow().item_catalog.get(id).cloned()
    }
}

impl DialogueTracker for SharedWorld {
    fn all_dialogue_ids(&self) -> Vec<String> {
        self.borrow().dialogue.keys().cloned().collect()
    }

    fn progress(&self, id: &str) -> bool {
        self.borrow().dialogue.get(id).copied().unwrap_or(false)
    }

    fn set_progress(&mut self, id: &str, completed: bool) {
        self.mutate().dialogue.insert(id.to_string(), completed);
    }
}

impl CutsceneTracker for SharedWorld {
    fn completed_ids(&self) -> Vec<String> {
        self.borrow().cutscenes.clone()
    }

    fn mark_completed(&mut self, id: &str) {
        let mut world = self.mutate();
        if !world.cutscenes.iter().any(|c| c == id) {
            world.cutscenes.push(id.to_string());
        }
    }
}

impl TipTracker for SharedWorld {
    fn shown_ids(&self) -> Vec<String> {
        self.borrow().tips.clone()
    }

    fn set_shown_ids(&mut self, ids: Vec<String>) {
        self.mutate().tips = ids;
    }
}

impl JournalTracker for SharedWorld {
    fn page_ids(&self) -> Vec<String> {
        self.borrow().journal_ids()
    }

    fn find_page_by_id(&self, id: &str) -> Option<JournalPage> {
        self.borrow().page_catalog.get(id).cloned()
    }

    fn add_page(&mut self, page: JournalPage) {
        let mut world = self.mutate();
        if !world.journal.iter().any(|p| p.id == page.id) {
            world.journal.push(page);
        }
    }
}

impl WorldClock for SharedWorld {
    fn day(&self) -> u32 {
        self.borrow().time.day
    }

    fn hour(&self) -> u8 {
        self.borrow().time.hour
    }

    fn minute(&self) -> u8 {
        self.borrow().time.minute
    }

    fn set_time(&mut self, day: u32, hour: u8, minute: u8) {
        self.mutate().time = WorldTime { day, hour, minute };
    }

    fn recompute(&mut self) {
        let mut world = self.mutate();
        let phase = world.time.phase();
        world.day_phase = phase;
    }
}

impl PlayerStats for SharedWorld {
    fn oxygen(&self) -> f32 {
        self.borrow().oxygen
    }

    fn energy(&self) -> f32 {
        self.borrow().energy
    }

    fn set_oxygen(&mut self, value: f32) {
        self.mutate().oxygen = value;
    }

    fn set_energy(&mut self, value: f32) {
        self.mutate().energy = value;
    }

    fn set_alive(&mut self, alive: bool) {
        self.mutate().alive = alive;
    }
}

impl PlayerRig for SharedWorld {
    fn position(&self) -> Vec3 {
        self.borrow().player_position
    }

    fn rotation(&self) -> Quat {
        self.borrow().player_rotation
    }

    fn set_transform(&mut self, position: Vec3, rotation: Quat) {
        let mut world = self.mutate();
        world.player_position = position;
        world.player_rotation = rotation;
    }
}

impl CameraRig for SharedWorld {
    fn pitch(&self) -> f32 {
        self.borrow().camera_pitch
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.mutate().camera_pitch = pitch;
    }
}

impl SceneLoader for SharedWorld {
    fn active_scene_name(&self) -> SceneName {
        self.borrow().active_scene.clone()
    }

    fn begin_load(&mut self, scene: &str) {
        let mut world = self.mutate();
        let pending = if world.scenes.contains_key(scene) {
            PendingScene::Loading {
                scene: scene.to_string(),
                frames_left: world.load_frames,
            }
        } else {
            PendingScene::Unknown { scene: scene.to_string() }
        };
        world.pending_scene = Some(pending);
    }

    fn poll(&mut self) -> SceneLoadStatus {
        let mut world = self.0.borrow_mut();
        match world.pending_scene.take() {
            None => SceneLoadStatus::Failed("no scene load in progress".into()),
            Some(PendingScene::Unknown { scene }) => {
                SceneLoadStatus::Failed(format!("unknown scene '{scene}'"))
            }
            Some(PendingScene::Loading { scene, frames_left }) if frames_left > 0 => {
                world.pending_scene = Some(PendingScene::Loading {
                    scene,
                    frames_left: frames_left - 1,
                });
                SceneLoadStatus::Pending
            }
            Some(PendingScene::Loading { scene, .. }) => {
                world.mutations += 1;
                world.install_scene(&scene);
                SceneLoadStatus::Loaded
            }
        }
    }

    fn abort(&mut self) {
        self.0.borrow_mut().pending_scene = None;
    }
}

impl EntityLookup for SharedWorld {
    fn find_by_name(&self, name: &str) -> Option<EntityInfo> {
        self.borrow().entity(name).cloned()
    }

    fn find_by_tag(&self, tag: &str) -> Vec<EntityInfo> {
        self.borrow()
            .entities
            .iter()
            .filter(|e| e.tag.as_deref() == Some(tag))
            .cloned()
            .collect()
    }

    fn all_entities(&self) -> Vec<EntityInfo> {
        self.borrow().entities.clone()
    }

    fn set_active(&mut self, name: &str, active: bool) -> bool {
        let mut world = self.mutate();
        match world.entities.iter_mut().find(|e| e.name == name) {
            Some(entity) => {
                entity.active = active;
                true
            }
            None => false,
        }
    }

    fn destroy(&mut self, name: &str) -> bool {
        let mut world = self.mutate();
        let before = world.entities.len();
        world.entities.retain(|e| e.name != name);
        world.entities.len() != before
    }
}

impl ScreenFader for SharedWorld {
    fn fade_to(&mut self, target: FadeTarget, _secs: f32) {
        self.mutate().fades.push(target);
    }
}

impl SaveIndicator for SharedWorld {
    fn show(&mut self) {
        let mut world = self.0.borrow_mut();
        world.indicator_visible = true;
        world.indicator_shows += 1;
    }

    fn hide(&mut self) {
        self.0.borrow_mut().indicator_visible = false;
    }
}
