//! Collaborator contracts.
//!
//! RULE: The coordinator never reaches into another subsystem's internals.
//! Each external subsystem is seen only through the narrow getter/setter
//! trait below, and is injected through `Collaborators`.
//!
//! Every slot is optional. A missing collaborator makes the coordinator
//! skip that piece of state with a warning instead of failing the
//! operation.

use crate::types::{EntityInfo, Quat, SceneName, Vec3};

pub trait BoolFlagStore {
    fn all_keys(&self) -> Vec<String>;
    fn get(&self, key: &str) -> bool;
    fn set(&mut self, key: &str, value: bool);
}

pub trait Inventory {
    /// Item ids in slot order.
    fn item_ids(&self) -> Vec<String>;
    /// Replace the inventory; ids fill slots in order.
    fn load_from_ids(&mut self, ids: &[String]);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemDefinition {
    pub id:           String,
    pub display_name: String,
}

pub trait ItemCatalog {
    fn resolve(&self, id: &str) -> Option<ItemDefinition>;
}

pub trait DialogueTracker {
    fn all_dialogue_ids(&self) -> Vec<String>;
    fn progress(&self, id: &str) -> bool;
    fn set_progress(&mut self, id: &str, completed: bool);
}

pub trait CutsceneTracker {
    fn completed_ids(&self) -> Vec<String>;
    fn mark_completed(&mut self, id: &str);
}

pub trait TipTracker {
    fn shown_ids(&self) -> Vec<String>;
    fn set_shown_ids(&mut self, ids: Vec<String>);
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalPage {
    pub id:    String,
    pub title: String,
}

pub trait JournalTracker {
    /// Ids of the pages currently in the journal, in order.
    fn page_ids(&self) -> Vec<String>;
    fn find_page_by_id(&self, id: &str) -> Option<JournalPage>;
    fn add_page(&mut self, page: JournalPage);
}

pub trait WorldClock {
    fn day(&self) -> u32;
    fn hour(&self) -> u8;
    fn minute(&self) -> u8;
    fn set_time(&mut self, day: u32, hour: u8, minute: u8);
    /// Re-derive lighting and ambience from the current time.
    fn recompute(&mut self);
}

pub trait PlayerStats {
    fn oxygen(&self) -> f32;
    fn energy(&self) -> f32;
    fn set_oxygen(&mut self, value: f32);
    fn set_energy(&mut self, value: f32);
    fn set_alive(&mut self, alive: bool);
}

pub trait PlayerRig {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> Quat;
    fn set_transform(&mut self, position: Vec3, rotation: Quat);
}

/// First-person camera. Pitch is independent of the body's yaw.
pub trait CameraRig {
    fn pitch(&self) -> f32;
    fn set_pitch(&mut self, pitch: f32);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneLoadStatus {
    Pending,
    Loaded,
    Failed(String),
}

pub trait SceneLoader {
    fn active_scene_name(&self) -> SceneName;
    /// Start loading `scene` asynchronously. Progress is observed via `poll`.
    fn begin_load(&mut self, scene: &str);
    fn poll(&mut self) -> SceneLoadStatus;
    /// Abandon an in-flight load, keeping the current scene.
    fn abort(&mut self);
}

pub trait EntityLookup {
    fn find_by_name(&self, name: &str) -> Option<EntityInfo>;
    fn find_by_tag(&self, tag: &str) -> Vec<EntityInfo>;
    fn all_entities(&self) -> Vec<EntityInfo>;
    /// Returns false when no entity has that name.
    fn set_active(&mut self, name: &str, active: bool) -> bool;
    /// Returns false when no entity has that name.
    fn destroy(&mut self, name: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeTarget {
    Opaque,
    Transparent,
}

pub trait ScreenFader {
    fn fade_to(&mut self, target: FadeTarget, secs: f32);
}

pub trait SaveIndicator {
    fn show(&mut self);
    fn hide(&mut self);
}

/// Every external subsystem the coordinator talks to.
#[derive(Default)]
pub struct Collaborators {
    pub flags:     Option<Box<dyn BoolFlagStore>>,
    pub inventory: Option<Box<dyn Inventory>>,
    pub items:     Option<Box<dyn ItemCatalog>>,
    pub dialogue:  Option<Box<dyn DialogueTracker>>,
    pub cutscenes: Option<Box<dyn CutsceneTracker>>,
    pub tips:      Option<Box<dyn TipTracker>>,
    pub journal:   Option<Box<dyn JournalTracker>>,
    pub clock:     Option<Box<dyn WorldClock>>,
    pub stats:     Option<Box<dyn PlayerStats>>,
    pub player:    Option<Box<dyn PlayerRig>>,
    pub camera:    Option<Box<dyn CameraRig>>,
    pub scenes:    Option<Box<dyn SceneLoader>>,
    pub entities:  Option<Box<dyn EntityLookup>>,
    pub fader:     Option<Box<dyn ScreenFader>>,
    pub indicator: Option<Box<dyn SaveIndicator>>,
}

impl Collaborators {
    pub fn new() -> Self {
        Self::default()
    }
}
