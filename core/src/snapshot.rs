//! Snapshot data model — the complete world state that goes into a save.
//!
//! Every list field defaults to empty so older save files that predate a
//! field still deserialize. Write-side invariants (unique bool keys,
//! destroyed objects never active) are enforced by the constructors and
//! by `normalize`, which the codec runs before every write.

use crate::{
    clock::WorldTime,
    types::{EntityName, Quat, SceneName, Vec3},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoolState {
    pub key:   String,
    pub value: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectActiveState {
    pub name:         EntityName,
    pub is_active:    bool,
    pub is_destroyed: bool,
}

impl ObjectActiveState {
    /// A destroyed object is never active; `is_active` is forced to false.
    pub fn new(name: impl Into<EntityName>, is_active: bool, is_destroyed: bool) -> Self {
        Self {
            name: name.into(),
            is_active: is_active && !is_destroyed,
            is_destroyed,
        }
    }

    pub fn present(name: impl Into<EntityName>, is_active: bool) -> Self {
        Self::new(name, is_active, false)
    }

    pub fn destroyed(name: impl Into<EntityName>) -> Self {
        Self::new(name, false, true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogueState {
    pub dialogue_tree_id: String,
    pub is_completed:     bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSnapshot {
    pub scene_name:      SceneName,
    pub player_position: Vec3,
    pub player_rotation: Quat,
    pub camera_pitch:    f32,

    #[serde(default)]
    pub bool_states: Vec<BoolState>,
    #[serde(default)]
    pub object_active_states: Vec<ObjectActiveState>,
    #[serde(default)]
    pub dialogue_states: Vec<DialogueState>,
    #[serde(default)]
    pub completed_cutscene_ids: Vec<String>,
    #[serde(default)]
    pub inventory_item_ids: Vec<String>,
    #[serde(default)]
    pub shown_tip_ids: Vec<String>,
    #[serde(default)]
    pub journal_page_ids: Vec<String>,

    pub oxygen: f32,
    pub energy: f32,

    pub day:    u32,
    pub hour:   u8,
    pub minute: u8,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            scene_name: SceneName::new(),
            player_position: Vec3::ZERO,
            player_rotation: Quat::IDENTITY,
            camera_pitch: 0.0,
            bool_states: Vec::new(),
            object_active_states: Vec::new(),
            dialogue_states: Vec::new(),
            completed_cutscene_ids: Vec::new(),
            inventory_item_ids: Vec::new(),
            shown_tip_ids: Vec::new(),
            journal_page_ids: Vec::new(),
            oxygen: 100.0,
            energy: 100.0,
            day: 0,
            hour: 0,
            minute: 0,
        }
    }
}

impl StateSnapshot {
    pub fn new(scene_name: impl Into<SceneName>) -> Self {
        Self {
            scene_name: scene_name.into(),
            ..Self::default()
        }
    }

    /// Set a flag. An existing key keeps its position and takes the new value.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        let key = key.into();
        match self.bool_states.iter_mut().find(|b| b.key == key) {
            Some(existing) => existing.value = value,
            None => self.bool_states.push(BoolState { key, value }),
        }
    }

    pub fn bool_value(&self, key: &str) -> Option<bool> {
        self.bool_states.iter().find(|b| b.key == key).map(|b| b.value)
    }

    /// Record an object's state, replacing any earlier entry for the same name.
    pub fn push_object(&mut self, state: ObjectActiveState) {
        match self
            .object_active_states
            .iter_mut()
            .find(|o| o.name == state.name)
        {
            Some(existing) => *existing = state,
            None => self.object_active_states.push(state),
        }
    }

    pub fn set_dialogue(&mut self, dialogue_tree_id: impl Into<String>, is_completed: bool) {
        let dialogue_tree_id = dialogue_tree_id.into();
        match self
            .dialogue_states
            .iter_mut()
            .find(|d| d.dialogue_tree_id == dialogue_tree_id)
        {
            Some(existing) => existing.is_completed = is_completed,
            None => self.dialogue_states.push(DialogueState {
                dialogue_tree_id,
                is_completed,
            }),
        }
    }

    pub fn world_time(&self) -> Option<WorldTime> {
        WorldTime::new(self.day, self.hour, self.minute)
    }

    pub fn set_world_time(&mut self, time: WorldTime) {
        self.day = time.day;
        self.hour = time.hour;
        self.minute = time.minute;
    }

    /// Collapse duplicate bool keys (first position, last value) and
    /// clear `is_active` on destroyed objects.
    pub fn normalize(&mut self) {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut deduped: Vec<BoolState> = Vec::with_capacity(self.bool_states.len());
        for state in self.bool_states.drain(..) {
            match index.get(&state.key) {
                Some(&i) => deduped[i].value = state.value,
                None => {
                    index.insert(state.key.clone(), deduped.len());
                    deduped.push(state);
                }
            }
        }
        self.bool_states = deduped;

        for object in &mut self.object_active_states {
            if object.is_destroyed && object.is_active {
                log::warn!("object '{}' recorded as destroyed and active; clearing active", object.name);
                object.is_active = false;
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}
