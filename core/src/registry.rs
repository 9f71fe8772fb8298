//! Object registry — which world entities are tracked and which of them
//! have been destroyed this session.
//!
//! RULE: the registry is the single owner of destruction history.
//! The coordinator reads from it while saving and writes destruction
//! events back into it while restoring.
//!
//! Entries are keyed by entity name. A name is registered the first time
//! it is seen on a tracked layer in a trackable scene, gets a fresh v4
//! UUID, and keeps both the id and its destroyed flag across rescans.

use crate::{
    config::TrackingConfig,
    types::{EntityInfo, EntityName, UniqueId},
};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedObject {
    pub name:      EntityName,
    pub unique_id: UniqueId,
    pub destroyed: bool,
}

#[derive(Debug, Clone)]
pub struct ObjectRegistry {
    config:  TrackingConfig,
    objects: Vec<TrackedObject>,
    by_name: HashMap<EntityName, usize>,
}

impl ObjectRegistry {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            objects: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn tracking(&self) -> &TrackingConfig {
        &self.config
    }

    /// Register `name`, returning its unique id.
    /// Registering a known name is a no-op that returns the existing id.
    pub fn register(&mut self, name: &str) -> UniqueId {
        if let Some(&idx) = self.by_name.get(name) {
            log::debug!("object '{name}' already registered");
            return self.objects[idx].unique_id.clone();
        }

        let unique_id = Uuid::new_v4().to_string();
        self.by_name.insert(name.to_string(), self.objects.len());
        self.objects.push(TrackedObject {
            name: name.to_string(),
            unique_id: unique_id.clone(),
            destroyed: false,
        });
        unique_id
    }

    /// Record that `name` was destroyed. Returns false (and warns) for
    /// names that were never registered. Repeat calls are no-ops.
    pub fn mark_destroyed(&mut self, name: &str) -> bool {
        match self.by_name.get(name) {
            Some(&idx) => {
                let entry = &mut self.objects[idx];
                if !entry.destroyed {
                    entry.destroyed = true;
                    log::debug!("object '{name}' marked destroyed");
                }
                true
            }
            None => {
                log::warn!("mark_destroyed: object '{name}' was never registered");
                false
            }
        }
    }

    pub fn is_destroyed(&self, name: &str) -> bool {
        self.get(name).is_some_and(|o| o.destroyed)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn unique_id(&self, name: &str) -> Option<&str> {
        self.get(name).map(|o| o.unique_id.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&TrackedObject> {
        self.by_name.get(name).map(|&idx| &self.objects[idx])
    }

    /// Every tracked `(name, unique_id)` in registration order.
    pub fn snapshot_tracked_names(&self) -> Vec<(EntityName, UniqueId)> {
        self.objects
            .iter()
            .map(|o| (o.name.clone(), o.unique_id.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Forget everything. Used when starting a new game.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.by_name.clear();
    }

    /// Scan a freshly loaded scene. Registers every entity on a tracked
    /// layer that is not already known and returns how many were added.
    /// Scenes outside the allowlist are ignored entirely.
    pub fn rescan<'a>(
        &mut self,
        scene_name: &str,
        entities: impl IntoIterator<Item = &'a EntityInfo>,
    ) -> usize {
        if !self.config.is_trackable_scene(scene_name) {
            log::debug!("scene '{scene_name}' is not trackable; registry unchanged");
            return 0;
        }

        let mut added = 0;
        for entity in entities {
            if !self.config.layer_mask.contains(entity.layer) {
                continue;
            }
            if !self.is_registered(&entity.name) {
                self.register(&entity.name);
                added += 1;
            }
        }

        log::info!(
            "scene '{scene_name}': registered {added} new objects ({} tracked)",
            self.objects.len()
        );
        added
    }
}
