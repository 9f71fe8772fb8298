//! Shared primitive types used across the save core.

pub use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// The scene-object name an entity is tracked by.
/// Names are the identity key for object state in save files.
pub type EntityName = String;

/// Registry-assigned identifier. Session-local, never reused.
pub type UniqueId = String;

/// Name of a loadable scene.
pub type SceneName = String;

/// Tag carried by the player entity.
pub const PLAYER_TAG: &str = "Player";

/// Bit set of entity layers. Layer `n` is bit `1 << n`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL:  LayerMask = LayerMask(u32::MAX);

    pub fn from_layers(layers: &[u8]) -> Self {
        Self(layers.iter().fold(0u32, |mask, l| mask | (1u32 << (*l as u32 % 32))))
    }

    pub fn contains(&self, layer: u8) -> bool {
        layer < 32 && self.0 & (1u32 << layer) != 0
    }
}

/// What the coordinator can observe about a live entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub name:   EntityName,
    pub layer:  u8,
    pub tag:    Option<String>,
    pub active: bool,
}

impl EntityInfo {
    pub fn new(name: impl Into<EntityName>, layer: u8) -> Self {
        Self {
            name: name.into(),
            layer,
            tag: None,
            active: true,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
