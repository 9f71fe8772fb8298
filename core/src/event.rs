//! Coordinator events and operation reports.
//!
//! Every observable step of a save or load is pushed onto the
//! coordinator's event queue. Callers drain it after `save()` or `tick()`.

use crate::{error::SaveWarning, types::SceneName};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveReport {
    pub path:          PathBuf,
    pub scene_name:    SceneName,
    pub bytes_written: usize,
    pub warnings:      Vec<SaveWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct LoadReport {
    pub scene_name:        SceneName,
    pub objects_restored:  usize,
    pub objects_destroyed: usize,
    pub items_restored:    usize,
    pub warnings:          Vec<SaveWarning>,
}

/// Variants are append-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    // ── Save ───────────────────────────────────────
    SaveStarted,
    SaveCompleted {
        report: SaveReport,
    },
    SaveFailed {
        reason: String,
    },

    // ── Load ───────────────────────────────────────
    LoadStarted {
        scene: SceneName,
    },
    SceneLoadRequested {
        scene: SceneName,
    },
    SceneLoaded {
        scene: SceneName,
        newly_tracked: usize,
    },
    StateApplied {
        scene: SceneName,
        warning_count: usize,
    },
    LoadCompleted {
        report: LoadReport,
    },
    LoadCancelled {
        scene: SceneName,
    },
    LoadFailed {
        scene: SceneName,
        reason: String,
    },
}
