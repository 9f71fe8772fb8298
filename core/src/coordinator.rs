//! The save coordinator — gathers world state into a snapshot, persists
//! it, and restores it into a freshly loaded scene.
//!
//! LOAD SEQUENCE (one state per step, advanced by `tick`):
//!   1. LoadingFadeOut     screen fades to opaque, then holds for the pacing delay
//!   2. LoadingSceneSwap   scene loader polled every tick until the scene is ready
//!   3. LoadingApplyState  registry rescanned, snapshot applied (steps a–l below)
//!   4. LoadingFadeIn      screen fades back, coordinator returns to Idle
//!
//! RULES:
//!   - Only one save or load runs at a time; anything else is `Busy`.
//!   - A save file is read, decrypted and parsed before the first fade.
//!     A corrupt file never touches a collaborator.
//!   - Missing collaborators and unresolved ids are warnings, never errors.
//!   - A load can be cancelled up to the scene-load await point.

use crate::{
    codec,
    collaborator::{Collaborators, FadeTarget, SceneLoadStatus},
    config::SaveConfig,
    crypto::{self, SaveKey},
    error::{CorruptSaveError, ReferenceKind, SaveError, SaveResult, SaveWarning},
    event::{CoordinatorEvent, LoadReport, SaveReport},
    registry::ObjectRegistry,
    snapshot::{ObjectActiveState, StateSnapshot},
    store::SaveStore,
    types::PLAYER_TAG,
};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Saving,
    LoadingFadeOut,
    LoadingSceneSwap,
    LoadingApplyState,
    LoadingFadeIn,
}

impl CoordinatorState {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            Self::LoadingFadeOut
                | Self::LoadingSceneSwap
                | Self::LoadingApplyState
                | Self::LoadingFadeIn
        )
    }
}

struct PendingLoad {
    snapshot: StateSnapshot,
    elapsed:  f32,
    report:   LoadReport,
}

pub struct SaveCoordinator {
    config:        SaveConfig,
    key:           SaveKey,
    store:         SaveStore,
    registry:      ObjectRegistry,
    collaborators: Collaborators,
    state:         CoordinatorState,
    pending:       Option<PendingLoad>,
    events:        Vec<CoordinatorEvent>,
}

impl SaveCoordinator {
    pub fn new(config: SaveConfig, registry: ObjectRegistry, collaborators: Collaborators) -> Self {
        Self {
            key:      crypto::derive_key(&config.passphrase),
            store:    SaveStore::new(config.save_path()),
            state:    CoordinatorState::Idle,
            pending:  None,
            events:   Vec::new(),
            config,
            registry,
            collaborators,
        }
    }

    /// Build a coordinator with a fresh registry using the config's tracking rules.
    pub fn build(config: SaveConfig, collaborators: Collaborators) -> Self {
        let registry = ObjectRegistry::new(config.tracking.clone());
        Self::new(config, registry, collaborators)
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn config(&self) -> &SaveConfig {
        &self.config
    }

    pub fn store(&self) -> &SaveStore {
        &self.store
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collaborators
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn has_save(&self) -> bool {
        self.store.exists()
    }

    pub fn delete_save(&mut self) -> SaveResult<bool> {
        self.ensure_idle()?;
        let removed = self.store.delete()?;
        if removed {
            log::info!("deleted save at {}", self.store.path().display());
        }
        Ok(removed)
    }

    /// Rescan the registry after a gameplay scene load.
    pub fn notify_scene_loaded(&mut self, scene_name: &str) -> usize {
        match self.collaborators.entities.as_ref() {
            Some(entities) => {
                let all = entities.all_entities();
                self.registry.rescan(scene_name, &all)
            }
            None => {
                log::warn!("scene '{scene_name}' loaded but no entity lookup is available");
                0
            }
        }
    }

    fn ensure_idle(&self) -> SaveResult<()> {
        if self.state != CoordinatorState::Idle {
            return Err(SaveError::Busy { state: self.state });
        }
        Ok(())
    }

    fn fade(&mut self, target: FadeTarget, secs: f32) {
        match self.collaborators.fader.as_mut() {
            Some(fader) => fader.fade_to(target, secs),
            None => log::debug!("no screen fader; skipping fade to {target:?}"),
        }
    }

    // ── Save ───────────────────────────────────────────────────

    /// Gather, encode and write a save. Runs to completion.
    pub fn save(&mut self) -> SaveResult<SaveReport> {
        self.ensure_idle()?;
        self.state = CoordinatorState::Saving;
        self.events.push(CoordinatorEvent::SaveStarted);

        if let Some(indicator) = self.collaborators.indicator.as_mut() {
            indicator.show();
        }

        let result = self.write_save();

        if let Some(indicator) = self.collaborators.indicator.as_mut() {
            indicator.hide();
        }
        self.state = CoordinatorState::Idle;

        match &result {
            Ok(report) => {
                log::info!(
                    "saved scene '{}' ({} bytes, {} warnings)",
                    report.scene_name,
                    report.bytes_written,
                    report.warnings.len()
                );
                self.events.push(CoordinatorEvent::SaveCompleted { report: report.clone() });
            }
            Err(e) => {
                log::error!("save failed: {e}");
                self.events.push(CoordinatorEvent::SaveFailed { reason: e.to_string() });
            }
        }
        result
    }

    fn write_save(&mut self) -> SaveResult<SaveReport> {
        let (snapshot, warnings) = self.gather();
        let text = codec::serialize_with_time(&snapshot, Some(Utc::now()))?;
        let blob = crypto::encrypt(&text, &self.key)?;
        let bytes_written = self.store.write_atomic(&blob)?;
        Ok(SaveReport {
            path: self.store.path().to_path_buf(),
            scene_name: snapshot.scene_name,
            bytes_written,
            warnings,
        })
    }

    /// Pull the current state of every collaborator into a new snapshot.
    pub fn gather(&self) -> (StateSnapshot, Vec<SaveWarning>) {
        let c = &self.collaborators;
        let mut snapshot = StateSnapshot::default();
        let mut warnings = Vec::new();

        match c.scenes.as_ref() {
            Some(scenes) => snapshot.scene_name = scenes.active_scene_name(),
            None => missing(&mut warnings, "scene loader"),
        }

        match c.player.as_ref() {
            Some(player) => {
                snapshot.player_position = player.position();
                snapshot.player_rotation = player.rotation();
            }
            None => missing(&mut warnings, "player rig"),
        }

        match c.camera.as_ref() {
            Some(camera) => snapshot.camera_pitch = camera.pitch(),
            None => missing(&mut warnings, "camera rig"),
        }

        match c.flags.as_ref() {
            Some(flags) => {
                for key in flags.all_keys() {
                    let value = flags.get(&key);
                    snapshot.set_bool(key, value);
                }
            }
            None => missing(&mut warnings, "bool flag store"),
        }

        // Object states: present -> live active flag, absent -> only if known destroyed.
        let entities = c.entities.as_ref();
        if entities.is_none() {
            missing(&mut warnings, "entity lookup");
        }
        for (name, _) in self.registry.snapshot_tracked_names() {
            let live = entities.and_then(|e| e.find_by_name(&name));
            if let Some(entity) = live {
                snapshot.push_object(ObjectActiveState::present(name, entity.active));
            } else if self.registry.is_destroyed(&name) {
                snapshot.push_object(ObjectActiveState::destroyed(name));
            } else if entities.is_some() {
                warnings.push(SaveWarning::DestroyedEntityMismatch { name }.emit());
            }
        }

        match c.clock.as_ref() {
            Some(clock) => {
                let (hour, minute) = (clock.hour(), clock.minute());
                if hour >= crate::clock::HOURS_PER_DAY || minute >= crate::clock::MINUTES_PER_HOUR {
                    log::warn!("clock reports {hour:02}:{minute:02}; clamping into range");
                }
                snapshot.day = clock.day();
                snapshot.hour = hour.min(crate::clock::HOURS_PER_DAY - 1);
                snapshot.minute = minute.min(crate::clock::MINUTES_PER_HOUR - 1);
            }
            None => missing(&mut warnings, "world clock"),
        }

        match c.journal.as_ref() {
            Some(journal) => snapshot.journal_page_ids = journal.page_ids(),
            None => missing(&mut warnings, "journal tracker"),
        }

        match c.dialogue.as_ref() {
            Some(dialogue) => {
                for id in dialogue.all_dialogue_ids() {
                    let done = dialogue.progress(&id);
                    snapshot.set_dialogue(id, done);
                }
            }
            None => missing(&mut warnings, "dialogue tracker"),
        }

        match c.cutscenes.as_ref() {
            Some(cutscenes) => snapshot.completed_cutscene_ids = cutscenes.completed_ids(),
            None => missing(&mut warnings, "cutscene tracker"),
        }

        match c.stats.as_ref() {
            Some(stats) => {
                snapshot.oxygen = stats.oxygen();
                snapshot.energy = stats.energy();
            }
            None => missing(&mut warnings, "player stats"),
        }

        match c.inventory.as_ref() {
            Some(inventory) => snapshot.inventory_item_ids = inventory.item_ids(),
            None => missing(&mut warnings, "inventory"),
        }

        match c.tips.as_ref() {
            Some(tips) => snapshot.shown_tip_ids = tips.shown_ids(),
            None => missing(&mut warnings, "tip tracker"),
        }

        (snapshot, warnings)
    }

    // ── Load ───────────────────────────────────────────────────

    /// Read, decrypt and parse the save file without applying it.
    pub fn read_snapshot(&self) -> SaveResult<StateSnapshot> {
        let blob = self.store.read()?;
        let text = crypto::decrypt(&blob, &self.key).map_err(CorruptSaveError::from)?;
        Ok(codec::deserialize(&text)?)
    }

    /// Begin a load. The save file is fully decoded here; the rest of the
    /// sequence runs in `tick`.
    pub fn request_load(&mut self) -> SaveResult<()> {
        self.ensure_idle()?;

        let snapshot = match self.read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("load rejected: {e}");
                return Err(e);
            }
        };

        let scene = snapshot.scene_name.clone();
        log::info!("loading save for scene '{scene}'");
        self.events.push(CoordinatorEvent::LoadStarted { scene: scene.clone() });

        self.pending = Some(PendingLoad {
            snapshot,
            elapsed: 0.0,
            report: LoadReport {
                scene_name: scene,
                ..LoadReport::default()
            },
        });
        self.state = CoordinatorState::LoadingFadeOut;
        self.fade(FadeTarget::Opaque, self.config.pacing.fade_out_secs);
        Ok(())
    }

    /// Advance an in-flight load by one frame of `dt` seconds.
    /// Returns the state after this step.
    pub fn tick(&mut self, dt: f32) -> SaveResult<CoordinatorState> {
        // NaN or negative frame times would stall the fade timers.
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if !self.state.is_loading() {
            return Ok(self.state);
        }

        let Some(pending) = self.pending.as_mut() else {
            self.state = CoordinatorState::Idle;
            return Err(anyhow::anyhow!("load in progress without a decoded snapshot").into());
        };

        match self.state {
            CoordinatorState::LoadingFadeOut => {
                pending.elapsed += dt;
                let hold = self.config.pacing.fade_out_secs + self.config.pacing.pacing_delay_secs;
                if pending.elapsed >= hold {
                    let scene = pending.snapshot.scene_name.clone();
                    match self.collaborators.scenes.as_mut() {
                        Some(scenes) => {
                            scenes.begin_load(&scene);
                            self.events.push(CoordinatorEvent::SceneLoadRequested { scene });
                            self.state = CoordinatorState::LoadingSceneSwap;
                        }
                        None => {
                            missing(&mut pending.report.warnings, "scene loader");
                            self.state = CoordinatorState::LoadingApplyState;
                        }
                    }
                }
            }

            CoordinatorState::LoadingSceneSwap => {
                let status = match self.collaborators.scenes.as_mut() {
                    Some(scenes) => scenes.poll(),
                    None => SceneLoadStatus::Loaded,
                };
                match status {
                    SceneLoadStatus::Pending => {}
                    SceneLoadStatus::Loaded => {
                        let scene = pending.snapshot.scene_name.clone();
                        let newly_tracked = match self.collaborators.entities.as_ref() {
                            Some(entities) => {
                                let all = entities.all_entities();
                                self.registry.rescan(&scene, &all)
                            }
                            None => 0,
                        };
                        self.events.push(CoordinatorEvent::SceneLoaded { scene, newly_tracked });
                        self.state = CoordinatorState::LoadingApplyState;
                    }
                    SceneLoadStatus::Failed(reason) => {
                        let scene = pending.snapshot.scene_name.clone();
                        self.pending = None;
                        self.state = CoordinatorState::Idle;
                        self.fade(FadeTarget::Transparent, self.config.pacing.fade_in_secs);
                        log::error!("scene '{scene}' failed to load: {reason}");
                        self.events.push(CoordinatorEvent::LoadFailed {
                            scene: scene.clone(),
                            reason: reason.clone(),
                        });
                        return Err(SaveError::SceneLoad { scene, reason });
                    }
                }
            }

            CoordinatorState::LoadingApplyState => {
                apply_snapshot(
                    &mut self.collaborators,
                    &mut self.registry,
                    &pending.snapshot,
                    &mut pending.report,
                );
                self.events.push(CoordinatorEvent::StateApplied {
                    scene: pending.snapshot.scene_name.clone(),
                    warning_count: pending.report.warnings.len(),
                });
                pending.elapsed = 0.0;
                self.state = CoordinatorState::LoadingFadeIn;
                self.fade(FadeTarget::Transparent, self.config.pacing.fade_in_secs);
            }

            CoordinatorState::LoadingFadeIn => {
                pending.elapsed += dt;
                if pending.elapsed >= self.config.pacing.fade_in_secs {
                    if let Some(done) = self.pending.take() {
                        log::info!(
                            "load of '{}' complete ({} warnings)",
                            done.report.scene_name,
                            done.report.warnings.len()
                        );
                        self.events.push(CoordinatorEvent::LoadCompleted { report: done.report });
                    }
                    self.state = CoordinatorState::Idle;
                }
            }

            CoordinatorState::Idle | CoordinatorState::Saving => {}
        }

        Ok(self.state)
    }

    /// Abandon the current load. Only possible before state is applied.
    pub fn cancel_load(&mut self) -> bool {
        match self.state {
            CoordinatorState::LoadingFadeOut | CoordinatorState::LoadingSceneSwap => {
                if self.state == CoordinatorState::LoadingSceneSwap {
                    if let Some(scenes) = self.collaborators.scenes.as_mut() {
                        scenes.abort();
                    }
                }
                let scene = self
                    .pending
                    .take()
                    .map(|p| p.snapshot.scene_name)
                    .unwrap_or_default();
                self.state = CoordinatorState::Idle;
                self.fade(FadeTarget::Transparent, self.config.pacing.fade_in_secs);
                log::info!("load of '{scene}' cancelled");
                self.events.push(CoordinatorEvent::LoadCancelled { scene });
                true
            }
            _ => false,
        }
    }

    /// Request a load and tick it to completion with a fixed frame time.
    ///
    /// Running out of ticks before state is applied cancels the load and
    /// returns `Timeout`. Once state is applied the fade-in is cut short
    /// and the load completes, so the coordinator is always `Idle` on return.
    pub fn load_blocking(&mut self, dt: f32, max_ticks: u64) -> SaveResult<LoadReport> {
        self.request_load()?;
        for _ in 0..max_ticks {
            self.tick(dt)?;
            if self.state == CoordinatorState::Idle {
                return self.last_load_report();
            }
        }

        if self.cancel_load() {
            return Err(SaveError::Timeout { ticks: max_ticks });
        }
        log::warn!(
            "load ran past {max_ticks} ticks in {:?}; finishing without the fade",
            self.state
        );
        self.finish_load()?;
        self.last_load_report()
    }

    /// Drive a load that is past the cancellable window straight to `Idle`.
    fn finish_load(&mut self) -> SaveResult<()> {
        if self.state == CoordinatorState::LoadingApplyState {
            self.tick(0.0)?;
        }
        if self.state == CoordinatorState::LoadingFadeIn {
            if let Some(pending) = self.pending.as_mut() {
                pending.elapsed = self.config.pacing.fade_in_secs;
            }
            self.tick(0.0)?;
        }
        Ok(())
    }

    fn last_load_report(&self) -> SaveResult<LoadReport> {
        let report = self.events.iter().rev().find_map(|e| match e {
            CoordinatorEvent::LoadCompleted { report } => Some(report.clone()),
            _ => None,
        });
        report.ok_or_else(|| anyhow::anyhow!("load finished without a completion event").into())
    }
}

/// Record a missing collaborator once per operation.
fn missing(warnings: &mut Vec<SaveWarning>, collaborator: &'static str) {
    let warning = SaveWarning::MissingCollaborator { collaborator };
    if !warnings.contains(&warning) {
        warnings.push(warning.emit());
    }
}

fn record_destroyed(registry: &mut ObjectRegistry, name: &str) {
    if !registry.is_registered(name) {
        registry.register(name);
    }
    registry.mark_destroyed(name);
}

/// Reconcile `snapshot` against the freshly loaded world.
/// Step order matters: later steps assume the player exists and is placed.
fn apply_snapshot(
    c: &mut Collaborators,
    registry: &mut ObjectRegistry,
    snapshot: &StateSnapshot,
    report: &mut LoadReport,
) {
    let warnings = &mut report.warnings;

    // a. player transform
    match c.player.as_mut() {
        Some(player) => player.set_transform(snapshot.player_position, snapshot.player_rotation),
        None => missing(warnings, "player rig"),
    }

    // b. camera pitch
    match c.camera.as_mut() {
        Some(camera) => camera.set_pitch(snapshot.camera_pitch),
        None => missing(warnings, "camera rig"),
    }

    // c. bool flags, overwrite
    match c.flags.as_mut() {
        Some(flags) => {
            for state in &snapshot.bool_states {
                flags.set(&state.key, state.value);
            }
        }
        None => missing(warnings, "bool flag store"),
    }

    // d. object states
    match c.entities.as_mut() {
        Some(entities) => {
            for state in &snapshot.object_active_states {
                let found = entities.find_by_name(&state.name).is_some();
                match (found, state.is_destroyed) {
                    (true, false) => {
                        entities.set_active(&state.name, state.is_active);
                        report.objects_restored += 1;
                    }
                    (true, true) => {
                        entities.destroy(&state.name);
                        record_destroyed(registry, &state.name);
                        report.objects_destroyed += 1;
                    }
                    (false, true) => {
                        record_destroyed(registry, &state.name);
                        log::debug!("'{}' already absent; recorded as destroyed", state.name);
                    }
                    (false, false) => {
                        warnings.push(
                            SaveWarning::DestroyedEntityMismatch { name: state.name.clone() }.emit(),
                        );
                    }
                }
            }
        }
        None => {
            missing(warnings, "entity lookup");
            for state in snapshot.object_active_states.iter().filter(|s| s.is_destroyed) {
                record_destroyed(registry, &state.name);
            }
        }
    }

    // e. clock
    match c.clock.as_mut() {
        Some(clock) => {
            clock.set_time(snapshot.day, snapshot.hour, snapshot.minute);
            clock.recompute();
        }
        None => missing(warnings, "world clock"),
    }

    // f. journal pages
    match c.journal.as_mut() {
        Some(journal) => {
            for id in &snapshot.journal_page_ids {
                match journal.find_page_by_id(id) {
                    Some(page) => journal.add_page(page),
                    None => warnings.push(
                        SaveWarning::UnresolvedReference {
                            kind: ReferenceKind::JournalPage,
                            id: id.clone(),
                        }
                        .emit(),
                    ),
                }
            }
        }
        None => missing(warnings, "journal tracker"),
    }

    // g. vitals
    match c.stats.as_mut() {
        Some(stats) => {
            stats.set_oxygen(snapshot.oxygen);
            stats.set_energy(snapshot.energy);
        }
        None => missing(warnings, "player stats"),
    }

    // h. dialogue progress
    match c.dialogue.as_mut() {
        Some(dialogue) => {
            for state in &snapshot.dialogue_states {
                dialogue.set_progress(&state.dialogue_tree_id, state.is_completed);
            }
        }
        None => missing(warnings, "dialogue tracker"),
    }

    // i. cutscenes
    match c.cutscenes.as_mut() {
        Some(cutscenes) => {
            for id in &snapshot.completed_cutscene_ids {
                cutscenes.mark_completed(id);
            }
        }
        None => missing(warnings, "cutscene tracker"),
    }

    // j. tips, replace
    match c.tips.as_mut() {
        Some(tips) => tips.set_shown_ids(snapshot.shown_tip_ids.clone()),
        None => missing(warnings, "tip tracker"),
    }

    // k. inventory
    match (c.inventory.as_mut(), c.items.as_ref()) {
        (Some(inventory), Some(items)) => {
            let mut resolved = Vec::with_capacity(snapshot.inventory_item_ids.len());
            for id in &snapshot.inventory_item_ids {
                match items.resolve(id) {
                    Some(definition) => resolved.push(definition.id),
                    None => warnings.push(
                        SaveWarning::UnresolvedReference {
                            kind: ReferenceKind::Item,
                            id: id.clone(),
                        }
                        .emit(),
                    ),
                }
            }
            report.items_restored = resolved.len();
            inventory.load_from_ids(&resolved);
        }
        (inventory, items) => {
            if inventory.is_none() {
                missing(warnings, "inventory");
            }
            if items.is_none() {
                missing(warnings, "item catalog");
            }
        }
    }

    // l. player alive
    match c.stats.as_mut() {
        Some(stats) => stats.set_alive(true),
        None => missing(warnings, "player stats"),
    }
    if let Some(entities) = c.entities.as_mut() {
        for player in entities.find_by_tag(PLAYER_TAG) {
            entities.set_active(&player.name, true);
        }
    }
}
