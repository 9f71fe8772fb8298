//! Save/load integration tests against the in-memory world.
//!
//! Tests cover: the clock/vitals/inventory scenario, object reconciliation
//! against a fresh scene, corrupt files, missing collaborators, unresolved
//! ids, atomic writes.

use std::fs;
use std::path::Path;
use worldsave_core::{
    codec,
    config::SaveConfig,
    coordinator::{CoordinatorState, SaveCoordinator},
    crypto,
    error::{ReferenceKind, SaveError, SaveWarning},
    event::LoadReport,
    memory_world::{SceneTemplate, SharedWorld},
    snapshot::{BoolState, ObjectActiveState, StateSnapshot},
    store::SaveStore,
    types::{EntityInfo, Quat, Vec3, PLAYER_TAG},
};

const LEVEL: &str = "Level_Test";
const TRACKED: u8 = 8;
const DT: f32 = 1.0 / 60.0;

fn level_scene() -> SceneTemplate {
    SceneTemplate::new(
        LEVEL,
        vec![
            EntityInfo::new("Player", 0).with_tag(PLAYER_TAG),
            EntityInfo::new("Crate_01", TRACKED),
            EntityInfo::new("Crate_02", TRACKED),
            EntityInfo::new("Gate_North", TRACKED).inactive(),
            EntityInfo::new("Rock_Decor", 0),
        ],
    )
}

fn build_world() -> SharedWorld {
    let world = SharedWorld::new();
    world.add_scene(level_scene());
    world.add_item_definition("Flashlight", "Flashlight");
    world.add_item_definition("Rope", "Climbing Rope");
    world.add_page_definition("page_lighthouse", "The Lighthouse Keeper");
    world.enter_scene(LEVEL);
    world
}

fn build(dir: &Path, world: &SharedWorld) -> SaveCoordinator {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = SaveConfig::default_test_in(dir);
    let mut coordinator = SaveCoordinator::build(config, world.collaborators());
    coordinator.notify_scene_loaded(LEVEL);
    coordinator
}

/// Write `snapshot` straight to the coordinator's save path.
fn write_snapshot(coordinator: &SaveCoordinator, snapshot: &StateSnapshot) {
    let config = coordinator.config();
    let text = codec::serialize(snapshot).expect("serialize");
    let blob = crypto::encrypt(&text, &crypto::derive_key(&config.passphrase)).expect("encrypt");
    SaveStore::new(config.save_path()).write_atomic(&blob).expect("write");
}

fn load(coordinator: &mut SaveCoordinator) -> LoadReport {
    coordinator.load_blocking(DT, 100).expect("load")
}

#[test]
fn clock_vitals_and_inventory_survive_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    {
        let mut w = world.borrow_mut();
        w.time.day = 3;
        w.time.hour = 14;
        w.time.minute = 30;
        w.oxygen = 57.5;
        w.inventory = vec!["Flashlight".into(), "Rope".into()];
    }
    coordinator.save().expect("save");

    {
        let mut w = world.borrow_mut();
        w.time.day = 9;
        w.time.hour = 2;
        w.time.minute = 0;
        w.oxygen = 3.0;
        w.inventory.clear();
    }
    load(&mut coordinator);

    let w = world.borrow();
    assert_eq!((w.time.day, w.time.hour, w.time.minute), (3, 14, 30));
    assert_eq!(w.oxygen, 57.5);
    assert_eq!(w.inventory, vec!["Flashlight".to_string(), "Rope".to_string()]);
    assert!(w.alive, "player must be marked alive after a load");
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[test]
fn player_camera_flags_and_progress_are_restored() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    let rotation = Quat::from_rotation_y(1.25);
    {
        let mut w = world.borrow_mut();
        w.player_position = Vec3::new(12.0, 3.5, -40.0);
        w.player_rotation = rotation;
        w.camera_pitch = -12.5;
        w.flags.insert("MetKeeper".into(), true);
        w.flags.insert("LighthouseLit".into(), false);
        w.dialogue.insert("keeper_intro".into(), true);
        w.cutscenes.push("storm".into());
        w.tips = vec!["tip_climb".into()];
        w.energy = 42.0;
    }
    coordinator.save().unwrap();

    {
        let mut w = world.borrow_mut();
        w.flags.insert("MetKeeper".into(), false);
        w.dialogue.clear();
        w.cutscenes.clear();
        w.tips = vec!["tip_other".into()];
        w.energy = 100.0;
        w.alive = false;
    }
    load(&mut coordinator);

    let w = world.borrow();
    assert_eq!(w.player_position, Vec3::new(12.0, 3.5, -40.0));
    assert!(w.player_rotation.abs_diff_eq(rotation, 1e-6));
    assert_eq!(w.camera_pitch, -12.5);
    assert_eq!(w.flags.get("MetKeeper"), Some(&true));
    assert_eq!(w.flags.get("LighthouseLit"), Some(&false));
    assert_eq!(w.dialogue.get("keeper_intro"), Some(&true));
    assert_eq!(w.cutscenes, vec!["storm".to_string()]);
    assert_eq!(w.tips, vec!["tip_climb".to_string()], "tips are replaced, not merged");
    assert_eq!(w.energy, 42.0);
    assert!(w.alive);
}

#[test]
fn destroyed_and_inactive_objects_are_reconciled_with_fresh_scene() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    // Gameplay: Crate_02 gets smashed, the gate opens.
    world.remove_entity("Crate_02");
    coordinator.registry_mut().mark_destroyed("Crate_02");
    world.borrow_mut().entities.iter_mut()
        .filter(|e| e.name == "Gate_North")
        .for_each(|e| e.active = true);

    let saved = coordinator.save().unwrap();
    assert!(saved.warnings.is_empty(), "unexpected warnings: {:?}", saved.warnings);

    let report = load(&mut coordinator);

    let w = world.borrow();
    assert!(w.entity("Crate_02").is_none(), "destroyed crate must be removed from the fresh scene");
    assert_eq!(w.entity("Gate_North").map(|e| e.active), Some(true));
    assert_eq!(w.entity("Crate_01").map(|e| e.active), Some(true));
    assert!(w.entity("Rock_Decor").is_some(), "untracked objects are left alone");
    assert!(coordinator.registry().is_destroyed("Crate_02"));
    assert_eq!(report.objects_destroyed, 1);
    assert_eq!(report.objects_restored, 2);
}

#[test]
fn destroyed_object_absent_from_scene_is_recorded_in_registry() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    let mut snapshot = StateSnapshot::new(LEVEL);
    snapshot.push_object(ObjectActiveState::destroyed("Barrel_Far"));
    write_snapshot(&coordinator, &snapshot);

    let report = load(&mut coordinator);

    assert!(coordinator.registry().is_destroyed("Barrel_Far"));
    assert!(report.warnings.is_empty(), "already-absent destroyed objects are not a warning");
}

#[test]
fn missing_live_object_only_warns() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    let mut snapshot = StateSnapshot::new(LEVEL);
    snapshot.push_object(ObjectActiveState::present("Ghost", true));
    snapshot.push_object(ObjectActiveState::present("Crate_01", false));
    write_snapshot(&coordinator, &snapshot);

    let report = load(&mut coordinator);

    assert!(report.warnings.contains(&SaveWarning::DestroyedEntityMismatch { name: "Ghost".into() }));
    assert_eq!(
        world.borrow().entity("Crate_01").map(|e| e.active),
        Some(false),
        "the rest of the object list must still apply"
    );
}

#[test]
fn vanished_untracked_destruction_warns_during_save() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    // Removed from the scene but nobody told the registry.
    world.remove_entity("Crate_01");
    let report = coordinator.save().unwrap();

    assert!(report.warnings.contains(&SaveWarning::DestroyedEntityMismatch { name: "Crate_01".into() }));
    let saved = coordinator.read_snapshot().unwrap();
    assert!(saved.object_active_states.iter().all(|o| o.name != "Crate_01"));
}

#[test]
fn truncated_save_is_corrupt_and_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);
    world.borrow_mut().inventory = vec!["Rope".into()];
    coordinator.save().unwrap();

    let path = coordinator.config().save_path();
    let blob = fs::read_to_string(&path).unwrap();
    fs::write(&path, &blob[..5]).unwrap();

    world.borrow_mut().inventory = vec!["Flashlight".into()];
    let mutations_before = world.borrow().mutations;
    let fades_before = world.borrow().fades.len();

    let err = coordinator.request_load().unwrap_err();

    assert!(matches!(err, SaveError::CorruptSave(_)), "expected CorruptSave, got {err:?}");
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
    let w = world.borrow();
    assert_eq!(w.mutations, mutations_before, "a corrupt load must not touch collaborators");
    assert_eq!(w.fades.len(), fades_before);
    assert_eq!(w.inventory, vec!["Flashlight".to_string()]);
}

#[test]
fn wrong_passphrase_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);
    coordinator.save().unwrap();

    let mut config = SaveConfig::default_test_in(dir.path());
    config.passphrase = "someone-else".into();
    let mut other = SaveCoordinator::build(config, world.collaborators());

    assert!(matches!(other.request_load(), Err(SaveError::CorruptSave(_))));
}

#[test]
fn load_without_save_file_is_no_save_file() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    assert!(!coordinator.has_save());
    let err = coordinator.request_load().unwrap_err();
    assert!(matches!(err, SaveError::NoSaveFile { .. }), "got {err:?}");
    assert_eq!(coordinator.state(), CoordinatorState::Idle);
}

#[test]
fn missing_collaborators_are_skipped_with_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut collaborators = world.collaborators();
    collaborators.journal = None;
    collaborators.stats = None;
    let mut coordinator =
        SaveCoordinator::build(SaveConfig::default_test_in(dir.path()), collaborators);
    coordinator.notify_scene_loaded(LEVEL);

    world.borrow_mut().inventory = vec!["Rope".into()];
    let saved = coordinator.save().expect("a partial save is still a save");
    assert!(saved.warnings.contains(&SaveWarning::MissingCollaborator { collaborator: "journal tracker" }));
    assert!(saved.warnings.contains(&SaveWarning::MissingCollaborator { collaborator: "player stats" }));

    world.borrow_mut().inventory.clear();
    let report = load(&mut coordinator);

    let stats_warnings = report
        .warnings
        .iter()
        .filter(|w| **w == SaveWarning::MissingCollaborator { collaborator: "player stats" })
        .count();
    assert_eq!(stats_warnings, 1, "each missing collaborator is reported once");
    assert_eq!(world.borrow().inventory, vec!["Rope".to_string()]);
}

#[test]
fn unresolved_items_and_pages_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    let mut snapshot = StateSnapshot::new(LEVEL);
    snapshot.inventory_item_ids = vec!["Flashlight".into(), "Unobtainium".into(), "Rope".into()];
    snapshot.journal_page_ids = vec!["page_lighthouse".into(), "page_torn".into()];
    write_snapshot(&coordinator, &snapshot);

    let report = load(&mut coordinator);

    let w = world.borrow();
    assert_eq!(w.inventory, vec!["Flashlight".to_string(), "Rope".to_string()]);
    assert_eq!(w.journal_ids(), vec!["page_lighthouse".to_string()]);
    assert_eq!(report.items_restored, 2);
    assert!(report.warnings.contains(&SaveWarning::UnresolvedReference {
        kind: ReferenceKind::Item,
        id: "Unobtainium".into(),
    }));
    assert!(report.warnings.contains(&SaveWarning::UnresolvedReference {
        kind: ReferenceKind::JournalPage,
        id: "page_torn".into(),
    }));
}

#[test]
fn duplicate_flag_keys_keep_the_last_value() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    let mut snapshot = StateSnapshot::new(LEVEL);
    snapshot.bool_states = vec![
        BoolState { key: "MetNPC1".into(), value: true },
        BoolState { key: "MetNPC1".into(), value: false },
    ];
    write_snapshot(&coordinator, &snapshot);

    let stored = coordinator.read_snapshot().unwrap();
    assert_eq!(stored.bool_states.len(), 1);
    assert_eq!(stored.bool_value("MetNPC1"), Some(false));

    world.borrow_mut().flags.insert("MetNPC1".into(), true);
    load(&mut coordinator);
    assert_eq!(world.borrow().flags.get("MetNPC1"), Some(&false));
}

#[test]
fn save_is_atomic_and_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);

    world.borrow_mut().oxygen = 10.0;
    coordinator.save().unwrap();
    world.borrow_mut().oxygen = 20.0;
    let report = coordinator.save().unwrap();

    let store = coordinator.store().clone();
    assert!(store.exists());
    assert!(!store.temp_path().exists(), "temp file must be renamed away");
    assert_eq!(report.path.as_path(), store.path());
    assert_eq!(coordinator.read_snapshot().unwrap().oxygen, 20.0);
    assert!(!world.borrow().indicator_visible, "indicator hidden after save");
    assert_eq!(world.borrow().indicator_shows, 2);
}

#[test]
fn delete_save_removes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let world = build_world();
    let mut coordinator = build(dir.path(), &world);
    coordinator.save().unwrap();

    assert!(coordinator.delete_save().unwrap());
    assert!(!coordinator.has_save());
    assert!(!coordinator.delete_save().unwrap(), "second delete has nothing to remove");
}
