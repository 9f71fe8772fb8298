//! save-runner: headless tooling for world-state save files.
//!
//! Usage:
//!   save-runner decode --file save.dat [--passphrase <p>]
//!   save-runner encode --input snapshot.json --file save.dat [--passphrase <p>]
//!   save-runner demo [--data-dir ./data] [--config save_config.json]

use anyhow::{bail, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use worldsave_core::{
    codec,
    config::{SaveConfig, DEFAULT_PASSPHRASE},
    coordinator::SaveCoordinator,
    crypto,
    error::CorruptSaveError,
    event::LoadReport,
    memory_world::{SceneTemplate, SharedWorld},
    store::SaveStore,
    types::{EntityInfo, Quat, Vec3, PLAYER_TAG},
};

const TRACKED_LAYER: u8 = 8;
const DEMO_SCENE: &str = "Level_Tidewater";

#[derive(serde::Serialize)]
struct DecodedSave {
    header:   codec::SaveHeader,
    snapshot: worldsave_core::snapshot::StateSnapshot,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let passphrase = str_arg(&args, "--passphrase").unwrap_or(DEFAULT_PASSPHRASE);

    match command.as_str() {
        "decode" => {
            let file = str_arg(&args, "--file").context("decode requires --file")?;
            decode(Path::new(file), passphrase)
        }
        "encode" => {
            let input = str_arg(&args, "--input").context("encode requires --input")?;
            let file = str_arg(&args, "--file").context("encode requires --file")?;
            encode(Path::new(input), Path::new(file), passphrase)
        }
        "demo" => {
            let mut config = match str_arg(&args, "--config") {
                Some(path) => SaveConfig::load(Path::new(path))?,
                None => SaveConfig::default(),
            };
            if let Some(dir) = str_arg(&args, "--data-dir") {
                config.data_dir = PathBuf::from(dir);
            }
            run_demo(config)
        }
        other => {
            print_usage();
            bail!("unknown command: {other}")
        }
    }
}

fn decode(file: &Path, passphrase: &str) -> Result<()> {
    let blob = SaveStore::new(file).read()?;
    let key = crypto::derive_key(passphrase);
    let text = crypto::decrypt(&blob, &key).map_err(CorruptSaveError::from)?;
    let decoded = DecodedSave {
        header: codec::read_header(&text)?,
        snapshot: codec::deserialize(&text)?,
    };
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

fn encode(input: &Path, file: &Path, passphrase: &str) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("Cannot read {}", input.display()))?;
    let snapshot = codec::deserialize(&text)?;
    let json = codec::serialize_with_time(&snapshot, Some(chrono::Utc::now()))?;
    let blob = crypto::encrypt(&json, &crypto::derive_key(passphrase))?;
    let bytes = SaveStore::new(file).write_atomic(&blob)?;
    println!("wrote {bytes} bytes to {}", file.display());
    Ok(())
}

/// Build a small world, play a little, save, wreck the live state, load.
fn run_demo(config: SaveConfig) -> Result<()> {
    let world = SharedWorld::new();
    world.add_scene(demo_scene());
    world.add_item_definition("Flashlight", "Flashlight");
    world.add_item_definition("Rope", "Climbing Rope");
    world.add_page_definition("page_lighthouse", "The Lighthouse Keeper");
    world.enter_scene(DEMO_SCENE);

    let mut coordinator = SaveCoordinator::build(config, world.collaborators());
    coordinator.notify_scene_loaded(DEMO_SCENE);

    {
        let mut w = world.borrow_mut();
        w.flags.insert("MetKeeper".into(), true);
        w.inventory = vec!["Flashlight".into(), "Rope".into()];
        w.time.day = 3;
        w.time.hour = 14;
        w.time.minute = 30;
        w.oxygen = 57.5;
        w.player_position = Vec3::new(12.0, 3.5, -40.0);
        w.player_rotation = Quat::from_rotation_y(1.2);
        w.camera_pitch = -12.0;
    }
    world.remove_entity("Crate_03");
    coordinator.registry_mut().mark_destroyed("Crate_03");

    println!("save-runner demo");
    println!("  save path: {}", coordinator.store().path().display());

    let saved = coordinator.save()?;
    log::info!("demo save written to {}", saved.path.display());
    println!("  saved {} bytes ({} warnings)", saved.bytes_written, saved.warnings.len());

    {
        let mut w = world.borrow_mut();
        w.inventory.clear();
        w.oxygen = 5.0;
        w.flags.clear();
    }

    let report = coordinator.load_blocking(1.0 / 60.0, 10_000)?;
    for event in coordinator.drain_events() {
        log::debug!("{}", serde_json::to_string(&event)?);
    }
    print_report(&report, &world);
    Ok(())
}

fn demo_scene() -> SceneTemplate {
    let mut scene = SceneTemplate::new(
        DEMO_SCENE,
        vec![
            EntityInfo::new("Player", 0).with_tag(PLAYER_TAG),
            EntityInfo::new("Crate_01", TRACKED_LAYER),
            EntityInfo::new("Crate_02", TRACKED_LAYER),
            EntityInfo::new("Crate_03", TRACKED_LAYER),
            EntityInfo::new("Gate_North", TRACKED_LAYER).inactive(),
            EntityInfo::new("Rock_Decor", 0),
        ],
    );
    scene.spawn_position = Vec3::new(0.0, 1.0, 0.0);
    scene
}

fn print_report(report: &LoadReport, world: &SharedWorld) {
    let w = world.borrow();
    println!("=== LOAD SUMMARY ===");
    println!("  scene:             {}", report.scene_name);
    println!("  objects restored:  {}", report.objects_restored);
    println!("  objects destroyed: {}", report.objects_destroyed);
    println!("  items restored:    {}", report.items_restored);
    println!("  clock:             day {} {:02}:{:02}", w.time.day, w.time.hour, w.time.minute);
    println!("  oxygen:            {:.1}", w.oxygen);
    println!("  inventory:         {:?}", w.inventory);
    for warning in &report.warnings {
        println!("  warning: {}", serde_json::to_string(warning).unwrap_or_default());
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  save-runner decode --file <save.dat> [--passphrase <p>]");
    eprintln!("  save-runner encode --input <snapshot.json> --file <save.dat> [--passphrase <p>]");
    eprintln!("  save-runner demo [--data-dir <dir>] [--config <save_config.json>]");
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
