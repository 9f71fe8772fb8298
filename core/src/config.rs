use crate::types::LayerMask;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SAVE_FILE_NAME: &str = "save.dat";

/// Compiled-in passphrase. Only obscures casual save-file edits.
pub const DEFAULT_PASSPHRASE: &str = "lantern-under-the-tidewater-cliffs";

// ── Object tracking ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// A scene is trackable when its name contains any of these.
    pub scene_allowlist: Vec<String>,
    /// Entities on layers outside this mask are never registered.
    pub layer_mask: LayerMask,
}

impl TrackingConfig {
    pub fn is_trackable_scene(&self, scene_name: &str) -> bool {
        self.scene_allowlist
            .iter()
            .any(|needle| scene_name.contains(needle.as_str()))
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            scene_allowlist: vec!["Level".into(), "Game".into(), "Test".into()],
            // Layer 8: "Trackable".
            layer_mask: LayerMask::from_layers(&[8]),
        }
    }
}

// ── Load pacing ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    pub fade_out_secs:     f32,
    pub fade_in_secs:      f32,
    /// Hold on the opaque screen before swapping scenes.
    pub pacing_delay_secs: f32,
}

impl PacingConfig {
    /// Every duration must be finite and non-negative.
    pub fn validate(&self) -> anyhow::Result<()> {
        let fields = [
            ("fade_out_secs", self.fade_out_secs),
            ("fade_in_secs", self.fade_in_secs),
            ("pacing_delay_secs", self.pacing_delay_secs),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("pacing.{name} must be a finite, non-negative number of seconds (got {value})");
            }
        }
        Ok(())
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            fade_out_secs: 1.0,
            fade_in_secs: 1.0,
            pacing_delay_secs: 0.5,
        }
    }
}

// ── Root config ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConfig {
    /// Application-data directory holding the save file.
    pub data_dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_passphrase")]
    pub passphrase: String,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
}

fn default_file_name() -> String {
    DEFAULT_SAVE_FILE_NAME.into()
}

fn default_passphrase() -> String {
    DEFAULT_PASSPHRASE.into()
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            file_name: default_file_name(),
            passphrase: default_passphrase(),
            tracking: TrackingConfig::default(),
            pacing: PacingConfig::default(),
        }
    }
}

impl SaveConfig {
    /// Load from a JSON file. Omitted sections take their defaults.
    /// In tests, use SaveConfig::default_test().
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: SaveConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {}: {e}", path.display()))?;
        if config.file_name.is_empty() {
            anyhow::bail!("{}: file_name must not be empty", path.display());
        }
        config
            .pacing
            .validate()
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Ok(config)
    }

    /// Config rooted at `data_dir` with zero-length fades, so a load
    /// completes in a handful of ticks.
    pub fn default_test_in(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            pacing: PacingConfig {
                fade_out_secs: 0.0,
                fade_in_secs: 0.0,
                pacing_delay_secs: 0.0,
            },
            ..Self::default()
        }
    }

    /// Test config rooted in the system temp directory.
    pub fn default_test() -> Self {
        Self::default_test_in(std::env::temp_dir().join("worldsave-test"))
    }

    pub fn save_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}
