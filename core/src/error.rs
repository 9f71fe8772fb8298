use crate::coordinator::CoordinatorState;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("No save file at {}", .path.display())]
    NoSaveFile { path: PathBuf },

    #[error("Save file is corrupt: {0}")]
    CorruptSave(#[from] CorruptSaveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Coordinator busy: a save or load is already running ({state:?})")]
    Busy { state: CoordinatorState },

    #[error("Scene '{scene}' failed to load: {reason}")]
    SceneLoad { scene: String, reason: String },

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Load did not finish within {ticks} ticks")]
    Timeout { ticks: u64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Structural failure while turning save-file text back into a snapshot.
/// Always fatal to the load.
#[derive(Error, Debug)]
pub enum CorruptSaveError {
    #[error("Decryption failed: {0}")]
    Decryption(#[from] DecryptionError),

    #[error("Malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported schema version {found} (newest known is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    #[error("ciphertext is not valid base64")]
    Base64,

    #[error("ciphertext too short ({len} bytes)")]
    Truncated { len: usize },

    #[error("authentication failed (wrong key or tampered data)")]
    Authentication,

    #[error("plaintext is not valid UTF-8")]
    Utf8,
}

pub type SaveResult<T> = Result<T, SaveError>;

// ── Non-fatal warnings ──────────────────────────────────────────

/// Missing-data conditions. Logged and skipped, never abort an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaveWarning {
    MissingCollaborator {
        collaborator: &'static str,
    },
    UnresolvedReference {
        kind: ReferenceKind,
        id:   String,
    },
    DestroyedEntityMismatch {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    Item,
    JournalPage,
}

impl SaveWarning {
    /// Log the warning and hand it back for collection into a report.
    pub fn emit(self) -> Self {
        match &self {
            Self::MissingCollaborator { collaborator } => {
                log::warn!("{collaborator} is not available; skipping its state");
            }
            Self::UnresolvedReference { kind, id } => {
                log::warn!("saved {kind:?} id '{id}' has no live definition; skipped");
            }
            Self::DestroyedEntityMismatch { name } => {
                log::warn!("object '{name}' is neither present nor known-destroyed");
            }
        }
        self
    }
}
