//! Snapshot codec — StateSnapshot to/from the JSON text that gets encrypted.
//!
//! The envelope carries a `schema_version` and an optional `saved_at`
//! stamp next to the flattened snapshot fields. Files written before
//! versioning existed have no `schema_version` and read as version 0.

use crate::{
    clock::{HOURS_PER_DAY, MINUTES_PER_HOUR},
    error::CorruptSaveError,
    snapshot::StateSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;
pub const LEGACY_SCHEMA_VERSION:  u32 = 0;

/// Metadata read from the envelope without interpreting the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveHeader {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    saved_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    snapshot: &'a StateSnapshot,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(flatten)]
    header: SaveHeader,
    #[serde(flatten)]
    snapshot: StateSnapshot,
}

pub fn serialize(snapshot: &StateSnapshot) -> Result<String, CorruptSaveError> {
    serialize_with_time(snapshot, None)
}

/// Serialize a normalized copy of `snapshot`, stamped with `saved_at`.
pub fn serialize_with_time(
    snapshot: &StateSnapshot,
    saved_at: Option<DateTime<Utc>>,
) -> Result<String, CorruptSaveError> {
    let normalized = snapshot.clone().normalized();
    let envelope = EnvelopeRef {
        schema_version: CURRENT_SCHEMA_VERSION,
        saved_at,
        snapshot: &normalized,
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn deserialize(text: &str) -> Result<StateSnapshot, CorruptSaveError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    check_version(envelope.header.schema_version)?;
    if envelope.header.schema_version == LEGACY_SCHEMA_VERSION {
        log::info!("reading pre-versioning save file");
    }
    validate(&envelope.snapshot)?;
    Ok(envelope.snapshot)
}

pub fn read_header(text: &str) -> Result<SaveHeader, CorruptSaveError> {
    let header: SaveHeader = serde_json::from_str(text)?;
    check_version(header.schema_version)?;
    Ok(header)
}

fn check_version(found: u32) -> Result<(), CorruptSaveError> {
    if found > CURRENT_SCHEMA_VERSION {
        return Err(CorruptSaveError::UnsupportedVersion {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }
    Ok(())
}

fn validate(snapshot: &StateSnapshot) -> Result<(), CorruptSaveError> {
    if snapshot.hour >= HOURS_PER_DAY {
        return Err(CorruptSaveError::InvalidField {
            field: "hour",
            reason: format!("{} is not in 0..24", snapshot.hour),
        });
    }
    if snapshot.minute >= MINUTES_PER_HOUR {
        return Err(CorruptSaveError::InvalidField {
            field: "minute",
            reason: format!("{} is not in 0..60", snapshot.minute),
        });
    }

    let floats = [
        ("oxygen", snapshot.oxygen),
        ("energy", snapshot.energy),
        ("camera_pitch", snapshot.camera_pitch),
    ];
    for (field, value) in floats {
        if !value.is_finite() {
            return Err(CorruptSaveError::InvalidField {
                field,
                reason: format!("{value} is not finite"),
            });
        }
    }
    if !snapshot.player_position.is_finite() || !snapshot.player_rotation.is_finite() {
        return Err(CorruptSaveError::InvalidField {
            field: "player_transform",
            reason: "non-finite component".into(),
        });
    }
    Ok(())
}
