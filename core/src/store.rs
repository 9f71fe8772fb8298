//! Save-file persistence layer.
//!
//! RULE: Only store.rs talks to the disk.
//! The coordinator calls store methods; it never opens files directly.
//!
//! Writes go to `<file>.tmp` first and are renamed over the real file,
//! so a crash mid-write leaves the previous save intact.

use crate::error::{SaveError, SaveResult};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("save.dat");
        let tmp_name = format!("{file_name}.tmp");
        match self.path.parent() {
            Some(parent) => parent.join(tmp_name),
            None => PathBuf::from(tmp_name),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the whole save file. A missing file is `NoSaveFile`.
    pub fn read(&self) -> SaveResult<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SaveError::NoSaveFile {
                path: self.path.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `text` atomically, replacing any existing save.
    /// Returns the number of bytes written.
    pub fn write_atomic(&self, text: &str) -> SaveResult<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.temp_path();
        if let Err(e) = write_synced(&tmp_path, text.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        // rename() replaces the destination atomically on the platforms we ship.
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        log::debug!("wrote {} bytes to {}", text.len(), self.path.display());
        Ok(text.len())
    }

    /// Remove the save file. Returns false when there was nothing to remove.
    pub fn delete(&self) -> SaveResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `bytes` and sync them to disk. Must complete before the rename.
fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
