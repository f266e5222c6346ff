//! JSON file persistence for rated entries.
//!
//! The whole mapping is read and written as one document. Saves go through a
//! temporary file in the same directory and are renamed over the target.

use crate::analysis::recompute;
use crate::error::{RatingError, Result};
use crate::models::Entry;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// All entries, keyed (and therefore ordered) by name.
pub type Entries = BTreeMap<String, Entry>;

/// Whole-document JSON store at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Create a store for the given file. Nothing is touched on disk yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every entry.
    ///
    /// A missing file is created empty. A file that is not a valid ratings
    /// document is moved aside and an empty mapping is returned.
    pub fn load(&self) -> Result<Entries> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.bootstrap()?;
                return Ok(Entries::new());
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                self.recover(RatingError::MalformedStore {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
                return Ok(Entries::new());
            }
            Err(e) => return Err(RatingError::persistence(&self.path, e)),
        };

        if content.trim().is_empty() {
            debug!("Ratings file {} is empty", self.path.display());
            return Ok(Entries::new());
        }

        match self.parse(&content) {
            Ok(entries) => {
                info!(
                    "Loaded {} entries from {}",
                    entries.len(),
                    self.path.display()
                );
                Ok(entries)
            }
            Err(e) => {
                self.recover(e);
                Ok(Entries::new())
            }
        }
    }

    /// Replace the document with the given entries.
    pub fn save(&self, entries: &Entries) -> Result<()> {
        let document = render(entries)?;
        let dir = self.parent_dir();

        fs::create_dir_all(&dir).map_err(|e| RatingError::persistence(&dir, e))?;

        let mut tmp =
            NamedTempFile::new_in(&dir).map_err(|e| RatingError::persistence(&dir, e))?;
        tmp.write_all(document.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| RatingError::persistence(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| RatingError::persistence(&self.path, e.error))?;

        debug!("Saved {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    fn parse(&self, content: &str) -> Result<Entries> {
        let mut entries: Entries =
            serde_json::from_str(content).map_err(|e| RatingError::MalformedStore {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        // Averages on disk are derived; rebuild them from the ratings.
        for (name, entry) in entries.iter_mut() {
            entry.name = name.clone();
            if entry.ratings.is_empty() {
                entry.clamp_averages();
            } else {
                recompute(entry);
            }
        }

        Ok(entries)
    }

    fn bootstrap(&self) -> Result<()> {
        let dir = self.parent_dir();
        fs::create_dir_all(&dir).map_err(|e| RatingError::persistence(&dir, e))?;

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RatingError::persistence(&self.path, e))?;

        info!("Created empty ratings file at {}", self.path.display());
        Ok(())
    }

    /// Log a malformed document and move it out of the way.
    fn recover(&self, error: RatingError) {
        warn!("{}; starting with an empty store", error);

        let target = self.quarantine_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => warn!("Quarantined malformed ratings file to {}", target.display()),
            Err(e) => warn!("Could not quarantine {}: {}", self.path.display(), e),
        }
    }

    /// `<file>.corrupt-<UTC stamp>`, with a counter when that name is taken.
    fn quarantine_path(&self) -> PathBuf {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "ratings.json".to_string());
        let dir = self.parent_dir();
        let base = format!("{}.corrupt-{}", file_name, stamp);

        let mut target = dir.join(&base);
        let mut n = 1;
        while target.exists() {
            target = dir.join(format!("{}-{}", base, n));
            n += 1;
        }
        target
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

/// Serialize entries as the on-disk document: sorted keys, 4-space indent.
pub fn render(entries: &Entries) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    entries.serialize(&mut ser)?;

    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
