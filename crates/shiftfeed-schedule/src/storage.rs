//! JSON cache of the session token and known shifts, plus feed output.

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::ScheduleError;
use crate::types::Shift;

/// Persisted cache contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub shifts: Vec<Shift>,
}

impl Storage {
    /// Load the cache at `path`.
    ///
    /// A missing or unreadable cache is not an error: the run starts over
    /// with no token and no shifts.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match Self::try_load(path) {
            Ok(storage) => {
                tracing::debug!(
                    shifts = storage.shifts.len(),
                    has_token = storage.token.is_some(),
                    "Loaded cache from {:?}",
                    path
                );
                storage
            }
            Err(e) => {
                tracing::warn!("Failed to read or parse data storage {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, ScheduleError> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| ScheduleError::Storage(e.to_string()))
    }

    /// Write the cache to `path`, replacing any previous file atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ScheduleError> {
        let json =
            serde_json::to_string(self).map_err(|e| ScheduleError::Storage(e.to_string()))?;
        write_atomic(path.as_ref(), json.as_bytes())?;

        tracing::debug!(shifts = self.shifts.len(), "Stored cache at {:?}", path.as_ref());
        Ok(())
    }
}

/// Write the rendered feed to `path`.
pub fn write_feed<P: AsRef<Path>>(path: P, ics: &str) -> Result<(), ScheduleError> {
    write_atomic(path.as_ref(), ics.as_bytes())
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ScheduleError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| ScheduleError::Io(e.error))?;
    Ok(())
}

/// Exclusive lock held for the length of a run. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    _file: File,
    path: PathBuf,
}

impl RunLock {
    /// Lock `<cache_path>.lock`, failing immediately if another run holds it.
    pub fn acquire<P: AsRef<Path>>(cache_path: P) -> Result<Self, ScheduleError> {
        let path = lock_path(cache_path.as_ref());
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|_| ScheduleError::Locked(path.display().to_string()))?;

        tracing::debug!("Acquired run lock {:?}", path);
        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_path(cache_path: &Path) -> PathBuf {
    let mut name = cache_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
