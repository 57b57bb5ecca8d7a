//! JSON file backing for recovery entries.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use super::entry::{RecoveryEntry, RecoveryUpdate};
use super::error::RecoveryError;

const APP_DIR: &str = "dlqueue";

/// File name of the recovery list inside the data directory.
pub const RECOVERY_FILE_NAME: &str = ".dlqueue_unfinished.json";

/// Resolves the recovery file path from the environment.
///
/// # Errors
///
/// Returns [`RecoveryError::DataDirUnavailable`] when none of
/// `XDG_DATA_HOME`, `HOME` or `APPDATA` is set.
pub fn default_recovery_path() -> Result<PathBuf, RecoveryError> {
    let var = |name: &str| {
        std::env::var_os(name)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    };
    let dir = resolve_data_dir(var("XDG_DATA_HOME"), var("HOME"), var("APPDATA"))?;
    Ok(dir.join(RECOVERY_FILE_NAME))
}

fn resolve_data_dir(
    xdg_data_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, RecoveryError> {
    if let Some(xdg) = xdg_data_home {
        return Ok(xdg.join(APP_DIR));
    }
    if let Some(home) = home {
        return Ok(home.join(".local").join("share").join(APP_DIR));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR));
    }

    Err(RecoveryError::DataDirUnavailable)
}

/// Durable list of unfinished downloads.
///
/// Every write rewrites the whole list through a temporary file in the same
/// directory that is then renamed over the target, so a reader sees either
/// the old list or the new one. There is no locking between processes.
#[derive(Debug, Clone)]
pub struct RecoveryStore {
    path: PathBuf,
}

impl RecoveryStore {
    /// Store backed by `path`. Nothing is touched until the first call.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`default_recovery_path`].
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::DataDirUnavailable`] if no data directory is known.
    pub fn open_default() -> Result<Self, RecoveryError> {
        default_recovery_path().map(Self::new)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every entry, in file order.
    ///
    /// A missing, empty or whitespace-only file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::Io`] if the file cannot be read and
    /// [`RecoveryError::Corrupt`] if it is not a valid entry list.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Vec<RecoveryEntry>, RecoveryError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no recovery file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(RecoveryError::io(&self.path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|source| RecoveryError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Entries ordered most recent first.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn list(&self) -> Result<Vec<RecoveryEntry>, RecoveryError> {
        let mut entries = self.load()?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Looks an entry up by key.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub fn find_by_key(&self, key: &str) -> Result<Option<RecoveryEntry>, RecoveryError> {
        Ok(self.load()?.into_iter().find(|entry| entry.key() == key))
    }

    /// Inserts `entry`, replacing any entry with the same key in place.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidEntry`] before touching the file if
    /// the key or title is blank, or any load/persist error.
    #[instrument(skip(self, entry), fields(key = %entry.url))]
    pub fn upsert(&self, entry: RecoveryEntry) -> Result<(), RecoveryError> {
        entry.validate()?;

        let mut entries = self.load()?;
        match entries.iter_mut().find(|existing| existing.key() == entry.key()) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
        self.write_all(&entries)
    }

    /// Deletes the entry with `key`. Absent keys are a no-op.
    ///
    /// # Errors
    ///
    /// Any load/persist error.
    #[instrument(skip(self))]
    pub fn remove(&self, key: &str) -> Result<(), RecoveryError> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|entry| entry.key() != key);
        if entries.len() == before {
            debug!("no entry to remove");
            return Ok(());
        }
        self.write_all(&entries)
    }

    /// Applies an update produced by the queue.
    ///
    /// # Errors
    ///
    /// Same as [`upsert`](Self::upsert) or [`remove`](Self::remove).
    pub fn apply(&self, update: RecoveryUpdate) -> Result<(), RecoveryError> {
        match update {
            RecoveryUpdate::Upsert(entry) => self.upsert(entry),
            RecoveryUpdate::Remove(key) => self.remove(&key),
        }
    }

    /// Like [`apply`](Self::apply), but failures are only logged.
    ///
    /// Losing one write degrades crash recovery, never the running queue.
    pub fn apply_logged(&self, update: RecoveryUpdate) {
        if let Err(e) = self.apply(update) {
            warn!(path = %self.path.display(), error = %e, "failed to update recovery file");
        }
    }

    fn write_all(&self, entries: &[RecoveryEntry]) -> Result<(), RecoveryError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|e| RecoveryError::io(&parent, e))?;

        let tmp = NamedTempFile::new_in(&parent).map_err(|e| RecoveryError::io(&parent, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, entries)?;
            writer
                .flush()
                .map_err(|e| RecoveryError::io(tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| RecoveryError::io(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| RecoveryError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        info!(path = %self.path.display(), entries = entries.len(), "recovery file written");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data_dir_prefers_xdg() {
        let dir = resolve_data_dir(
            Some(PathBuf::from("/xdg")),
            Some(PathBuf::from("/home/u")),
            None,
        )
        .unwrap();
        assert_eq!(dir, PathBuf::from("/xdg/dlqueue"));
    }

    #[test]
    fn test_resolve_data_dir_falls_back_to_home() {
        let dir = resolve_data_dir(None, Some(PathBuf::from("/home/u")), None).unwrap();
        assert_eq!(dir, PathBuf::from("/home/u/.local/share/dlqueue"));
    }

    #[test]
    fn test_resolve_data_dir_uses_appdata() {
        let dir = resolve_data_dir(None, None, Some(PathBuf::from("C:/AppData"))).unwrap();
        assert_eq!(dir, PathBuf::from("C:/AppData").join("dlqueue"));
    }

    #[test]
    fn test_resolve_data_dir_unavailable() {
        assert!(matches!(
            resolve_data_dir(None, None, None),
            Err(RecoveryError::DataDirUnavailable)
        ));
    }

    #[test]
    fn test_whitespace_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RECOVERY_FILE_NAME);
        fs::write(&path, "  \n").unwrap();
        assert!(RecoveryStore::new(&path).load().unwrap().is_empty());
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(RECOVERY_FILE_NAME);
        let store = RecoveryStore::new(&path);
        store
            .upsert(RecoveryEntry::single("https://youtu.be/a", "best", "Clip"))
            .unwrap();
        assert!(path.exists());
    }
}
