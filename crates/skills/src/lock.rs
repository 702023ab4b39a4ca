use std::{
    fs::{self, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use {
    fd_lock::RwLock,
    skilldeck_common::fs::write_atomic,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    migration,
    types::{CURRENT_LOCK_VERSION, LockState},
};

/// Persistent lock file storage with atomic writes.
///
/// Every call reads the file fresh; nothing is cached between invocations.
pub struct LockStore {
    path: PathBuf,
}

impl LockStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load and migrate the lock file.
    ///
    /// A missing file yields an empty state. A file that cannot be read,
    /// parsed, or migrated yields [`Error::CorruptState`], unless it declares
    /// a newer schema, which yields [`Error::NewerSchema`].
    pub fn try_load(&self) -> Result<LockState> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LockState::default()),
            Err(e) => return Err(Error::corrupt(&self.path, e)),
        };
        let doc: serde_json::Value =
            serde_json::from_str(&data).map_err(|e| Error::corrupt(&self.path, e))?;
        let newer = doc
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .is_some_and(|v| v > u64::from(CURRENT_LOCK_VERSION));
        migration::migrate(doc).map_err(|e| {
            if newer {
                Error::NewerSchema {
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
            } else {
                Error::corrupt(&self.path, e)
            }
        })
    }

    /// Load the lock file, falling back to an empty state when it is corrupt.
    ///
    /// Installed skills stay on disk either way; only tracking metadata is lost.
    pub fn load(&self) -> LockState {
        match self.try_load() {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable lock file");
                LockState::default()
            },
        }
    }

    /// Save the lock file atomically via temp file + rename.
    pub fn save(&self, state: &LockState) -> Result<()> {
        let mut data = serde_json::to_string_pretty(&state.to_value()?)?;
        data.push('\n');
        write_atomic(&self.path, data.as_bytes()).map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), skills = state.len(), "saved lock file");
        Ok(())
    }

    /// Run a load → mutate → save cycle under an exclusive advisory lock.
    ///
    /// The lock is held on a sibling `<lock file>.lock`, so concurrent
    /// processes serialize instead of losing each other's updates. The file
    /// is only rewritten when `f` changed the state.
    ///
    /// A corrupt file is copied to `<lock file>.corrupt` before being
    /// replaced. A file that cannot be read, or that uses a newer schema this
    /// build cannot represent, is never overwritten; the error is returned.
    pub fn transact<T>(&self, f: impl FnOnce(&mut LockState) -> T) -> Result<T> {
        let guard_path = self.guard_path();
        if let Some(parent) = guard_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&guard_path)
            .map_err(|source| Error::Lock {
                path: guard_path.clone(),
                source,
            })?;
        let mut lock = RwLock::new(file);
        let _guard = lock.write().map_err(|source| Error::Lock {
            path: guard_path.clone(),
            source,
        })?;

        let mut state = match self.try_load() {
            Ok(state) => state,
            Err(e @ Error::CorruptState { .. }) if self.path.is_file() && self.readable() => {
                let backup = self.sibling(".corrupt");
                fs::copy(&self.path, &backup).map_err(|source| Error::Write {
                    path: backup.clone(),
                    source,
                })?;
                warn!(error = %e, backup = %backup.display(), "replacing corrupt lock file");
                LockState::default()
            },
            Err(e) => return Err(e),
        };
        let before = state.clone();
        let out = f(&mut state);
        if state != before {
            self.save(&state)?;
        }
        Ok(out)
    }

    fn guard_path(&self) -> PathBuf {
        self.sibling(".lock")
    }

    /// `<lock file><suffix>` in the same directory.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| ".skill-lock.json".into());
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn readable(&self) -> bool {
        fs::File::open(&self.path).is_ok()
    }
}
