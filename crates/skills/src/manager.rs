//! High-level operations combining the lock store and the installer.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    install::{InstallMode, InstallStatus, Installer, MaterializeResult, sanitize_name},
    lock::LockStore,
    parse::MANIFEST_FILE,
    source::{SkillSource, UpdateSource},
    types::{RemoteMeta, ResolvedSkill, SkillRecord},
    update::{Staleness, is_stale},
};

/// Result of [`SkillManager::install`].
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// The lock record, when at least one target received the skill.
    pub record: Option<SkillRecord>,
    pub result: MaterializeResult,
}

impl InstallReport {
    pub fn status(&self) -> InstallStatus {
        self.result.status()
    }
}

pub struct SkillManager {
    store: LockStore,
    installer: Installer,
}

impl SkillManager {
    pub fn new(store: LockStore, installer: Installer) -> Self {
        Self { store, installer }
    }

    /// Build a manager from config-resolved paths.
    pub fn from_paths(lock_file: PathBuf, skills_root: PathBuf) -> Self {
        Self::new(LockStore::new(lock_file), Installer::new(skills_root))
    }

    /// Materialize `skill` into `targets` and record it under `name`.
    ///
    /// The lock is only updated when some target ended up with the skill, so
    /// a fully failed install leaves the previous record (if any) in place.
    pub async fn install(
        &self,
        name: &str,
        skill: &ResolvedSkill,
        targets: &[PathBuf],
        mode: InstallMode,
    ) -> Result<InstallReport> {
        let record = SkillRecord::from_resolved(name, skill)?;
        self.ensure_own_directory(name)?;
        let result = self
            .installer
            .materialize(name, &skill.files, targets, mode)
            .await?;

        for failed in result.failures() {
            warn!(skill = %name, target = %failed.target_dir.display(), "target not installed");
        }
        if result.status() == InstallStatus::Failed {
            return Ok(InstallReport {
                record: None,
                result,
            });
        }

        let record = self.store.transact(|state| state.upsert(record).clone())?;
        info!(
            skill = %name,
            source = %record.source,
            hash = %record.content_hash,
            status = ?result.status(),
            "installed skill"
        );
        Ok(InstallReport {
            record: Some(record),
            result,
        })
    }

    /// Resolve `location` through `source`, then [`Self::install`] it.
    ///
    /// The lock name is `name` when given, otherwise the manifest's declared
    /// name, otherwise the source directory's name.
    pub async fn add(
        &self,
        source: &dyn SkillSource,
        location: &str,
        name: Option<&str>,
        targets: &[PathBuf],
        mode: InstallMode,
    ) -> Result<InstallReport> {
        let skill = source.resolve(location).await?;
        let name = match name {
            Some(name) => name.to_string(),
            None => skill_name(&skill)?,
        };
        self.install(&name, &skill, targets, mode).await
    }

    /// Compare the recorded skill against already fetched remote hashes.
    pub fn check_update(&self, name: &str, remote: &RemoteMeta) -> Result<Staleness> {
        let record = self.record(name)?;
        Ok(is_stale(&record, remote))
    }

    /// Fetch remote hashes through `source` and compare.
    pub async fn check_with(&self, name: &str, source: &dyn UpdateSource) -> Result<Staleness> {
        let record = self.record(name)?;
        let remote = source.fetch_meta(&record).await?;
        Ok(is_stale(&record, &remote))
    }

    /// Every recorded skill, sorted by name.
    pub fn list(&self) -> Vec<SkillRecord> {
        self.store.load().records().cloned().collect()
    }

    /// Look up one record.
    pub fn record(&self, name: &str) -> Result<SkillRecord> {
        self.store
            .load()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::not_found(name))
    }

    /// Forget a skill in the lock file. Files on disk are left alone.
    /// Removing an unknown name is a no-op.
    pub fn remove(&self, name: &str) -> Result<Option<SkillRecord>> {
        let removed = self.store.transact(|state| state.remove(name))?;
        if removed.is_some() {
            info!(skill = %name, "removed skill from lock file");
        }
        Ok(removed)
    }

    /// Delete a skill's files from `targets` and canonical storage, then
    /// forget it.
    pub async fn uninstall(&self, name: &str, targets: &[PathBuf]) -> Result<Option<SkillRecord>> {
        self.ensure_own_directory(name)?;
        self.installer.dematerialize(name, targets).await?;
        self.remove(name)
    }

    /// Fail with [`Error::NameConflict`] when another recorded skill
    /// sanitizes to the same directory as `name`.
    fn ensure_own_directory(&self, name: &str) -> Result<()> {
        let dir = sanitize_name(name)?;
        let state = self.store.load();
        let clash = state
            .records()
            .find(|r| r.name != name && sanitize_name(&r.name).is_ok_and(|d| d == dir));
        match clash {
            Some(existing) => Err(Error::NameConflict {
                name: name.to_string(),
                existing: existing.name.clone(),
                dir,
            }),
            None => Ok(()),
        }
    }
}

/// Default lock name for a resolved skill.
pub fn skill_name(skill: &ResolvedSkill) -> Result<String> {
    if let Some(name) = skill.declared_name() {
        return Ok(name);
    }
    let path = Path::new(&skill.skill_path);
    let dir = if path.file_name().is_some_and(|n| n == MANIFEST_FILE) {
        path.parent()
    } else {
        Some(path)
    };
    dir.and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidName {
            name: skill.skill_path.clone(),
        })
}
