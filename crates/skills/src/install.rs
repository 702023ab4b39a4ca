//! Materialize skill files into agent directories.
//!
//! All validation (name sanitizing, path containment) runs before the first
//! filesystem write. After that each target is handled independently: one
//! unwritable agent directory does not stop the others.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use {
    serde::Serialize,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    types::SkillFile,
};

pub use skilldeck_config::InstallMode;

/// Longest directory name most filesystems accept.
const MAX_NAME_LEN: usize = 255;

/// What happened at one target directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TargetStatus {
    /// A symlink to canonical storage was created.
    Linked,
    /// The target directory is canonical storage itself; nothing to link.
    Canonical,
    /// An independent copy was written.
    Copied,
    /// Symlinking failed, so an independent copy was written instead.
    CopiedFallback { reason: String },
    /// Nothing usable was left at this target.
    Failed { error: String },
}

impl TargetStatus {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub target_dir: PathBuf,
    /// `<target_dir>/<skill dir>`.
    pub installed_path: PathBuf,
    pub status: TargetStatus,
}

/// Overall outcome across targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    Success,
    /// Some targets succeeded, some failed.
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializeResult {
    /// Sanitized directory name used at every target.
    pub dir_name: String,
    pub mode: InstallMode,
    /// Shared storage directory (symlink mode only).
    pub canonical_dir: Option<PathBuf>,
    pub targets: Vec<TargetReport>,
}

impl MaterializeResult {
    pub fn status(&self) -> InstallStatus {
        let ok = self.targets.iter().filter(|t| t.status.is_success()).count();
        match (ok, self.targets.len()) {
            (_, 0) => InstallStatus::Success,
            (ok, total) if ok == total => InstallStatus::Success,
            (0, _) => InstallStatus::Failed,
            _ => InstallStatus::Partial,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| !t.status.is_success())
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets.iter().filter(|t| t.status.is_success())
    }
}

/// Derive a directory name from a declared skill name.
///
/// Keeps ASCII letters, digits, `-`, `_` and `.`, drops everything else, and
/// strips leading dots so the result is never hidden, `.` or `..`.
pub fn sanitize_name(name: &str) -> Result<String> {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let mut cleaned = kept.trim_start_matches('.').to_string();
    cleaned.truncate(MAX_NAME_LEN);
    if cleaned.is_empty() {
        return Err(Error::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(cleaned)
}

/// Check that a skill-relative file path stays inside the skill directory.
fn validate_relative(path: &Path) -> Result<()> {
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::path_traversal(path));
            },
        }
    }
    if depth == 0 {
        return Err(Error::path_traversal(path));
    }
    Ok(())
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            },
            other => out.push(other),
        }
    }
    Some(out)
}

/// `child` is strictly below `parent` after lexical normalization.
fn is_within(child: &Path, parent: &Path) -> bool {
    match (normalize_lexically(child), normalize_lexically(parent)) {
        (Some(child), Some(parent)) => child != parent && child.starts_with(&parent),
        _ => false,
    }
}

/// Places skills on disk.
pub struct Installer {
    skills_root: PathBuf,
}

impl Installer {
    /// `skills_root` holds the canonical copy of every symlink-mode install.
    pub fn new(skills_root: PathBuf) -> Self {
        Self { skills_root }
    }

    /// Write `files` for skill `name` into every directory in `targets`.
    ///
    /// Fails before any write with [`Error::InvalidName`] or
    /// [`Error::PathTraversal`] when an input is unsafe. In symlink mode a
    /// failure to write canonical storage is returned as an error; per-target
    /// failures are reported in the result instead.
    pub async fn materialize(
        &self,
        name: &str,
        files: &[SkillFile],
        targets: &[PathBuf],
        mode: InstallMode,
    ) -> Result<MaterializeResult> {
        let dir_name = sanitize_name(name)?;
        if files.is_empty() {
            return Err(Error::EmptySkill {
                name: name.to_string(),
            });
        }
        for file in files {
            validate_relative(&file.path)?;
        }

        let canonical = absolute(&self.skills_root)?.join(&dir_name);
        let mut plan: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(targets.len());
        for target in targets {
            let target = absolute(target)?;
            let dest = target.join(&dir_name);
            if plan.iter().any(|(t, _)| *t == target) {
                continue;
            }
            for file in files {
                if !is_within(&dest.join(&file.path), &target) {
                    return Err(Error::path_traversal(dest.join(&file.path)));
                }
            }
            plan.push((target, dest));
        }
        if mode == InstallMode::Symlink {
            for file in files {
                if !is_within(&canonical.join(&file.path), &canonical) {
                    return Err(Error::path_traversal(canonical.join(&file.path)));
                }
            }
        }

        let canonical_dir = match mode {
            InstallMode::Symlink => {
                write_tree(&canonical, files).await?;
                debug!(path = %canonical.display(), "wrote canonical skill copy");
                Some(canonical.clone())
            },
            InstallMode::Copy => None,
        };

        let mut reports = Vec::with_capacity(plan.len());
        for (target, dest) in plan {
            let status = match mode {
                InstallMode::Symlink => link_target(&target, &dest, &canonical, files).await,
                InstallMode::Copy => match write_tree(&dest, files).await {
                    Ok(()) => TargetStatus::Copied,
                    Err(e) => TargetStatus::Failed {
                        error: e.to_string(),
                    },
                },
            };
            if let TargetStatus::Failed { error } = &status {
                warn!(target = %target.display(), %error, "failed to install skill into target");
            }
            reports.push(TargetReport {
                target_dir: target,
                installed_path: dest,
                status,
            });
        }

        let result = MaterializeResult {
            dir_name,
            mode,
            canonical_dir,
            targets: reports,
        };
        info!(
            skill = %result.dir_name,
            %mode,
            status = ?result.status(),
            targets = result.targets.len(),
            "materialized skill"
        );
        Ok(result)
    }

    /// Remove a skill from `targets` and from canonical storage.
    ///
    /// Returns the paths that existed and were removed. Missing entries are
    /// not errors.
    pub async fn dematerialize(&self, name: &str, targets: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let dir_name = sanitize_name(name)?;
        let mut removed = Vec::new();
        for target in targets {
            let path = target.join(&dir_name);
            if remove_entry(&path).await? {
                removed.push(path);
            }
        }
        let canonical = absolute(&self.skills_root)?.join(&dir_name);
        if remove_entry(&canonical).await? {
            removed.push(canonical);
        }
        info!(skill = %dir_name, removed = removed.len(), "removed skill files");
        Ok(removed)
    }
}

async fn link_target(
    target: &Path,
    link: &Path,
    canonical: &Path,
    files: &[SkillFile],
) -> TargetStatus {
    if same_location(link, canonical).await {
        return TargetStatus::Canonical;
    }

    let link_err = match replace_with_symlink(target, link, canonical).await {
        Ok(()) => return TargetStatus::Linked,
        Err(e) => e,
    };
    debug!(link = %link.display(), error = %link_err, "symlink failed, copying instead");

    match write_tree(link, files).await {
        Ok(()) => TargetStatus::CopiedFallback {
            reason: link_err.to_string(),
        },
        Err(copy_err) => TargetStatus::Failed {
            error: format!("symlink failed ({link_err}); copy failed ({copy_err})"),
        },
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

async fn same_location(a: &Path, b: &Path) -> bool {
    if normalize_lexically(a) == normalize_lexically(b) {
        return true;
    }
    // Compare real parents to catch symlinked agent directories.
    let (Some(pa), Some(pb)) = (a.parent(), b.parent()) else {
        return false;
    };
    match (
        tokio::fs::canonicalize(pa).await,
        tokio::fs::canonicalize(pb).await,
    ) {
        (Ok(pa), Ok(pb)) => pa == pb && a.file_name() == b.file_name(),
        _ => false,
    }
}

/// Remove whatever sits at `path` without following a symlink.
/// Returns whether anything was there.
async fn remove_entry(path: &Path) -> std::io::Result<bool> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(true)
}

/// Write `files` to `dest`, replacing any previous contents.
///
/// Files are staged in a hidden sibling directory and renamed into place, so
/// `dest` never holds a mix of old and new files. The staging directory is
/// removed on failure.
async fn write_tree(dest: &Path, files: &[SkillFile]) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::path_traversal(dest))?;
    let file_name = dest
        .file_name()
        .ok_or_else(|| Error::path_traversal(dest))?
        .to_string_lossy();
    let staging = parent.join(format!(".{file_name}.staging"));

    tokio::fs::create_dir_all(parent).await?;
    remove_entry(&staging).await?;

    let staged = async {
        tokio::fs::create_dir_all(&staging).await?;
        for file in files {
            let path = staging.join(&file.path);
            if let Some(dir) = path.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
            tokio::fs::write(&path, &file.contents).await?;
        }
        remove_entry(dest).await?;
        tokio::fs::rename(&staging, dest).await
    }
    .await;

    if let Err(e) = staged {
        let _ = remove_entry(&staging).await;
        return Err(e.into());
    }
    Ok(())
}

/// Point `link` at `canonical`, replacing any prior link, file, or directory.
async fn replace_with_symlink(target: &Path, link: &Path, canonical: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(target).await?;
    remove_entry(link).await?;
    let linked = symlink_dir(canonical, link).await;
    if linked.is_err() {
        let _ = remove_entry(link).await;
    }
    linked
}

#[cfg(unix)]
async fn symlink_dir(original: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(original, link).await
}

#[cfg(windows)]
async fn symlink_dir(original: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_dir(original, link).await
}
