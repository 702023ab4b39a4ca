//! Where skills come from.
//!
//! Fetching from remote hosts lives outside this crate; it plugs in through
//! [`SkillSource`] and [`UpdateSource`]. [`LocalDirSource`] covers skills that
//! already sit in a directory on disk.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    tracing::{debug, warn},
    walkdir::WalkDir,
};

use crate::{
    error::{Context, Error, Result},
    hash::hash_file,
    parse::MANIFEST_FILE,
    types::{RemoteMeta, ResolvedSkill, SkillFile, SkillRecord, SourceType},
};

/// Turns a user-supplied location into installable skill files.
#[async_trait]
pub trait SkillSource: Send + Sync {
    async fn resolve(&self, location: &str) -> Result<ResolvedSkill>;
}

/// Fetches current hashes for an installed skill.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_meta(&self, record: &SkillRecord) -> Result<RemoteMeta>;
}

/// Skills read from a local directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDirSource;

impl LocalDirSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SkillSource for LocalDirSource {
    async fn resolve(&self, location: &str) -> Result<ResolvedSkill> {
        let root = std::path::absolute(location)?;
        let walk_root = root.clone();
        let files = tokio::task::spawn_blocking(move || read_tree(&walk_root)).await??;

        if !files.iter().any(|f| f.path == Path::new(MANIFEST_FILE)) {
            return Err(Error::MissingManifest {
                origin: root.display().to_string(),
            });
        }
        debug!(path = %root.display(), files = files.len(), "read local skill");

        Ok(ResolvedSkill {
            source: root.display().to_string(),
            source_type: SourceType::Local,
            source_url: None,
            skill_path: root.join(MANIFEST_FILE).display().to_string(),
            files,
            folder_hash: None,
            content_hash: None,
        })
    }
}

#[async_trait]
impl UpdateSource for LocalDirSource {
    /// Re-hash the `SKILL.md` the record points at. Local directories have no
    /// folder hash.
    async fn fetch_meta(&self, record: &SkillRecord) -> Result<RemoteMeta> {
        let manifest = manifest_path(record);
        match hash_file(&manifest).await {
            Ok(hash) => Ok(RemoteMeta {
                content_hash: Some(hash),
                skill_folder_hash: None,
            }),
            Err(e) => {
                warn!(path = %manifest.display(), error = %e, "local skill source is unreadable");
                Ok(RemoteMeta::default())
            },
        }
    }
}

/// `skill_path` may name the manifest itself or the directory holding it.
fn manifest_path(record: &SkillRecord) -> PathBuf {
    let path = PathBuf::from(&record.skill_path);
    if path.file_name().is_some_and(|n| n == MANIFEST_FILE) {
        path
    } else {
        path.join(MANIFEST_FILE)
    }
}

/// Collect regular files under `root` as relative paths.
///
/// Symlinks are not followed and `.git` is skipped.
fn read_tree(root: &Path) -> Result<Vec<SkillFile>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::path_traversal(entry.path()))?
            .to_path_buf();
        let contents = std::fs::read(entry.path())
            .with_context(|| format!("reading {}", entry.path().display()))?;
        files.push(SkillFile::new(relative, contents));
    }
    Ok(files)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{hash::content_hash, test_support::record},
        std::fs,
    };

    fn write_skill(dir: &Path) {
        fs::create_dir_all(dir.join("scripts")).unwrap();
        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::write(dir.join("SKILL.md"), "---\nname: local-skill\n---\nbody\n").unwrap();
        fs::write(dir.join("scripts/run.sh"), "echo hi\n").unwrap();
        fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    }

    #[tokio::test]
    async fn resolves_directory_without_git_metadata() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path());

        let skill = LocalDirSource::new()
            .resolve(tmp.path().to_str().unwrap())
            .await
            .unwrap();

        let paths: Vec<_> = skill.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![
            PathBuf::from("SKILL.md"),
            PathBuf::from("scripts/run.sh"),
        ]);
        assert_eq!(skill.source_type, SourceType::Local);
        assert_eq!(skill.declared_name().as_deref(), Some("local-skill"));
        assert_eq!(
            skill.content_hash().unwrap(),
            content_hash(b"---\nname: local-skill\n---\nbody\n")
        );
    }

    #[tokio::test]
    async fn directory_without_manifest_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("README.md"), "hi").unwrap();
        let err = LocalDirSource::new()
            .resolve(tmp.path().to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingManifest { .. }));
    }

    #[tokio::test]
    async fn fetch_meta_rehashes_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        write_skill(tmp.path());
        let mut rec = record("local-skill", "stale");
        rec.skill_path = tmp.path().join("SKILL.md").display().to_string();

        let meta = LocalDirSource::new().fetch_meta(&rec).await.unwrap();
        assert_eq!(
            meta.content_hash.as_deref(),
            Some(content_hash(b"---\nname: local-skill\n---\nbody\n").as_str())
        );
        assert!(meta.skill_folder_hash.is_none());

        rec.skill_path = tmp.path().join("gone").display().to_string();
        assert_eq!(
            LocalDirSource::new().fetch_meta(&rec).await.unwrap(),
            RemoteMeta::default()
        );
    }
}
