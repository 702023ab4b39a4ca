//! Decide whether an installed skill is out of date.

use std::fmt;

use serde::Serialize;

use crate::{
    hash::present,
    types::{RemoteMeta, SkillRecord},
};

/// Which fingerprint a staleness verdict was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HashBasis {
    /// Whole-folder tree hash from the host.
    Folder,
    /// SHA-256 of `SKILL.md`.
    Content,
}

impl fmt::Display for HashBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Folder => "folder hash",
            Self::Content => "content hash",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "basis")]
pub enum Staleness {
    Current(HashBasis),
    Stale(HashBasis),
    /// Neither side has a comparable hash.
    Indeterminate,
}

impl Staleness {
    /// `None` when indeterminate. Callers must decide what "unknown" means.
    pub fn is_stale(self) -> Option<bool> {
        match self {
            Self::Current(_) => Some(false),
            Self::Stale(_) => Some(true),
            Self::Indeterminate => None,
        }
    }

    pub fn reason(self) -> Option<HashBasis> {
        match self {
            Self::Current(basis) | Self::Stale(basis) => Some(basis),
            Self::Indeterminate => None,
        }
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current(basis) => write!(f, "up to date ({basis} matches)"),
            Self::Stale(basis) => write!(f, "update available ({basis} changed)"),
            Self::Indeterminate => f.write_str("unknown (no comparable hash)"),
        }
    }
}

/// Compare a lock record against freshly fetched hashes.
///
/// The folder hash wins when both sides have one, since it also covers files
/// besides `SKILL.md`. Otherwise the content hash decides. Empty strings count
/// as absent.
pub fn is_stale(record: &SkillRecord, remote: &RemoteMeta) -> Staleness {
    let compare = |local: Option<&str>, remote: Option<&str>, basis| {
        let (local, remote) = (present(local)?, present(remote)?);
        Some(if local == remote {
            Staleness::Current(basis)
        } else {
            Staleness::Stale(basis)
        })
    };

    compare(
        record.skill_folder_hash.as_deref(),
        remote.skill_folder_hash.as_deref(),
        HashBasis::Folder,
    )
    .or_else(|| {
        compare(
            Some(record.content_hash.as_str()),
            remote.content_hash.as_deref(),
            HashBasis::Content,
        )
    })
    .unwrap_or(Staleness::Indeterminate)
}
