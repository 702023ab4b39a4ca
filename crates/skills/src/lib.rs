//! Installation state for agent skills.
//!
//! A skill is a directory with a `SKILL.md` manifest. This crate places skill
//! files into coding agents' skill directories (symlinked to one canonical
//! copy, or copied per agent), records each install in a versioned JSON lock
//! file, and decides whether an installed skill is out of date by comparing
//! recorded hashes with fresh ones.

pub mod agents;
pub mod error;
pub mod hash;
pub mod install;
pub mod lock;
pub mod manager;
pub mod migration;
pub mod parse;
pub mod source;
pub mod types;
pub mod update;

#[cfg(test)]
pub(crate) mod test_support;

pub use {
    error::{Error, Result},
    install::{InstallMode, InstallStatus, Installer, MaterializeResult, TargetStatus},
    lock::LockStore,
    manager::{InstallReport, SkillManager},
    types::{LockState, RemoteMeta, ResolvedSkill, SkillFile, SkillRecord, SourceType},
    update::{HashBasis, Staleness, is_stale},
};
