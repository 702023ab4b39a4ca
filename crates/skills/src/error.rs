use std::path::PathBuf;

use skilldeck_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Lock file exists but cannot be read, parsed, or migrated.
    #[error("lock file {} is corrupt: {reason}", path.display())]
    CorruptState { path: PathBuf, reason: String },

    /// Lock file was written by a newer build and this one cannot rewrite it.
    #[error("lock file {} uses a newer schema: {reason}", path.display())]
    NewerSchema { path: PathBuf, reason: String },

    #[error("unsupported lock schema: {reason}")]
    InvalidSchema { reason: String },

    /// A file path (or the name-derived directory) would land outside its target.
    #[error("path escapes its target directory: {}", path.display())]
    PathTraversal { path: PathBuf },

    #[error("invalid skill name '{name}': no characters left after sanitizing")]
    InvalidName { name: String },

    #[error("skill '{name}' has no files to install")]
    EmptySkill { name: String },

    #[error("skill from '{origin}' has no SKILL.md and no content hash")]
    MissingManifest { origin: String },

    /// Two lock names that sanitize to the same directory.
    #[error("skill '{name}' would share directory '{dir}' with installed skill '{existing}'")]
    NameConflict {
        name: String,
        existing: String,
        dir: String,
    },

    #[error("skill '{name}' is not installed")]
    SkillNotFound { name: String },

    #[error("unknown agent '{id}'")]
    UnknownAgent { id: String },

    #[error("failed to lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Walkdir(#[from] walkdir::Error),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptState {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn invalid_schema(reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::SkillNotFound { name: name.into() }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

skilldeck_common::impl_context!();
