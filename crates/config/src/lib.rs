//! Configuration loading and path defaults.
//!
//! Config files: `skilldeck.toml`, `skilldeck.yaml`, or `skilldeck.json`,
//! searched in `./` then `~/.config/skilldeck/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values and `~` expansion
//! in path settings.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        apply_env_overrides, config_dir, discover_and_load, find_config_file, load_config,
        resolve_paths, save_config,
    },
    schema::{AgentOverride, InstallConfig, InstallMode, PathsConfig, ResolvedPaths, SkilldeckConfig},
};
