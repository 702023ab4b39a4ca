//! Config schema types (paths, install defaults, per-agent overrides).

use std::{collections::BTreeMap, fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

/// How a skill is placed into agent directories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// One canonical copy, linked into every agent directory.
    #[default]
    Symlink,
    /// An independent copy per agent directory.
    Copy,
}

impl fmt::Display for InstallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symlink => f.write_str("symlink"),
            Self::Copy => f.write_str("copy"),
        }
    }
}

impl FromStr for InstallMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symlink" | "link" => Ok(Self::Symlink),
            "copy" => Ok(Self::Copy),
            other => Err(format!("unknown install mode '{other}' (expected symlink or copy)")),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkilldeckConfig {
    pub paths: PathsConfig,
    pub install: InstallConfig,
    /// Per-agent directory overrides and custom agents, keyed by agent id.
    pub agents: BTreeMap<String, AgentOverride>,
}

/// Where state lives on disk. Unset values fall back to `~/.agents/...`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Lock file path (default `~/.agents/.skill-lock.json`).
    pub lock_file: Option<String>,
    /// Canonical storage for symlink installs (default `~/.agents/skills`).
    pub skills_root: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub mode: InstallMode,
    /// Agents targeted when the caller does not name any.
    pub agents: Vec<String>,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            mode: InstallMode::Symlink,
            agents: vec!["claude-code".into()],
        }
    }
}

/// Override for a known agent, or the definition of a custom one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOverride {
    /// Global skills directory, `~` allowed.
    pub dir: Option<String>,
    /// Skills directory relative to a project root.
    pub project_dir: Option<String>,
}

/// Fully resolved absolute paths derived from [`PathsConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub home: PathBuf,
    pub lock_file: PathBuf,
    pub skills_root: PathBuf,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: SkilldeckConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, SkilldeckConfig::default());
        assert_eq!(cfg.install.mode, InstallMode::Symlink);
        assert_eq!(cfg.install.agents, vec!["claude-code".to_string()]);
    }

    #[test]
    fn parses_agents_and_mode() {
        let cfg: SkilldeckConfig = toml::from_str(
            r#"
            [install]
            mode = "copy"
            agents = ["codex", "my-agent"]

            [agents.my-agent]
            dir = "~/.my-agent/skills"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.install.mode, InstallMode::Copy);
        assert_eq!(
            cfg.agents["my-agent"].dir.as_deref(),
            Some("~/.my-agent/skills")
        );
        assert!(cfg.agents["my-agent"].project_dir.is_none());
    }

    #[test]
    fn install_mode_from_str() {
        assert_eq!("Symlink".parse::<InstallMode>().unwrap(), InstallMode::Symlink);
        assert_eq!("copy".parse::<InstallMode>().unwrap(), InstallMode::Copy);
        assert!("hardlink".parse::<InstallMode>().is_err());
    }
}
