use std::path::{Path, PathBuf};

use {
    skilldeck_common::fs::{expand_home, home_dir, write_atomic},
    tracing::{debug, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::{ResolvedPaths, SkilldeckConfig},
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "skilldeck.toml",
    "skilldeck.yaml",
    "skilldeck.yml",
    "skilldeck.json",
];

const DEFAULT_LOCK_FILE: &str = "~/.agents/.skill-lock.json";
const DEFAULT_SKILLS_ROOT: &str = "~/.agents/skills";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SkilldeckConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./skilldeck.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/skilldeck/skilldeck.{toml,yaml,yml,json}` (user-global)
///
/// Returns `SkilldeckConfig::default()` if no config file is found or the
/// one found cannot be parsed.
pub fn discover_and_load() -> SkilldeckConfig {
    let mut cfg = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                SkilldeckConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            SkilldeckConfig::default()
        },
    };
    apply_env_overrides(&mut cfg);
    cfg
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists());
    if local.is_some() {
        return local;
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/skilldeck/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "skilldeck").map(|d| d.config_dir().to_path_buf())
}

/// Serialize `config` to TOML and write it atomically to `path`.
pub fn save_config(config: &SkilldeckConfig, path: &Path) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    write_atomic(path, toml_str.as_bytes()).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}

/// Apply `SKILLDECK_LOCK_FILE` / `SKILLDECK_SKILLS_ROOT` from the environment.
pub fn apply_env_overrides(config: &mut SkilldeckConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut SkilldeckConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("SKILLDECK_LOCK_FILE").filter(|v| !v.is_empty()) {
        config.paths.lock_file = Some(v);
    }
    if let Some(v) = lookup("SKILLDECK_SKILLS_ROOT").filter(|v| !v.is_empty()) {
        config.paths.skills_root = Some(v);
    }
}

/// Resolve configured paths against the current user's home directory.
pub fn resolve_paths(config: &SkilldeckConfig) -> Result<ResolvedPaths> {
    let home = home_dir().ok_or(Error::NoHomeDir)?;
    Ok(resolve_paths_in(config, &home))
}

fn resolve_paths_in(config: &SkilldeckConfig, home: &Path) -> ResolvedPaths {
    let lock_file = config
        .paths
        .lock_file
        .as_deref()
        .unwrap_or(DEFAULT_LOCK_FILE);
    let skills_root = config
        .paths
        .skills_root
        .as_deref()
        .unwrap_or(DEFAULT_SKILLS_ROOT);
    ResolvedPaths {
        home: home.to_path_buf(),
        lock_file: expand_home(lock_file, home),
        skills_root: expand_home(skills_root, home),
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<SkilldeckConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            ext: ext.to_string(),
        }),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::InstallMode};

    #[test]
    fn default_paths_live_under_dot_agents() {
        let paths = resolve_paths_in(&SkilldeckConfig::default(), Path::new("/home/dev"));
        assert_eq!(
            paths.lock_file,
            PathBuf::from("/home/dev/.agents/.skill-lock.json")
        );
        assert_eq!(paths.skills_root, PathBuf::from("/home/dev/.agents/skills"));
    }

    #[test]
    fn env_overrides_win_over_file_values() {
        let mut cfg = SkilldeckConfig::default();
        cfg.paths.lock_file = Some("/from/file.json".into());
        apply_env_overrides_with(&mut cfg, |name| match name {
            "SKILLDECK_LOCK_FILE" => Some("~/custom.json".into()),
            "SKILLDECK_SKILLS_ROOT" => Some(String::new()),
            _ => None,
        });
        assert_eq!(cfg.paths.lock_file.as_deref(), Some("~/custom.json"));
        assert!(cfg.paths.skills_root.is_none());

        let paths = resolve_paths_in(&cfg, Path::new("/h"));
        assert_eq!(paths.lock_file, PathBuf::from("/h/custom.json"));
    }

    #[test]
    fn loads_each_format() {
        let tmp = tempfile::tempdir().unwrap();

        let toml_path = tmp.path().join("skilldeck.toml");
        std::fs::write(&toml_path, "[install]\nmode = \"copy\"\n").unwrap();
        assert_eq!(load_config(&toml_path).unwrap().install.mode, InstallMode::Copy);

        let yaml_path = tmp.path().join("skilldeck.yaml");
        std::fs::write(&yaml_path, "install:\n  mode: copy\n").unwrap();
        assert_eq!(load_config(&yaml_path).unwrap().install.mode, InstallMode::Copy);

        let json_path = tmp.path().join("skilldeck.json");
        std::fs::write(&json_path, r#"{"paths":{"skills_root":"/srv/skills"}}"#).unwrap();
        assert_eq!(
            load_config(&json_path).unwrap().paths.skills_root.as_deref(),
            Some("/srv/skills")
        );

        let ini_path = tmp.path().join("skilldeck.ini");
        std::fs::write(&ini_path, "").unwrap();
        assert!(matches!(
            load_config(&ini_path),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("cfg/skilldeck.toml");
        let mut cfg = SkilldeckConfig::default();
        cfg.install.mode = InstallMode::Copy;
        cfg.agents.insert("custom".into(), crate::schema::AgentOverride {
            dir: Some("~/.custom/skills".into()),
            project_dir: None,
        });

        save_config(&cfg, &path).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }
}
