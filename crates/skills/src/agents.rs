//! Known coding agents and where each one reads skills from.

use std::path::{Path, PathBuf};

use {
    serde::Serialize,
    skilldeck_common::fs::expand_home,
    skilldeck_config::SkilldeckConfig,
    tracing::debug,
};

use crate::error::{Error, Result};

/// `(id, display name, global dir under $HOME, project-relative dir)`.
const KNOWN_AGENTS: &[(&str, &str, &str, &str)] = &[
    ("claude-code", "Claude Code", ".claude/skills", ".claude/skills"),
    ("codex", "Codex", ".codex/skills", ".codex/skills"),
    ("cursor", "Cursor", ".cursor/skills", ".cursor/skills"),
    ("gemini-cli", "Gemini CLI", ".gemini/skills", ".gemini/skills"),
    ("github-copilot", "GitHub Copilot", ".copilot/skills", ".github/skills"),
    ("opencode", "OpenCode", ".config/opencode/skill", ".opencode/skill"),
    ("windsurf", "Windsurf", ".codeium/windsurf/skills", ".windsurf/skills"),
    ("goose", "Goose", ".config/goose/skills", ".goose/skills"),
    ("amp", "Amp", ".config/agents/skills", ".agents/skills"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub id: String,
    pub display_name: String,
    /// Absolute user-wide skills directory.
    pub global_dir: PathBuf,
    /// Skills directory relative to a project root.
    pub project_dir: PathBuf,
}

/// Whether to install for the current user or into one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Global,
    Project(PathBuf),
}

impl Agent {
    pub fn skills_dir(&self, scope: &Scope) -> PathBuf {
        match scope {
            Scope::Global => self.global_dir.clone(),
            Scope::Project(root) => root.join(&self.project_dir),
        }
    }
}

/// The built-in agent table with config overrides applied.
///
/// An `[agents.<id>]` entry for an unknown id defines a custom agent whose
/// directories default to `~/.<id>/skills` and `.<id>/skills`.
pub fn resolve_agents(config: &SkilldeckConfig, home: &Path) -> Vec<Agent> {
    let global = |dir: &str| {
        let path = expand_home(dir, home);
        if path.is_absolute() {
            path
        } else {
            home.join(path)
        }
    };

    let mut agents: Vec<Agent> = KNOWN_AGENTS
        .iter()
        .map(|(id, display, global_dir, project_dir)| Agent {
            id: (*id).to_string(),
            display_name: (*display).to_string(),
            global_dir: home.join(global_dir),
            project_dir: PathBuf::from(project_dir),
        })
        .collect();

    for (id, over) in &config.agents {
        let idx = match agents.iter().position(|a| a.id == *id) {
            Some(idx) => idx,
            None => {
                debug!(agent = %id, "registering custom agent from config");
                agents.push(Agent {
                    id: id.clone(),
                    display_name: id.clone(),
                    global_dir: home.join(format!(".{id}/skills")),
                    project_dir: PathBuf::from(format!(".{id}/skills")),
                });
                agents.len() - 1
            },
        };
        let agent = &mut agents[idx];
        if let Some(dir) = &over.dir {
            agent.global_dir = global(dir);
        }
        if let Some(dir) = &over.project_dir {
            agent.project_dir = PathBuf::from(dir);
        }
    }
    agents
}

/// Skills directories for the agents named in `ids`, in order, deduplicated.
pub fn target_dirs(agents: &[Agent], ids: &[String], scope: &Scope) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::with_capacity(ids.len());
    for id in ids {
        let agent = agents
            .iter()
            .find(|a| a.id == *id)
            .ok_or_else(|| Error::UnknownAgent { id: id.clone() })?;
        let dir = agent.skills_dir(scope);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    Ok(dirs)
}
