//! CLI commands for installing and tracking skills.

use std::path::{Path, PathBuf};

use {
    anyhow::{Context as _, bail},
    skilldeck_config::{InstallMode, ResolvedPaths, SkilldeckConfig},
    skilldeck_skills::{
        RemoteMeta, SkillManager, SourceType, TargetStatus,
        agents::{Agent, Scope, resolve_agents, target_dirs},
        source::LocalDirSource,
    },
    tracing::debug,
};

/// Everything a command needs, resolved once from config.
pub struct Context {
    /// The config file in effect, if any.
    pub config_path: Option<PathBuf>,
    pub config: SkilldeckConfig,
    pub paths: ResolvedPaths,
    pub agents: Vec<Agent>,
    pub manager: SkillManager,
}

impl Context {
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let (config_path, config) = match config_path {
            Some(path) => {
                let mut config = skilldeck_config::load_config(path)
                    .with_context(|| format!("loading config {}", path.display()))?;
                skilldeck_config::apply_env_overrides(&mut config);
                (Some(path.to_path_buf()), config)
            },
            None => (
                skilldeck_config::find_config_file(),
                skilldeck_config::discover_and_load(),
            ),
        };
        let paths = skilldeck_config::resolve_paths(&config)?;
        debug!(
            lock_file = %paths.lock_file.display(),
            skills_root = %paths.skills_root.display(),
            "resolved paths"
        );
        let agents = resolve_agents(&config, &paths.home);
        let manager = SkillManager::from_paths(paths.lock_file.clone(), paths.skills_root.clone());
        Ok(Self {
            config_path,
            config,
            paths,
            agents,
            manager,
        })
    }

    fn scope(project: Option<PathBuf>) -> anyhow::Result<Scope> {
        Ok(match project {
            Some(root) => Scope::Project(std::path::absolute(root)?),
            None => Scope::Global,
        })
    }
}

pub struct AddArgs {
    pub path: String,
    pub name: Option<String>,
    pub agents: Vec<String>,
    pub mode: Option<InstallMode>,
    pub project: Option<PathBuf>,
    pub json: bool,
}

pub fn list(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let records = ctx.manager.list();
    if json {
        let map: serde_json::Map<String, serde_json::Value> = records
            .iter()
            .map(|r| Ok((r.name.clone(), serde_json::to_value(r)?)))
            .collect::<Result<_, serde_json::Error>>()?;
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No skills installed.");
        println!("Lock file: {}", ctx.paths.lock_file.display());
        return Ok(());
    }
    for r in &records {
        println!(
            "  {name} ({kind}: {source}) updated {updated}",
            name = r.name,
            kind = r.source_type,
            source = r.source,
            updated = r.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

pub async fn add(ctx: &Context, args: AddArgs) -> anyhow::Result<()> {
    let agent_ids = if args.agents.is_empty() {
        ctx.config.install.agents.clone()
    } else {
        args.agents
    };
    let mode = args.mode.unwrap_or(ctx.config.install.mode);
    let scope = Context::scope(args.project)?;
    let targets = target_dirs(&ctx.agents, &agent_ids, &scope)?;

    let report = ctx
        .manager
        .add(
            &LocalDirSource::new(),
            &args.path,
            args.name.as_deref(),
            &targets,
            mode,
        )
        .await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "status": report.status(),
                "record": report.record,
                "result": report.result,
            }))?
        );
    } else {
        let name = &report.result.dir_name;
        for t in &report.result.targets {
            let note = match &t.status {
                TargetStatus::Linked => "linked".to_string(),
                TargetStatus::Canonical => "canonical copy".to_string(),
                TargetStatus::Copied => "copied".to_string(),
                TargetStatus::CopiedFallback { reason } => {
                    format!("copied (symlink failed: {reason})")
                },
                TargetStatus::Failed { error } => format!("FAILED: {error}"),
            };
            println!("  {} {note}", t.installed_path.display());
        }
        match &report.record {
            Some(r) => println!("Installed {name} ({mode}), hash {}", r.content_hash),
            None => println!("Install of {name} failed for every target; lock file unchanged."),
        }
    }

    if report.record.is_none() {
        bail!("no target received the skill");
    }
    Ok(())
}

pub async fn check(
    ctx: &Context,
    name: &str,
    content_hash: Option<String>,
    folder_hash: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let staleness = if content_hash.is_some() || folder_hash.is_some() {
        let remote = RemoteMeta {
            content_hash,
            skill_folder_hash: folder_hash,
        };
        ctx.manager.check_update(name, &remote)?
    } else {
        let record = ctx.manager.record(name)?;
        if record.source_type != SourceType::Local {
            bail!(
                "'{name}' comes from a {} source; pass --content-hash or --folder-hash",
                record.source_type
            );
        }
        ctx.manager.check_with(name, &LocalDirSource::new()).await?
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "name": name,
                "stale": staleness.is_stale(),
                "staleness": staleness,
            }))?
        );
    } else {
        println!("{name}: {staleness}");
    }
    Ok(())
}

pub async fn remove(
    ctx: &Context,
    name: &str,
    purge: bool,
    agents: Vec<String>,
    project: Option<PathBuf>,
) -> anyhow::Result<()> {
    let removed = if purge {
        let ids = if agents.is_empty() {
            ctx.agents.iter().map(|a| a.id.clone()).collect()
        } else {
            agents
        };
        let targets = target_dirs(&ctx.agents, &ids, &Context::scope(project)?)?;
        ctx.manager.uninstall(name, &targets).await?
    } else {
        ctx.manager.remove(name)?
    };

    match removed {
        Some(_) => println!("Removed {name}."),
        None => println!("{name} was not in the lock file."),
    }
    Ok(())
}

pub fn agents(ctx: &Context, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&ctx.agents)?);
        return Ok(());
    }
    let default: Vec<&str> = ctx.config.install.agents.iter().map(String::as_str).collect();
    for a in &ctx.agents {
        let marker = if default.contains(&a.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {id:<16} {global}  (project: {project})",
            id = a.id,
            global = a.global_dir.display(),
            project = a.project_dir.display(),
        );
    }
    Ok(())
}
