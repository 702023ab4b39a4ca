use std::path::PathBuf;

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    skilldeck_config::SkilldeckConfig,
};

use crate::skill_commands::Context;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show which config file is in use and the resolved state paths.
    Path,
    /// Write the effective configuration as TOML.
    Init {
        /// Destination (defaults to the user config dir).
        #[arg(long)]
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => {
            match &ctx.config_path {
                Some(path) => println!("Config:       {}", path.display()),
                None => println!("Config:       (none, using defaults)"),
            }
            println!("Lock file:    {}", ctx.paths.lock_file.display());
            println!("Skills root:  {}", ctx.paths.skills_root.display());
            Ok(())
        },
        ConfigAction::Init { path, force } => init(&ctx.config, path, force),
    }
}

fn init(config: &SkilldeckConfig, path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => match skilldeck_config::config_dir() {
            Some(dir) => dir.join("skilldeck.toml"),
            None => bail!("no user config directory; pass --path"),
        },
    };
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    skilldeck_config::save_config(config, &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
