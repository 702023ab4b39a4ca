mod config_commands;
mod skill_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    skilldeck_config::InstallMode,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "skilldeck", version, about = "Install and track agent skills")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./skilldeck.toml and the user config dir).
    #[arg(long, global = true, env = "SKILLDECK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List skills recorded in the lock file.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Install a skill from a local directory.
    Add {
        /// Directory containing SKILL.md.
        path: String,
        /// Lock name (defaults to the manifest's `name`, then the directory name).
        #[arg(long)]
        name: Option<String>,
        /// Target agent id; repeat for several (defaults to `install.agents`).
        #[arg(short, long = "agent")]
        agents: Vec<String>,
        /// Install mode: symlink or copy (defaults to `install.mode`).
        #[arg(long)]
        mode: Option<InstallMode>,
        /// Install into this project root instead of the user's home.
        #[arg(long)]
        project: Option<PathBuf>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check whether an installed skill has an update.
    Check {
        /// Skill name.
        name: String,
        /// Current remote SKILL.md hash.
        #[arg(long)]
        content_hash: Option<String>,
        /// Current remote folder tree hash.
        #[arg(long)]
        folder_hash: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Remove a skill from the lock file.
    Remove {
        /// Skill name.
        name: String,
        /// Also delete installed files from agent directories and canonical storage.
        #[arg(long)]
        purge: bool,
        /// Agents to delete files from with --purge (defaults to every known agent).
        #[arg(short, long = "agent")]
        agents: Vec<String>,
        /// Project root to purge from instead of the user's home.
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// List known agents and their skill directories.
    Agents {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "skilldeck starting");

    let ctx = skill_commands::Context::load(cli.config.as_deref())?;

    match cli.command {
        Commands::List { json } => skill_commands::list(&ctx, json),
        Commands::Add {
            path,
            name,
            agents,
            mode,
            project,
            json,
        } => {
            skill_commands::add(&ctx, skill_commands::AddArgs {
                path,
                name,
                agents,
                mode,
                project,
                json,
            })
            .await
        },
        Commands::Check {
            name,
            content_hash,
            folder_hash,
            json,
        } => skill_commands::check(&ctx, &name, content_hash, folder_hash, json).await,
        Commands::Remove {
            name,
            purge,
            agents,
            project,
        } => skill_commands::remove(&ctx, &name, purge, agents, project).await,
        Commands::Agents { json } => skill_commands::agents(&ctx, json),
        Commands::Config { action } => config_commands::handle_config(&ctx, action),
    }
}
