mod classify;
mod commands;
mod config;
mod dedupe;
mod error;
mod host;
mod link;
mod naming;
mod openai;
mod orchestrator;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapname", about = "Name pasted images after what they show")]
struct Cli {
    /// What to do
    #[command(subcommand)]
    command: Commands,
    /// Vault root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change .snapname.toml
    Config {
        /// Show or set
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Rename one image now and update its link in the note
    Rename {
        /// Image to rename
        file: PathBuf,
        /// Note holding the link (default: most recently modified note)
        #[arg(long)]
        note: Option<PathBuf>,
    },
    /// Print the collision-free name a candidate would get
    Resolve {
        /// Candidate file name
        name: String,
        /// Folder to check against (default: vault root)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Watch the vault and rename freshly pasted images
    Watch,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a key, e.g. `config set model gpt-4o-mini`
    Set {
        /// Setting name
        key: String,
        /// New value; lists are comma-separated
        value: String,
    },
    /// Print the effective settings
    Show,
}

/// Log to stderr, filtered by `SNAPNAME_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env("SNAPNAME_LOG").unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let env_key = std::env::var("OPENAI_API_KEY").ok();

    let result = match cli.command {
        Commands::Config { action: ConfigAction::Set { key, value } } => {
            commands::config_set(&cli.root, &key, &value).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Config { action: ConfigAction::Show } => {
            commands::config_show(&cli.root).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Rename { file, note } => commands::rename(&cli.root, &file, note, env_key),
        Commands::Resolve { name, dir } => {
            let dir = dir.unwrap_or_else(|| return cli.root.clone());
            commands::resolve(&name, &dir).map(|()| return ExitCode::SUCCESS)
        },
        Commands::Watch => commands::watch(&cli.root, env_key).map(|()| return ExitCode::SUCCESS),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    };
}
