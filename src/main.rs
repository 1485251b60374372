use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dotclaude::{
    commands,
    hooks::HookType,
    paths::Paths,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "dotclaude")]
#[command(about = "Layered Claude Code configuration - activate profiles, restore backups, run hooks")]
#[command(version)]
struct Cli {
    /// Repository holding base/ and profiles/
    #[arg(long, global = true, env = "DOTCLAUDE_REPO_DIR", value_name = "DIR")]
    repo_dir: Option<PathBuf>,

    /// Claude configuration directory the profile is deployed to
    #[arg(long, global = true, env = "CLAUDE_DIR", value_name = "DIR")]
    claude_dir: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available profiles
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active profile and deployed files
    Show,

    /// Create a new profile from the sample template
    Create {
        /// Name of the profile to create
        name: String,
    },

    /// Delete a profile
    Delete {
        /// Name of the profile to delete
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Merge base and profile configuration into the Claude directory
    Activate {
        /// Name of the profile to activate (prompts when omitted)
        name: Option<String>,

        /// Show what would change without writing anything
        #[arg(long, alias = "preview")]
        dry_run: bool,
    },

    /// Restore CLAUDE.md or settings.json from a backup
    Restore {
        /// Backup file to restore (shows a menu when omitted)
        path: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List backups in the Claude directory
    Backups {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open a profile's CLAUDE.md in your editor
    Edit {
        /// Name of the profile to edit (defaults to the active profile)
        name: Option<String>,

        /// Edit settings.json instead of CLAUDE.md
        #[arg(short, long)]
        settings: bool,
    },

    /// Compare the CLAUDE.md of two profiles
    Diff {
        /// Profile to compare (against the active profile when alone)
        first: String,

        /// Second profile to compare
        second: Option<String>,
    },

    /// Run or inspect lifecycle hooks
    Hook {
        #[command(subcommand)]
        command: HookCommands,
    },

    /// Run diagnostics on the dotclaude setup
    Doctor {
        /// Remove an active marker that names a missing profile
        #[arg(long)]
        fix: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum HookCommands {
    /// Run every hook of a type in priority order
    Run {
        /// session-start, post-tool-bash, post-tool-edit, pre-tool-bash, pre-tool-edit
        hook_type: HookType,

        /// Kill external hooks running longer than this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// List hooks and their execution order
    List {
        /// Only list this hook type
        hook_type: Option<HookType>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create the hook directories
    Init,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dotclaude=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "dotclaude", &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new(cli.repo_dir, cli.claude_dir)?;
    let ui = Ui::new(cli.color, cli.no_color);

    match cli.command {
        Commands::List { json } => commands::list(&paths, &ui, json),
        Commands::Show => commands::show(&paths, &ui),
        Commands::Create { name } => commands::create(&paths, &name, &ui),
        Commands::Delete { name, force } => commands::delete(&paths, &name, &ui, force),
        Commands::Activate { name, dry_run } => {
            commands::activate(&paths, name.as_deref(), &ui, dry_run)
        }
        Commands::Restore { path, yes } => commands::restore(&paths, path.as_deref(), &ui, yes),
        Commands::Backups { json } => commands::backups(&paths, &ui, json),
        Commands::Edit { name, settings } => {
            commands::edit(&paths, name.as_deref(), settings, &ui)
        }
        Commands::Diff { first, second } => {
            commands::diff(&paths, &first, second.as_deref(), &ui)
        }
        Commands::Hook { command } => match command {
            HookCommands::Run { hook_type, timeout } => {
                commands::hook_run(&paths, hook_type, timeout)
            }
            HookCommands::List { hook_type, json } => {
                commands::hook_list(&paths, hook_type, &ui, json)
            }
            HookCommands::Init => commands::hook_init(&paths, &ui),
        },
        Commands::Doctor { fix } => commands::doctor(&paths, &ui, fix),
        Commands::Completions { .. } => Ok(()),
    }
}
