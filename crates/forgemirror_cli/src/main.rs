//! forgemirror CLI - keeps GitLab pull mirrors of GitHub repositories.

mod commands;
mod config;
mod progress;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::report::OutputFormat;

#[derive(Parser)]
#[command(name = "forgemirror")]
#[command(version)]
#[command(about = "One-way GitHub to GitLab repository mirroring")]
#[command(
    long_about = "forgemirror makes sure every GitHub repository you own or follow has a \
private, pull-mirrored project in one GitLab group, and prunes projects whose \
source has been gone for longer than a grace period."
)]
#[command(after_long_help = r#"EXAMPLES
    Create and configure missing mirrors:
        $ forgemirror mirror

    See what prune would delete, without deleting:
        $ forgemirror prune --dry-run

    Delete mirrors whose source has been gone for two weeks:
        $ forgemirror prune --delete --grace-days 14

    Generate shell completions:
        $ forgemirror completions bash > ~/.local/share/bash-completion/completions/forgemirror

CONFIGURATION
    forgemirror reads configuration from:
      1. ~/.config/forgemirror/config.toml (or $XDG_CONFIG_HOME/forgemirror/config.toml)
      2. ./forgemirror.toml
      3. Environment variables (FORGEMIRROR_ prefix, e.g., FORGEMIRROR_GITLAB__GROUP_ID)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    FORGEMIRROR_GITHUB__TOKEN      GitHub personal access token (or GITHUB_TOKEN)
    FORGEMIRROR_GITHUB__ACCOUNTS   Comma-separated GitHub accounts (or GITHUB_USER)
    FORGEMIRROR_GITLAB__TOKEN      GitLab personal access token (or GITLAB_TOKEN)
    FORGEMIRROR_GITLAB__HOST       GitLab host (default: gitlab.com, or GITLAB_URL)
    FORGEMIRROR_GITLAB__GROUP_ID   Destination group id (or GITLAB_GROUP_ID)
    FORGEMIRROR_PRUNE__GRACE_DAYS  Days before a missing repo is pruned (or GRACE_DAYS)
    FORGEMIRROR_PRUNE__DRY_RUN     Report only (default: true, or DRY_RUN)
    RUST_LOG                       Log filter (default: forgemirror=info,forgemirror_cli=info)
"#)]
struct Cli {
    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing destination projects and configure their pull mirrors
    Mirror(MirrorArgs),
    /// Delete destination projects whose source is gone past the grace period
    Prune(PruneArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

/// Options for the mirror job.
#[derive(Debug, Clone, clap::Args)]
struct MirrorArgs {
    /// Source account(s) - overrides configuration, can be repeated
    #[arg(short, long = "account")]
    accounts: Vec<String>,

    /// Destination GitLab group id
    #[arg(short, long)]
    group_id: Option<u64>,

    /// Don't push repository contents when pull mirroring is unavailable
    #[arg(long)]
    no_fallback: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

/// Options for the prune job.
#[derive(Debug, Clone, clap::Args)]
struct PruneArgs {
    /// Source account(s) - overrides configuration, can be repeated
    #[arg(short, long = "account")]
    accounts: Vec<String>,

    /// Destination GitLab group id
    #[arg(short, long)]
    group_id: Option<u64>,

    /// Report candidates without deleting (default unless configured otherwise)
    #[arg(short = 'n', long, conflicts_with = "delete")]
    dry_run: bool,

    /// Actually delete projects past the grace period
    #[arg(long)]
    delete: bool,

    /// Days a repository must be missing before its mirror is deleted
    #[arg(long)]
    grace_days: Option<u32>,

    /// Never delete this project (name or owner/name), can be repeated
    #[arg(long = "protect", value_name = "NAME")]
    protect: Vec<String>,

    /// Ledger file (default: <state dir>/forgemirror/prune_state.json)
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Prune even if the source listing comes back empty
    #[arg(long)]
    allow_empty_source: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

fn init_tracing(format: LogFormat) {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("forgemirror=info,forgemirror_cli=info"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(Term::stderr().is_term())
        .with_target(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(ExitCode::SUCCESS);
    }

    init_tracing(cli.log_format);
    shutdown::setup_shutdown_handler();

    // Load configuration (config file -> env vars -> legacy env vars -> defaults)
    let config = config::Config::load();

    let result = match cli.command {
        Commands::Mirror(args) => commands::mirror::handle_mirror(args, &config).await,
        Commands::Prune(args) => commands::prune::handle_prune(args, &config).await,
        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => Ok(code),
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            Ok(ExitCode::FAILURE)
        }
    }
}
