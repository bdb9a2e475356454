//! `lfc` command-line tool: track, cache, and transfer large files
//! alongside a Git repository without storing their bytes in the Git
//! object database.

mod commands;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lfc_core::config::TrackingMode;

/// Large File Control.
#[derive(Parser, Debug)]
#[command(name = "lfc", version, about = "Track large files alongside Git without bloating the object database")]
struct Cli {
    /// Remote to use when one isn't implied by config.
    #[arg(short = 'r', long, global = true)]
    remote: Option<String>,

    /// Number of concurrent transfer workers.
    #[arg(short = 'j', long, global = true)]
    jobs: Option<usize>,

    /// How `add` leaves the working-tree file.
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    /// Proceed even when a safety check would normally stop the operation.
    #[arg(long, global = true)]
    force: bool,

    /// Suppress non-error output.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Pointer,
    Link,
    Copy,
}

impl From<ModeArg> for TrackingMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Pointer => TrackingMode::Pointer,
            ModeArg::Link => TrackingMode::Link,
            ModeArg::Copy => TrackingMode::Copy,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize an LFC repository in the current Git working tree.
    Init,

    /// Track one or more files, hashing them into the local cache.
    Add {
        paths: Vec<PathBuf>,
    },

    /// Materialize cached files into the working tree, pulling any that
    /// are missing locally.
    Pull {
        paths: Vec<PathBuf>,
    },

    /// Upload cached blobs referenced by tracked sidecars to a remote.
    Push {
        paths: Vec<PathBuf>,
    },

    /// Clone a Git repository and set it up as an LFC repository.
    Clone {
        git_url: String,
        dir: Option<PathBuf>,
    },

    /// Ensure tracked files are present in the working tree.
    Checkout {
        paths: Vec<PathBuf>,
    },

    /// Report the reconciliation state of every tracked file.
    Status,

    /// Manage configured remotes.
    Remote {
        #[command(subcommand)]
        action: commands::remote::RemoteAction,
    },

    /// Read or write a configuration key.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },

    /// Print the currently resolved hash for a tracked path.
    Show {
        path: PathBuf,
    },

    /// List the blobs a remote currently holds.
    LsRemote {
        name: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", style::error(&format!("{e:#}")));
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let ctx = commands::Context {
        remote: cli.remote.clone(),
        jobs: cli.jobs,
        mode: cli.mode.map(TrackingMode::from).unwrap_or_default(),
        force: cli.force,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Init => commands::init::run(&ctx),
        Commands::Add { paths } => commands::add::run(&ctx, &paths),
        Commands::Pull { paths } => commands::pull::run(&ctx, &paths).await,
        Commands::Push { paths } => commands::push::run(&ctx, &paths).await,
        Commands::Clone { git_url, dir } => commands::clone::run(&ctx, &git_url, dir.as_deref()).await,
        Commands::Checkout { paths } => commands::checkout::run(&ctx, &paths),
        Commands::Status => commands::status::run(&ctx),
        Commands::Remote { action } => commands::remote::run(&ctx, action),
        Commands::Config { action } => commands::config::run(&ctx, action),
        Commands::Show { path } => commands::show::run(&ctx, &path),
        Commands::LsRemote { name } => commands::ls_remote::run(&ctx, &name),
    }
}
