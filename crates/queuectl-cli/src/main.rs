//! `queuectl`: a CLI-based, at-least-once job queue.
//!
//! Generalizes `main.go` + `cmd/root.go`'s cobra command tree into a clap
//! derive `Cli`/`Commands` pair. Operational detail (what a worker is
//! doing right now, why a claim failed) goes through `tracing`; the
//! command's actual result — what the original printed with `fmt.Println`
//! — still goes to stdout, since that's the CLI's contract with its user,
//! not a log line.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use queuectl_core::Config;
use queuectl_sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "queuectl")]
#[command(about = "A CLI-based job queue system")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Adds a job to the queue
    Enqueue {
        /// Job descriptor as JSON: {"id": "...", "command": "...", "max_retries": 0}
        job: String,
    },
    /// List jobs by state
    List {
        /// Filter jobs by state (pending, processing, completed, failed, dead)
        #[arg(long)]
        state: String,
    },
    /// Show a summary of job states
    Status,
    /// Manage worker processes
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Manage the Dead Letter Queue (DLQ)
    Dlq {
        #[command(subcommand)]
        action: DlqAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum WorkerAction {
    /// Start one or more worker processes
    Start {
        /// Number of workers to start
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Signal a running worker pool to shut down
    Stop,
}

#[derive(Subcommand)]
enum DlqAction {
    /// List all jobs in the DLQ
    List,
    /// Retry a specific job from the DLQ
    Retry {
        /// ID of the job to retry
        job_id: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Set a configuration value (max-retries, backoff-base)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = queuectl_core::config::load()?;
    let data_dir = PathBuf::from(&cfg.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    match cli.command {
        Commands::Enqueue { job } => {
            let store = open_store(&cfg, &data_dir).await?;
            commands::enqueue::run(&store, &job, cfg.max_retries).await
        }
        Commands::List { state } => {
            let store = open_store(&cfg, &data_dir).await?;
            commands::list::run(&store, &state).await
        }
        Commands::Status => {
            let store = open_store(&cfg, &data_dir).await?;
            commands::status::run(&store, &data_dir).await
        }
        Commands::Worker { action } => match action {
            WorkerAction::Start { count } => commands::worker::start(&cfg, &data_dir, count).await,
            WorkerAction::Stop => commands::worker::stop(&data_dir),
        },
        Commands::Dlq { action } => {
            let store = open_store(&cfg, &data_dir).await?;
            match action {
                DlqAction::List => commands::dlq::list(&store).await,
                DlqAction::Retry { job_id } => commands::dlq::retry(&store, &job_id).await,
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&cfg),
            ConfigAction::Set { key, value } => commands::config::set(key, value),
        },
    }
}

async fn open_store(cfg: &Config, data_dir: &std::path::Path) -> anyhow::Result<SqliteStore> {
    let path = data_dir.join("queue.db");
    SqliteStore::connect(&path).await
}
