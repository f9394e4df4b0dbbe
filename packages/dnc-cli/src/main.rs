//! Command-line front end for batch DNC checks.
//!
//! Subcommands:
//! - `run` checks every number in a file with live progress and key controls
//! - `status` probes the lookup relay
//! - `show` pages through stored results with an optional filter
//! - `export` writes stored results to CSV or JSON
//! - `clear` deletes stored results and the saved session

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod context;
mod export;
mod intake;
mod table;

use cmd::export::ExportFormat;
use cmd::run::RunArgs;
use context::AppContext;

#[derive(Parser)]
#[command(name = "dnc")]
#[command(version, about = "Batch DNC registry checks for 10-digit phone numbers")]
struct Cli {
    /// Skip prompts and accept safe defaults
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every number in a .txt or .csv file
    Run {
        /// File of phone numbers, one or more per line
        file: PathBuf,

        /// Skip the DNC registry query for each number
        #[arg(long)]
        no_registry: bool,

        /// Skip the owner details query for each number
        #[arg(long)]
        no_details: bool,

        /// Pause between numbers, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,

        /// Print the recent activity log after the run
        #[arg(long)]
        show_log: bool,
    },

    /// Probe the lookup relay and report whether it is reachable
    Status,

    /// Page through stored results
    Show {
        /// Case-insensitive filter over number, name, address and state
        #[arg(long)]
        query: Option<String>,

        /// Page to display, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Records per page
        #[arg(long, default_value_t = 25)]
        page_size: usize,
    },

    /// Write stored results to a file
    Export {
        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output path; defaults to dnc-check-results-<date> in the current directory
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete stored results and the saved session
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let ctx = AppContext::new(cli.quiet);

    match cli.command {
        Commands::Run {
            file,
            no_registry,
            no_details,
            delay_ms,
            show_log,
        } => {
            cmd::run::run(
                &ctx,
                RunArgs {
                    file,
                    no_registry,
                    no_details,
                    delay_ms,
                    show_log,
                },
            )
            .await
        }
        Commands::Status => cmd::status::run(&ctx).await,
        Commands::Show {
            query,
            page,
            page_size,
        } => cmd::show::run(&ctx, query, page, page_size).await,
        Commands::Export { format, out } => cmd::export::run(&ctx, format, out).await,
        Commands::Clear => cmd::clear::run(&ctx).await,
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
