//! CLI for gitlab-search.
//!
//! Performs a thorough keyword search across every project reachable from
//! your GitLab groups and prints matching snippets per project.

use clap::{Parser, Subcommand};
use gitlab_search::{Runner, RunnerConfig, RunnerError};
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// GitLab group-wide keyword search.
#[derive(Parser, Debug)]
#[command(name = "gs", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Perform a thorough search of your GitLab projects.
    Search {
        /// GitLab server URL.
        #[arg(short, long, default_value = "")]
        url: String,

        /// Personal access token.
        #[arg(short, long, default_value = "")]
        token: String,

        /// Search keyword.
        #[arg(short, long, default_value = "")]
        keyword: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "search run failed");
            ExitCode::FAILURE
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Main execution logic.
async fn run(cli: Cli) -> Result<(), RunnerError> {
    match cli.command {
        Command::Search {
            url,
            token,
            keyword,
        } => {
            debug!(%url, %keyword, "starting search run");
            let runner = Runner::new(RunnerConfig::new(url, token, keyword))?;
            runner.run().await?;
            Ok(())
        }
    }
}
