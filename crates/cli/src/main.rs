//! Stepwright CLI - Main Entry Point
//!
//! Runs data-driven browser scenarios and serves the written results.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{run, serve};

/// Stepwright - browser scenarios with nested reporting steps
#[derive(Parser)]
#[command(name = "stepwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios from the test data files
    Run(run::RunArgs),

    /// Serve a results directory over HTTP
    ServeReport(serve::ServeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => {
            let code = match run::execute(args, cli.format).await {
                Ok(summary) if summary.success() => 0,
                Ok(_) => 1,
                Err(e) => {
                    output::print_error(&format!("{:#}", e));
                    2
                }
            };
            std::process::exit(code);
        }
        Commands::ServeReport(args) => serve::execute(args).await?,
    }

    Ok(())
}
