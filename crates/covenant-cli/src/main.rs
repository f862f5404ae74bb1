mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::covenant::{EvaluateArgs, RunTestsArgs};

/// Loan covenant compliance testing
#[derive(Parser)]
#[command(
    name = "covmon",
    version,
    about = "Loan covenant compliance testing",
    long_about = "Evaluates financial covenants (leverage, interest coverage, fixed charge \
                  coverage, current ratio, minimum net worth, custom ratios) against a \
                  borrower's reported figures with decimal precision, and classifies each \
                  test as compliant, warning or breach."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Test one covenant against one period's figures
    Evaluate(EvaluateArgs),
    /// Test a portfolio of covenants against reported periods
    RunTests(RunTestsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::covenant::run_evaluate(args),
        Commands::RunTests(args) => commands::covenant::run_tests(args),
        Commands::Version => {
            println!("covmon {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
