mod cmd_inspect;
mod cmd_query;
mod cmd_url;
mod cmd_validate;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hyperdoc")]
#[command(about = "Validate, inspect, and query JSON:API documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a document against the JSON:API structure rules
    Validate {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Summarize a document: kind, primary data, included types, errors
    Inspect {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Look up resources in a document
    Query {
        #[command(subcommand)]
        op: cmd_query::QueryOp,
    },
    /// Assemble an absolute URL from path segments
    Url {
        /// Configuration file (defaults to ./hyperdoc.toml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Path segments below the configured root
        segments: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    match cli.command {
        Commands::Validate { input } => cmd_validate::run(input),
        Commands::Inspect { input } => cmd_inspect::run(input, cli.pretty),
        Commands::Query { op } => cmd_query::run(op, cli.pretty),
        Commands::Url { config, segments } => cmd_url::run(config, segments),
    }
}
