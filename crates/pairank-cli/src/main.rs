#![forbid(unsafe_code)]

mod cmd;
mod report;

use clap::{Parser, Subcommand};
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pairank: compare ranking-recovery algorithms on synthetic pairwise data",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Run a parameter sweep",
        long_about = "Run repeated trials for every (items, comparisons) pair and write ranks.csv and errors.csv.",
        after_help = "EXAMPLES:\n    # Default sweep (n=100, L=50, e=0.2, 50 trials)\n    pairank run\n\n    # Several sizes, reproducible\n    pairank run --items 50 100 200 --comparisons 10 50 --seed 7 --out results\n\n    # Settings from a file, one flag overridden\n    pairank run --config sweep.toml --trials 5"
    )]
    Run(cmd::run::RunArgs),

    #[command(
        about = "Run a single trial",
        long_about = "Run one trial and print every estimator's error and top-k agreement.",
        after_help = "EXAMPLES:\n    # One dense trial\n    pairank trial --items 20 --comparisons 100 --epsilon 1.0\n\n    # Emit machine-readable output\n    pairank trial --items 20 --seed 3 --json"
    )]
    Trial(cmd::trial::TrialArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PAIRANK_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pairank=debug,info"
        } else {
            "pairank=info,warn"
        })
    });

    let format = env::var("PAIRANK_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer().with_writer(std::io::stderr);

    match format.as_str() {
        "json" => {
            registry.with(layer.json().with_ansi(false)).init();
        }
        _ => {
            registry.with(layer.compact()).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(?cli, "parsed command line");

    match cli.command {
        Commands::Run(args) => cmd::run::run_sweep(&args),
        Commands::Trial(args) => cmd::trial::run_trial(&args),
    }
}
