//! xtalk command-line interface.
//!
//! Runs the crosstalk / dynamical-decoupling benchmark against a backend,
//! writes the generated circuits for inspection, and re-scores stored
//! counts.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;
use xtalk_bench::ScenarioKind;

mod commands;

use commands::{build, evaluate, run, scenarios, version};

/// xtalk - crosstalk and dynamical-decoupling benchmark
#[derive(Parser)]
#[command(name = "xtalk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Which scenario kinds to include.
///
/// With no flag given, each kind is offered as a yes/no prompt.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Scenario kind to run (repeatable)
    #[arg(short = 's', long = "scenario", value_name = "KIND", conflicts_with_all = ["all", "interactive"])]
    pub scenarios: Vec<ScenarioKind>,

    /// Run every scenario kind
    #[arg(long, conflicts_with = "interactive")]
    pub all: bool,

    /// Ask yes/no for each scenario kind
    #[arg(short, long)]
    pub interactive: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, execute and score the selected scenarios
    Run {
        /// Experiment configuration (written as a template if missing)
        #[arg(short, long, env = "XTALK_CONFIG", default_value = "config.json")]
        config: PathBuf,

        /// Backend to execute on (ibm, ibm_torino, ibm_fez, ...)
        #[arg(short, long, env = "XTALK_BACKEND", default_value = "ibm")]
        backend: String,

        /// Shots per circuit
        #[arg(long, env = "XTALK_SHOTS", default_value = "1024")]
        shots: u32,

        /// Give up on a backend round-trip after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Directory receiving counts.jsonl and fidelities.jsonl
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Do not append results to the output files
        #[arg(long)]
        no_save: bool,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Build the selected scenarios and write one OpenQASM 3 file per circuit
    Build {
        /// Experiment configuration (written as a template if missing)
        #[arg(short, long, env = "XTALK_CONFIG", default_value = "config.json")]
        config: PathBuf,

        /// Directory receiving the .qasm files
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Score a stored run from counts.jsonl
    Evaluate {
        /// Experiment configuration (written as a template if missing)
        #[arg(short, long, env = "XTALK_CONFIG", default_value = "config.json")]
        config: PathBuf,

        /// Directory holding counts.jsonl
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Zero-based run index in counts.jsonl (defaults to the last run)
        #[arg(long)]
        run: Option<usize>,

        /// Append the scores to fidelities.jsonl
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// List scenario kinds
    Scenarios,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run {
            config,
            backend,
            shots,
            timeout,
            output,
            no_save,
            selection,
        } => {
            run::execute(run::RunArgs {
                config,
                backend,
                shots,
                timeout,
                output,
                save: !no_save,
                selection,
            })
            .await
        }

        Commands::Build {
            config,
            output,
            selection,
        } => build::execute(&config, &output, &selection),

        Commands::Evaluate {
            config,
            output,
            run,
            save,
            selection,
        } => evaluate::execute(&config, &output, run, save, &selection),

        Commands::Scenarios => {
            scenarios::execute();
            Ok(())
        }

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
