use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use bundle_probe::commands::{
    check_tools_command, history_command, identify_command, list_bundles_command,
    load_helper_command, run_command,
};
use bundle_probe::init_tracing;
use clap::{Parser, Subcommand};
use probe_core::config::ProbeConfig;

/// Framework bundle probe.
///
/// This CLI is a thin wrapper around `probe-core` (exposed in code as `probe_core`).
/// All substantive logic lives in the library so it can be tested thoroughly.
#[derive(Parser, Debug)]
#[command(
    name = "bundle-probe",
    version,
    about = "Locate, fingerprint and safely probe private framework bundles",
    long_about = None
)]
struct Cli {
    /// JSON or YAML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse every component bundle and write reports.
    ///
    /// This will:
    /// - Verify radare2 and rabin2 are installed (exit 2 otherwise).
    /// - Scan the component roots (exit 1 when nothing is found).
    /// - Write `data/<Name>.json`, `content/docs/<Name>.md` and `.probe/runs.db`.
    Run {
        /// Output directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        output: String,

        /// Stop after this many analysed bundles (0 = no limit).
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },

    /// List component bundles and their identified payloads.
    ListBundles {
        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Print the payload selected for a single bundle.
    Identify {
        #[arg(long)]
        bundle: PathBuf,
    },

    /// Report which external tools are available.
    CheckTools,

    /// List runs recorded in the output directory's run index.
    History {
        /// Output directory. Defaults to the current working directory.
        #[arg(long, default_value = ".")]
        output: String,

        /// Only show runs for this component name.
        #[arg(long)]
        component: Option<String>,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Load a binary in this process and print the outcome.
    #[command(hide = true)]
    LoadHelper { path: PathBuf },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = || ProbeConfig::resolve(cli.config.as_deref());

    match cli.command {
        Command::Run { output, limit } => run_command(&config()?, &output, limit),
        Command::ListBundles { json } => {
            list_bundles_command(&config()?, json).map(|()| ExitCode::SUCCESS)
        }
        Command::Identify { bundle } => identify_command(&bundle),
        Command::CheckTools => check_tools_command(&config()?),
        Command::History { output, component, json } => {
            history_command(&output, component.as_deref(), json).map(|()| ExitCode::SUCCESS)
        }
        Command::LoadHelper { path } => {
            load_helper_command(&path);
            Ok(ExitCode::SUCCESS)
        }
    }
}
