// tally - invoice validation status reconciliation (headless batch)

mod exit_codes;
mod recon;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tally_recon::{Layout, PolicyVersion, ReconError, ReportFormat};

// Re-export exit codes from registry (single source of truth)
use exit_codes::{
    EXIT_ERROR, EXIT_RECON_BASE, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_WRITE, EXIT_SUCCESS,
};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Reconcile invoice validation status across producer, consumer, comparator and telemetry reports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Debug-level logging (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every source, score each entity and write the reports
    #[command(after_help = "\
Examples:
  tally run
  tally run recon.toml
  tally run recon.toml --layout all --format csv --output out/
  tally run config.json --policy v1 --strict
  tally run recon.toml --entity INV1 --entity INV2 --print
  ROOT_PATH=gs://bucket/run-42 tally run --json > result.json

Without CONFIG, ${ROOT_PATH}/config.toml is used, then ${ROOT_PATH}/config.json.")]
    Run {
        /// Path to the .toml (or legacy .json) config file
        config: Option<PathBuf>,

        /// Report layout
        #[arg(long, value_name = "consolidated|per-source|grouped|all")]
        layout: Option<Layout>,

        /// Report file format
        #[arg(long, value_name = "xlsx|csv|json")]
        format: Option<ReportFormat>,

        /// Output directory (local path or gs://bucket/prefix)
        #[arg(long, short = 'o', value_name = "DIR")]
        output: Option<String>,

        /// Scoring policy version
        #[arg(long, value_name = "v1|v2")]
        policy: Option<PolicyVersion>,

        /// Score only these entities instead of the base source's list. Repeatable.
        #[arg(long, value_name = "ID")]
        entity: Vec<String>,

        /// Print the full result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Print the consolidated table to stdout
        #[arg(long, conflicts_with = "json")]
        print: bool,

        /// Exit 63 when any entity fails
        #[arg(long)]
        strict: bool,
    },

    /// Parse and validate a config without loading any data
    #[command(after_help = "\
Examples:
  tally validate recon.toml
  tally validate config.json")]
    Validate {
        /// Path to the config file
        config: Option<PathBuf>,
    },

    /// Load sources and show kind, identifier column and coverage gaps
    #[command(after_help = "\
Examples:
  tally inspect recon.toml
  tally inspect recon.toml --json")]
    Inspect {
        /// Path to the config file
        config: Option<PathBuf>,

        /// Output JSON to stdout instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tally-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tally-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            config,
            layout,
            format,
            output,
            policy,
            entity,
            json,
            print,
            strict,
        } => recon::cmd_run(recon::RunArgs {
            config,
            layout,
            format,
            output,
            policy,
            entities: entity,
            json,
            print,
            strict,
        }),
        Commands::Validate { config } => recon::cmd_validate(config),
        Commands::Inspect { config, json } => recon::cmd_inspect(config, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn write(msg: impl Into<String>) -> Self {
        Self::new(EXIT_RECON_WRITE, msg)
    }

    /// Map an engine error onto its registered exit code.
    pub fn recon(err: ReconError) -> Self {
        let (code, hint) = match &err {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) | ReconError::UnknownSource(_) => {
                (EXIT_RECON_INVALID_CONFIG, Some("run `tally validate` to check the config".to_string()))
            }
            ReconError::BaseUnreadable { .. } => (
                EXIT_RECON_BASE,
                Some("check the base source path and ROOT_PATH".to_string()),
            ),
            ReconError::BaseIdentifierMissing { .. } => (
                EXIT_RECON_BASE,
                Some("set `id_column` on the base source".to_string()),
            ),
            ReconError::Parse { .. } => (EXIT_ERROR, None),
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
