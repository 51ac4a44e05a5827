// Concilia CLI - reconcile marketplace orders against payments and prices

mod exit_codes;
mod recon;
mod report;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use concilia_recon::{ProcessingError, ReconError};
use tracing_subscriber::EnvFilter;

use exit_codes::{exit_code_for, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "concilia")]
#[command(about = "Reconcile orders, payments and product costs into a per-order result")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace). CONCILIA_LOG overrides.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation pass
    #[command(after_help = "\
Examples:
  concilia run Order.all.202405.xlsx my_shopeepay.csv Preços.xlsx
  concilia run --orders orders.csv --payments pay.csv --prices costs.csv --preset standard
  concilia run *.csv --config recon.toml --output result.xlsx
  concilia run *.xlsx --by-date --top 10 --metric net-result
  concilia run *.csv --json > result.json")]
    Run(recon::RunArgs),

    /// Validate a reconciliation config without running
    #[command(after_help = "\
Examples:
  concilia validate --config recon.toml
  concilia validate --preset marketplace")]
    Validate(recon::ConfigArgs),

    /// List built-in presets
    Presets,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("CONCILIA_GIT_HASH"), ")",
        "\ntarget:  ", env!("CONCILIA_TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CONCILIA_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: concilia <command> [options]");
            eprintln!("       concilia --help for more information");
            Ok(())
        }
        Some(Commands::Run(args)) => recon::cmd_run(args),
        Some(Commands::Validate(args)) => recon::cmd_validate(args),
        Some(Commands::Presets) => recon::cmd_presets(),
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
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn with_code(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::MissingInput(role) => Some(format!(
                "pass --{role} <FILE>, or a file whose name matches the {role} patterns"
            )),
            ReconError::MissingColumn { role, .. } => {
                Some(format!("check the [roles.{role}] rename table against the file's headers"))
            }
            ReconError::Parse { .. } => {
                Some("expected CSV/TSV text or an xlsx, xls, xlsb or ods workbook".to_string())
            }
            ReconError::Processing(ProcessingError::DuplicateKeys { .. }) => Some(
                "set [joins] duplicate_keys = \"keep_first\" or \"fan_out\" to accept duplicates"
                    .to_string(),
            ),
            _ => None,
        };
        Self { code: exit_code_for(&err), message: err.to_string(), hint }
    }
}
