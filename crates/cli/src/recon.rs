//! `concilia run` / `validate` / `presets`.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use concilia_io::upload::detect_role;
use concilia_io::{Upload, UploadSet};
use concilia_recon::aggregate::top_products;
use concilia_recon::config::PRESETS;
use concilia_recon::{export_table, Metric, ReconConfig, Role};
use tracing::{debug, info};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_MISSING_INPUT, EXIT_OUTPUT, EXIT_USAGE};
use crate::report;
use crate::CliError;

const DEFAULT_PRESET: &str = "marketplace";

#[derive(Args)]
pub struct ConfigArgs {
    /// Path to a reconciliation config (.toml)
    #[arg(long, conflicts_with = "preset")]
    pub config: Option<PathBuf>,

    /// Built-in preset name (see `concilia presets`)
    #[arg(long)]
    pub preset: Option<String>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Input files; roles are detected from the file names
    pub files: Vec<PathBuf>,

    /// Orders file (overrides detection)
    #[arg(long)]
    pub orders: Option<PathBuf>,

    /// Payments file (overrides detection)
    #[arg(long)]
    pub payments: Option<PathBuf>,

    /// Prices file (overrides detection)
    #[arg(long)]
    pub prices: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Write the reconciled table (.csv, .tsv or .xlsx)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the full result as JSON instead of summary cards
    #[arg(long)]
    pub json: bool,

    /// Also print totals per order date
    #[arg(long)]
    pub by_date: bool,

    /// Also chart the top N products
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Metric for --top
    #[arg(long, value_enum, default_value = "total-sale")]
    pub metric: MetricArg,

    /// Suppress the human summary
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum MetricArg {
    TotalSale,
    NetResult,
    Quantity,
    TotalCost,
    Received,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::TotalSale => Metric::TotalSale,
            MetricArg::NetResult => Metric::NetResult,
            MetricArg::Quantity => Metric::Quantity,
            MetricArg::TotalCost => Metric::TotalCost,
            MetricArg::Received => Metric::Received,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Tsv,
    Xlsx,
}

fn output_format(path: &Path) -> Result<OutputFormat, CliError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(OutputFormat::Csv),
        Some("tsv") => Ok(OutputFormat::Tsv),
        Some("xlsx") => Ok(OutputFormat::Xlsx),
        _ => Err(CliError::args(format!(
            "cannot infer output format from '{}'",
            path.display()
        ))
        .with_hint("use a .csv, .tsv or .xlsx extension")),
    }
}

fn load_config(args: &ConfigArgs) -> Result<ReconConfig, CliError> {
    match (&args.config, &args.preset) {
        (Some(path), _) => {
            let source = std::fs::read_to_string(path).map_err(|e| {
                CliError::with_code(
                    EXIT_INVALID_CONFIG,
                    format!("cannot read config {}: {e}", path.display()),
                )
            })?;
            Ok(ReconConfig::from_toml(&source)?)
        }
        (None, Some(name)) => Ok(ReconConfig::preset(name)?),
        (None, None) => Ok(ReconConfig::preset(DEFAULT_PRESET)?),
    }
}

fn read_upload(path: &Path) -> Result<Upload, CliError> {
    Upload::read(path).map_err(|e| {
        CliError::with_code(EXIT_MISSING_INPUT, format!("cannot read {}: {e}", path.display()))
    })
}

/// Fill role slots: detected files first, then explicit flags on top.
fn collect_uploads(args: &RunArgs, config: &ReconConfig) -> Result<UploadSet, CliError> {
    let mut set = UploadSet::new();

    for path in &args.files {
        let upload = read_upload(path)?;
        let Some(role) = detect_role(config, &upload.name) else {
            return Err(CliError::args(format!(
                "cannot tell which role '{}' belongs to",
                path.display()
            ))
            .with_hint("rename the file to match a role pattern, or pass it with --orders/--payments/--prices"));
        };
        debug!(file = %upload.name, %role, "role detected");
        if set.insert(role, upload).is_some() {
            return Err(CliError::args(format!(
                "more than one file detected as {role}"
            )));
        }
    }

    let explicit = [
        (Role::Orders, &args.orders),
        (Role::Payments, &args.payments),
        (Role::Prices, &args.prices),
    ];
    for (role, path) in explicit {
        if let Some(path) = path {
            set.insert(role, read_upload(path)?);
        }
    }

    Ok(set)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let format = args.output.as_deref().map(output_format).transpose()?;
    info!(config = %config.name, "config loaded");

    let mut uploads = collect_uploads(&args, &config)?;
    let input = uploads.load(&config)?;
    let result = concilia_recon::run(&config, &input)?;

    if let (Some(path), Some(format)) = (&args.output, format) {
        write_output(&result.rows, &config, path, format)?;
        if !args.quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::with_code(EXIT_USAGE, format!("JSON serialization error: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    if args.quiet {
        return Ok(());
    }

    print!("{}", report::summary_cards(&result, &config.display));
    if args.by_date {
        println!();
        print!("{}", report::by_date_table(&result.by_date, &config.display));
    }
    if let Some(n) = args.top {
        let metric = Metric::from(args.metric);
        let top = top_products(&result.rows, metric, n);
        println!();
        print!("{}", report::top_chart(&top, metric, &config.display));
    }
    Ok(())
}

fn write_output(
    rows: &[concilia_recon::ReconciledRow],
    config: &ReconConfig,
    path: &Path,
    format: OutputFormat,
) -> Result<(), CliError> {
    let table = export_table(rows, &config.output);
    let written = match format {
        OutputFormat::Csv => concilia_io::csv::export_csv(&table, path),
        OutputFormat::Tsv => concilia_io::csv::export_tsv(&table, path),
        OutputFormat::Xlsx => {
            let numeric: Vec<bool> = config.output.columns.iter().map(|c| c.field.is_numeric()).collect();
            concilia_io::xlsx::export_xlsx(&table, &numeric, path)
        }
    };
    written.map_err(|e| {
        CliError::with_code(EXIT_OUTPUT, format!("cannot write {}: {e}", path.display()))
    })?;
    info!(path = %path.display(), rows = table.len(), "output written");
    Ok(())
}

pub fn cmd_validate(args: ConfigArgs) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let roles: Vec<String> = Role::ALL
        .iter()
        .map(|r| {
            let rc = config.roles.get(*r);
            format!("{r}: {} rename(s), skip {}", rc.rename.len(), rc.skip_rows)
        })
        .collect();
    eprintln!("valid: {} ({})", config.name, roles.join("; "));
    Ok(())
}

pub fn cmd_presets() -> Result<(), CliError> {
    for (name, _) in PRESETS {
        let config = ReconConfig::preset(name)?;
        println!("{name:<14} {}", config.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_from_extension() {
        assert_eq!(output_format(Path::new("out.CSV")).unwrap(), OutputFormat::Csv);
        assert_eq!(output_format(Path::new("r.xlsx")).unwrap(), OutputFormat::Xlsx);
        let err = output_format(Path::new("r.pdf")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
        assert!(err.hint.is_some());
    }

    #[test]
    fn default_config_is_marketplace() {
        let config = load_config(&ConfigArgs { config: None, preset: None }).unwrap();
        assert_eq!(config.name, "Marketplace");
    }

    #[test]
    fn unknown_preset_is_invalid_config() {
        let err = load_config(&ConfigArgs { config: None, preset: Some("nope".into()) }).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
        assert!(err.message.contains("known: marketplace, standard"));
    }
}
