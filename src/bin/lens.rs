//! Lens CLI - Command-line interface for Cohort Lens
//!
//! Commands:
//! - analyze: Ingest CSV records and emit a full analysis report
//! - validate: Parse CSV records and report skipped rows and field warnings
//! - merge: Ingest CSV records, merge a JSON import batch, emit the report
//! - config: Print the default configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cohort_lens::parser::{FieldWarning, RecordParser, SkippedRow};
use cohort_lens::{AnalysisPipeline, AnalyticsConfig, AnalyticsError, LENS_VERSION};

/// Lens - account activity analytics from delimited records
#[derive(Parser)]
#[command(name = "lens")]
#[command(version = LENS_VERSION)]
#[command(about = "Score accounts and derive activity views from CSV records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest CSV records and emit an analysis report
    Analyze {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Filter condition JSON file applied before reporting
        #[arg(long)]
        filter: Option<PathBuf>,

        /// Configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format (pretty by default when stdout is a terminal)
        #[arg(long)]
        output_format: Option<OutputFormat>,
    },

    /// Parse CSV records and report skipped rows and field warnings
    Validate {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ingest CSV records, merge an import batch, emit the report
    Merge {
        /// Input CSV path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Import batch JSON file (profiles, behaviors, time_series)
        #[arg(short, long)]
        batch: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format (pretty by default when stdout is a terminal)
        #[arg(long)]
        output_format: Option<OutputFormat>,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), LensCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            filter,
            config,
            output_format,
        } => cmd_analyze(
            &input,
            &output,
            filter.as_deref(),
            config.as_deref(),
            output_format,
        ),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Merge {
            input,
            batch,
            output,
            config,
            output_format,
        } => cmd_merge(&input, &batch, &output, config.as_deref(), output_format),

        Commands::Config => {
            println!("{}", AnalyticsConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    filter: Option<&Path>,
    config: Option<&Path>,
    output_format: Option<OutputFormat>,
) -> Result<(), LensCliError> {
    let csv_text = read_input(input)?;
    let mut pipeline = load_pipeline(config)?;

    let ingest = pipeline.ingest_csv(&csv_text)?;

    if let Some(filter_path) = filter {
        let filter_json = fs::read_to_string(filter_path)?;
        pipeline.apply_filter_json(&filter_json)?;
    }

    let report = pipeline.report(Some(ingest), None);
    write_output(output, &format_output(&report, output_format)?)
}

fn cmd_merge(
    input: &Path,
    batch: &Path,
    output: &Path,
    config: Option<&Path>,
    output_format: Option<OutputFormat>,
) -> Result<(), LensCliError> {
    let csv_text = read_input(input)?;
    let batch_json = fs::read_to_string(batch)?;
    let mut pipeline = load_pipeline(config)?;

    let ingest = pipeline.ingest_csv(&csv_text)?;
    let counts = pipeline.import_json(&batch_json)?;

    let report = pipeline.report(Some(ingest), Some(counts));
    write_output(output, &format_output(&report, output_format)?)
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), LensCliError> {
    let csv_text = read_input(input)?;
    let dataset = RecordParser::parse(&csv_text)?;

    let report = ValidationReport {
        accepted_rows: dataset.accounts.len(),
        skipped_rows: dataset.skipped_rows,
        warnings: dataset.warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Accepted rows: {}", report.accepted_rows);
        println!("Skipped rows:  {}", report.skipped_rows.len());
        println!("Warnings:      {}", report.warnings.len());

        if !report.skipped_rows.is_empty() {
            println!("\nSkipped:");
            for row in &report.skipped_rows {
                println!(
                    "  - line {}: {:?} ({} of {} fields)",
                    row.line, row.reason, row.found_fields, row.expected_fields
                );
            }
        }

        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &report.warnings {
                println!(
                    "  - line {} ({}): {} = {:?} [{:?}]",
                    warning.line, warning.user_id, warning.field, warning.value, warning.kind
                );
            }
        }
    }

    if report.skipped_rows.is_empty() {
        Ok(())
    } else {
        Err(LensCliError::ValidationFailed(report.skipped_rows.len()))
    }
}

// Helper functions

fn load_pipeline(config: Option<&Path>) -> Result<AnalysisPipeline, LensCliError> {
    let pipeline = match config {
        Some(path) => AnalysisPipeline::from_config_json(&fs::read_to_string(path)?)?,
        None => AnalysisPipeline::new(AnalyticsConfig::default())?,
    };
    Ok(pipeline)
}

fn read_input(input: &Path) -> Result<String, LensCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), LensCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_output<T: serde::Serialize>(
    value: &T,
    format: Option<OutputFormat>,
) -> Result<String, LensCliError> {
    let format = format.unwrap_or_else(|| {
        if atty::is(atty::Stream::Stdout) {
            OutputFormat::JsonPretty
        } else {
            OutputFormat::Json
        }
    });

    match format {
        OutputFormat::Json => Ok(serde_json::to_string(value)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(value)?),
    }
}

// Error types

#[derive(Debug)]
enum LensCliError {
    Io(io::Error),
    Analytics(AnalyticsError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for LensCliError {
    fn from(e: io::Error) -> Self {
        LensCliError::Io(e)
    }
}

impl From<AnalyticsError> for LensCliError {
    fn from(e: AnalyticsError) -> Self {
        LensCliError::Analytics(e)
    }
}

impl From<serde_json::Error> for LensCliError {
    fn from(e: serde_json::Error) -> Self {
        LensCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<LensCliError> for CliError {
    fn from(e: LensCliError) -> Self {
        match e {
            LensCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            LensCliError::Analytics(e) => {
                let (code, hint) = match &e {
                    AnalyticsError::EmptyDataset => {
                        ("EMPTY_DATASET", "Ensure the CSV has a header and at least one data row")
                    }
                    AnalyticsError::MissingColumn(_) => {
                        ("MISSING_COLUMN", "The header must name a user_id column")
                    }
                    AnalyticsError::OrphanBehavior(_) => (
                        "ORPHAN_BEHAVIOR",
                        "Every imported behavior needs a profile in the batch or the dataset",
                    ),
                    AnalyticsError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'lens config' for a valid starting point")
                    }
                    AnalyticsError::Csv(_) | AnalyticsError::MalformedRow { .. } => {
                        ("PARSE_ERROR", "Run 'lens validate' for details")
                    }
                    AnalyticsError::Json(_) => ("JSON_ERROR", "Check JSON syntax"),
                    _ => ("ANALYTICS_ERROR", "Retry the command"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            LensCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            LensCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows were skipped", count),
                hint: Some("Fix the reported rows and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    accepted_rows: usize,
    skipped_rows: Vec<SkippedRow>,
    warnings: Vec<FieldWarning>,
}
