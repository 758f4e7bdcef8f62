//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "nafl",
    version,
    about = "Build NAFL progression cohorts and patient-level feature tables",
    long_about = "Build patient-level modelling tables for NAFL progression studies.\n\n\
                  Filters the diagnosis extract to an incident NAFL cohort, derives a\n\
                  progression outcome with censoring time, encodes diagnoses and\n\
                  medications as sparse indicators, and joins patient-level tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Select the cohort, derive outcomes and encode diagnosis features.
    Diagnoses(DiagnosesArgs),

    /// Filter and encode medication features.
    Medications(MedicationsArgs),

    /// Inner-join patient-level tables on the patient key.
    Combine(CombineArgs),

    /// Run every stage from a study TOML file and write a run manifest.
    Run(RunArgs),

    /// List the anchor, progression and liver code lists in effect.
    Codes(CodesArgs),
}

/// Options shared by the stage subcommands.
#[derive(Args)]
pub struct CommonArgs {
    /// Study TOML supplying parameters (inputs in it are ignored).
    #[arg(long = "config", value_name = "STUDY_TOML")]
    pub config: Option<PathBuf>,

    /// Patient key column name.
    #[arg(long = "key", value_name = "COLUMN")]
    pub key: Option<String>,

    /// Input delimiter (default: tab for .txt/.tsv, comma otherwise).
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<char>,
}

#[derive(Parser)]
pub struct DiagnosesArgs {
    /// Diagnosis event extract.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Exclusion-code table (first column holds the codes).
    #[arg(long = "exclusions", value_name = "PATH")]
    pub exclusions: Option<PathBuf>,

    /// Output CSV path.
    #[arg(long = "output", short = 'o', value_name = "PATH", default_value = "dia.nafl.csv")]
    pub output: PathBuf,

    /// Minimum age at the event.
    #[arg(long = "min-age", value_name = "YEARS")]
    pub min_age: Option<f64>,

    /// Minimum distinct patients per diagnosis column.
    #[arg(long = "min-support", value_name = "N")]
    pub min_support: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct MedicationsArgs {
    /// Medication event extract.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output CSV path.
    #[arg(long = "output", short = 'o', value_name = "PATH", default_value = "med.nafl.csv")]
    pub output: PathBuf,

    /// Exclusive lower bound of the lookback window, in days from index.
    #[arg(long = "lookback-start", value_name = "DAYS", allow_hyphen_values = true)]
    pub lookback_start: Option<i64>,

    /// Exclusive upper bound of the lookback window, in days from index.
    #[arg(long = "lookback-end", value_name = "DAYS", allow_hyphen_values = true)]
    pub lookback_end: Option<i64>,

    /// Code types need more than this many rows to be kept.
    #[arg(long = "min-code-type-rows", value_name = "N")]
    pub min_code_type_rows: Option<usize>,

    /// Minimum distinct patients per medication column.
    #[arg(long = "min-support", value_name = "N")]
    pub min_support: Option<usize>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Parser)]
pub struct CombineArgs {
    /// Input table as NAME=PATH; repeat in join order.
    #[arg(long = "input", value_name = "NAME=PATH", required = true, value_parser = parse_named_path)]
    pub inputs: Vec<(String, PathBuf)>,

    /// Column to drop from a table before joining, as NAME=COLUMN.
    #[arg(long = "drop", value_name = "NAME=COLUMN", value_parser = parse_named_column)]
    pub drops: Vec<(String, String)>,

    /// Output CSV path.
    #[arg(
        long = "output",
        short = 'o',
        value_name = "PATH",
        default_value = "combined.nafl.csv"
    )]
    pub output: PathBuf,

    /// Patient key column name.
    #[arg(long = "key", value_name = "COLUMN", default_value = "StudyID")]
    pub key: String,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Study TOML file.
    #[arg(value_name = "STUDY_TOML")]
    pub config: PathBuf,

    /// Override the output directory from the study file.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CodesArgs {
    /// Study TOML whose code lists should be shown.
    #[arg(long = "config", value_name = "STUDY_TOML")]
    pub config: Option<PathBuf>,
}

fn split_pair(value: &str) -> Result<(&str, &str), String> {
    let (name, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{value}'"))?;
    let (name, rest) = (name.trim(), rest.trim());
    if name.is_empty() || rest.is_empty() {
        return Err(format!("expected NAME=VALUE, got '{value}'"));
    }
    Ok((name, rest))
}

fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = split_pair(value)?;
    Ok((name.to_string(), PathBuf::from(path)))
}

fn parse_named_column(value: &str) -> Result<(String, String), String> {
    let (name, column) = split_pair(value)?;
    Ok((name.to_string(), column.to_string()))
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
