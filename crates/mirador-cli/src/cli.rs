//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "mirador",
    version,
    about = "Link Ebola patient sources into one Mirador dataset",
    long_about = "Link clinical, laboratory and sequencing sources keyed by patient\n\
                  identifiers into one typed dataset.\n\n\
                  Writes a Mirador folder and, on request, a flat CSV and an SPSS card."
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

    /// Log output format.
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
    /// Run a study and write the Mirador dataset.
    Build(BuildArgs),

    /// List the fields a study declares.
    Fields(FieldsArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Study configuration file (TOML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Attach sequencing data (variant calls, clusters, allele frequencies).
    #[arg(long = "seq")]
    pub seq: bool,

    /// Replace qPCR viral loads with ln(1 + load).
    #[arg(long = "log")]
    pub log: bool,

    /// Mirador folder (default: <CONFIG dir>/mirador).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write a flat CSV with labels instead of codes.
    #[arg(long = "csv", value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Also write a data copy and SPSS control card.
    #[arg(long = "spss", value_name = "PATH")]
    pub spss: Option<PathBuf>,

    /// Text written for absent values (default: the study's, else \N).
    #[arg(long = "missing", value_name = "STR")]
    pub missing: Option<String>,

    /// Text written for absent values in the flat CSV (default: empty).
    #[arg(long = "csv-null", value_name = "STR")]
    pub csv_null: Option<String>,

    /// Run and report without writing any file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Exit with status 2 when records were dropped.
    #[arg(long = "strict")]
    pub strict: bool,
}

#[derive(Parser)]
pub struct FieldsArgs {
    /// Study configuration file (TOML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
