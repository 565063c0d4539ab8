use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use joblog_data::columns::{DEFAULT_COLUMNS_OF_INTEREST, START, SUBMIT};
use tracing::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Action {
    /// cpu/memory efficiency per job
    #[default]
    Memeff,
    /// queue wait per job
    Pend,
}

impl Action {
    pub fn default_columns(self) -> Vec<String> {
        let extra: &[&str] = match self {
            Action::Memeff => &[],
            Action::Pend => &[SUBMIT, START],
        };
        DEFAULT_COLUMNS_OF_INTEREST
            .iter()
            .chain(extra)
            .map(|&column| column.to_owned())
            .collect()
    }

    pub fn output_prefix(self) -> &'static str {
        match self {
            Action::Memeff => "memEff",
            Action::Pend => "pendTimes",
        }
    }
}

/// Job efficiency reports from pre-processed slurm accounting logs.
///
/// Unset options fall back to the config file, then `JOBLOGS_*` environment variables, then
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Parser)]
pub struct Args {
    #[arg(long, value_enum, default_value_t)]
    pub action: Action,
    /// directory with the accounting logs
    #[arg(long = "inlocation")]
    pub input_location: Option<PathBuf>,
    /// directory for the report file
    #[arg(long = "outlocation")]
    pub output_location: Option<PathBuf>,
    /// mask for the input file names, such as `2020-*.csv`
    #[arg(long = "fmask")]
    pub file_mask: Option<String>,
    /// number of eligible rows to hold in memory and process in parallel
    #[arg(long = "batchsize")]
    pub batch_size: Option<usize>,
    /// field delimiter of input and output
    #[arg(long)]
    pub delimiter: Option<String>,
    /// worker threads per batch (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,
    #[arg(long, default_value = "joblogs.toml")]
    pub config: PathBuf,
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,
}
